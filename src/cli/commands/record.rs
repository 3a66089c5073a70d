use station_core::{CoreError, NormalizationService, ValidationError};
use station_domain::{
    parse_numeric, AccessContext, Displayable, ExpenditureCategory, ExpenditureLine,
};

use super::{dataset::read_drafts, key_values};
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "edit",
            "Replace a record with a corrected draft, keeping its id",
            "edit <record-id> <draft.json>",
            cmd_edit,
        )
        .with_args(&[ArgKind::RecordId]),
        CommandEntry::new(
            "edit-line",
            "Change, add, or remove one expenditure line of a record",
            "edit-line <record-id> <line|new> [category=<tag>] [subcategory=<tag>] [amount=<n>] [remove]",
            cmd_edit_line,
        )
        .with_args(&[ArgKind::RecordId, ArgKind::Free, ArgKind::LineField]),
        CommandEntry::new(
            "delete-record",
            "Delete a daily record",
            "delete-record <record-id>",
            cmd_delete_record,
        )
        .with_args(&[ArgKind::RecordId])
        .admin_only(),
    ]
}

fn parse_id(raw: &str, usage: &str) -> Result<i64, CommandError> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(usage.into()))
}

/// Station-bound roles may only touch their own station's records.
fn ensure_station(access: &AccessContext, station: Option<i64>) -> Result<(), CommandError> {
    if access.is_station_bound() && station != access.station_id {
        let reason = "record is outside the active role's scope".to_string();
        return Err(CoreError::AccessDenied(reason).into());
    }
    Ok(())
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: edit <record-id> <draft.json>";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let id = parse_id(args[0], USAGE)?;
    let mut drafts = read_drafts(args[1])?;
    let mut draft = match drafts.len() {
        1 => drafts.remove(0),
        count => {
            return Err(CommandError::InvalidArguments(format!(
                "edit takes exactly one draft, found {count}"
            )))
        }
    };

    let options = context.config.normalize_options();
    let access = context.access;
    let dataset = context.dataset_mut()?;
    let current = dataset.record(id).ok_or(CoreError::RecordNotFound(id))?;
    ensure_station(&access, current.station_id)?;

    NormalizationService::prefill_rate(&mut draft, &dataset.directory());
    let normalized = NormalizationService::normalize(&draft, &options)?;
    for warning in &normalized.warnings {
        output::warning(format!("Record {id}: {warning}"));
    }
    ensure_station(&access, normalized.record.station_id)?;

    dataset.replace_record(id, normalized)?;
    dataset.touch();
    output::success(format!("Record {id} replaced."));
    Ok(())
}

enum LineTarget {
    Existing(usize),
    New,
}

fn cmd_edit_line(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str =
        "usage: edit-line <record-id> <line|new> [category=<tag>] [subcategory=<tag>] [amount=<n>] [remove]";
    if args.len() < 3 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let id = parse_id(args[0], USAGE)?;
    let target = match args[1].trim().to_ascii_lowercase().as_str() {
        "new" => LineTarget::New,
        raw => match raw.parse::<usize>() {
            Ok(line) if line > 0 => LineTarget::Existing(line - 1),
            _ => return Err(CommandError::InvalidArguments(USAGE.into())),
        },
    };

    let mut category: Option<Option<String>> = None;
    let mut subcategory: Option<Option<String>> = None;
    let mut amount: Option<Option<f64>> = None;
    let mut remove = false;
    for (key, value) in key_values(&args[2..]) {
        let text = Some(value.to_string()).filter(|value| !value.is_empty());
        match key.as_str() {
            "category" => category = Some(text),
            "subcategory" => subcategory = Some(text),
            "amount" => {
                let parsed = parse_numeric(value);
                if parsed.is_none() && !value.is_empty() {
                    return Err(CommandError::InvalidArguments(format!(
                        "amount: `{value}` is not a number"
                    )));
                }
                amount = Some(parsed);
            }
            "remove" => remove = true,
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown field `{other}`; expected category, subcategory, amount, or remove"
                )))
            }
        }
    }
    if remove && matches!(target, LineTarget::New) {
        return Err(CommandError::InvalidArguments(
            "a new line cannot be removed".into(),
        ));
    }

    let access = context.access;
    let currency = context.currency().to_string();
    let dataset = context.dataset_mut()?;
    let station = dataset
        .record(id)
        .ok_or(CoreError::RecordNotFound(id))?
        .station_id;
    ensure_station(&access, station)?;

    let result = dataset.edit_record(id, |editor| {
        let index = match target {
            LineTarget::Existing(index) => index,
            LineTarget::New => editor.add_line(ExpenditureLine::default()),
        };
        if remove {
            editor.remove_line(index)?;
            return Ok((index, editor.total_expenditure()));
        }
        if let Some(category) = &category {
            editor.set_line_category(index, category.as_deref())?;
        }
        if let Some(subcategory) = &subcategory {
            editor.set_line_subcategory(index, subcategory.as_deref())?;
        }
        if let Some(amount) = amount {
            editor.set_line_amount(index, amount)?;
        }
        let line = editor
            .record()
            .expenditures
            .get(index)
            .ok_or(CoreError::LineNotFound(index))?;
        check_subcategory(line)?;
        Ok((index, editor.total_expenditure()))
    });
    let (index, total) = result.map_err(|err| match err {
        CoreError::LineNotFound(index) => {
            CommandError::Message(format!("record {id} has no line {}", index + 1))
        }
        other => other.into(),
    })?;
    dataset.touch();

    let action = if remove { "removed" } else { "updated" };
    output::success(format!(
        "Line {} of record {id} {action}; expenditure now {}.",
        index + 1,
        output::money(total, &currency)
    ));
    Ok(())
}

fn check_subcategory(line: &ExpenditureLine) -> Result<(), CoreError> {
    let category = line
        .category
        .as_deref()
        .and_then(ExpenditureCategory::from_tag);
    let (Some(category), Some(subcategory)) = (category, line.subcategory.as_deref()) else {
        return Ok(());
    };
    if category.allows_subcategory(subcategory) {
        return Ok(());
    }
    Err(ValidationError::InvalidSubcategory {
        category: category.tag().to_string(),
        subcategory: subcategory.to_string(),
    }
    .into())
}

fn cmd_delete_record(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: delete-record <record-id>";
    let Some(raw) = args.first() else {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    };
    let id = parse_id(raw, USAGE)?;
    let dataset = context.dataset_mut()?;
    let removed = dataset.remove_record(id)?;
    dataset.touch();
    output::success(format!("Deleted {}.", removed.display_label()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcategories_must_belong_to_the_line_category() {
        let mut line = ExpenditureLine::new(ExpenditureCategory::Kitchen, 10.0);
        line.subcategory = Some("utensils".into());
        assert!(check_subcategory(&line).is_ok());

        line.subcategory = Some("diesel".into());
        assert!(matches!(
            check_subcategory(&line),
            Err(CoreError::Validation(ValidationError::InvalidSubcategory { .. }))
        ));

        line.category = Some("mystery".into());
        assert!(check_subcategory(&line).is_ok());
    }

    #[test]
    fn station_bound_roles_cannot_reach_other_stations() {
        assert!(ensure_station(&AccessContext::manager(2), Some(2)).is_ok());
        assert!(ensure_station(&AccessContext::manager(2), Some(1)).is_err());
        assert!(ensure_station(&AccessContext::partner(), Some(1)).is_ok());
    }
}
