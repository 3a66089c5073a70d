use station_config::Config;
use station_domain::{AccessContext, Role};

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry, Lookup};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        )
        .with_args(&[ArgKind::Command]),
        CommandEntry::new(
            "config",
            "View and change CLI preferences",
            "config [show|set <key> <value>|<key>]",
            cmd_config,
        )
        .with_args(&[ArgKind::Words(&["show", "set"]), ArgKind::ConfigKey]),
        CommandEntry::new(
            "role",
            "Switch the active role used to scope records",
            "role <admin|partner|manager> [station-id]",
            cmd_role,
        )
        .with_args(&[ArgKind::Role, ArgKind::StationId]),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.registry.lookup(&name.to_lowercase(), &context.access) {
            Lookup::Found(entry) => {
                output::section(entry.name);
                output::info(entry.description);
                output::info(format!("Usage: {}", entry.usage));
            }
            Lookup::Hidden(entry) => {
                output::warning(format!("`{}` is limited to the admin role.", entry.name));
            }
            Lookup::Missing => context.suggest_command(name),
        }
        return Ok(());
    }

    output::section(format!("Commands ({})", context.access.role));
    let rows: Vec<Vec<String>> = context
        .registry
        .visible(&context.access)
        .map(|entry| vec![entry.usage.to_string(), entry.description.to_string()])
        .collect();
    let width = rows.iter().map(|row| row[0].len()).max().unwrap_or(0);
    for row in rows {
        output::info(format!("  {:<width$}  {}", row[0], row[1]));
    }
    Ok(())
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        output::section("Configuration");
        for key in Config::KEYS {
            let value = context.config.get(key).unwrap_or_default();
            output::info(format!("  {key:<26} {value}"));
        }
        output::info(format!(
            "  {:<26} {}",
            "data_root",
            context
                .config
                .resolve_default_data_root()
                .display()
        ));
        return Ok(());
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(format!(
                    "usage: config set <{}> <value>",
                    Config::KEYS.join("|")
                )));
            }
            let key = args[1].to_lowercase();
            let value = args[2..].join(" ");
            context.config.set(&key, &value)?;
            if key == "ui_color_enabled" {
                output::set_color_enabled(
                    context.config.ui_color_enabled
                        && context.mode == crate::cli::CliMode::Interactive,
                );
            }
            context.persist_config()?;
            let shown = context.config.get(&key).unwrap_or(value);
            output::success(format!("{key} set to {shown}."));
            Ok(())
        }
        other => match context.config.get(other) {
            Some(value) => {
                output::info(format!("{other} = {value}"));
                Ok(())
            }
            None => Err(CommandError::InvalidArguments(format!(
                "unknown setting `{other}`; expected one of {}",
                Config::KEYS.join(", ")
            ))),
        },
    }
}

fn cmd_role(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(raw) = args.first() else {
        let station = context
            .access
            .station_id
            .map(|id| format!(" (station {id})"))
            .unwrap_or_default();
        output::info(format!("Active role: {}{station}", context.access.role));
        return Ok(());
    };

    let role = Role::parse(raw).ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "unknown role `{raw}`; expected admin, partner, or manager"
        ))
    })?;

    context.access = match role {
        Role::Admin => AccessContext::admin(),
        Role::Partner => AccessContext::partner(),
        Role::Manager => {
            let station = args
                .get(1)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .ok_or_else(|| {
                    CommandError::InvalidArguments("usage: role manager <station-id>".into())
                })?;
            AccessContext::manager(station)
        }
    };

    output::success(format!("Role set to {}.", context.access.role));
    if let Some(station) = context.access.station_id {
        output::info(format!("Records are limited to station {station}."));
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
