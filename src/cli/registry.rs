//! Command table: handlers, role visibility, and argument shapes for completion.

use std::collections::HashMap;

use station_domain::{AccessContext, Role};

use super::context::{CommandResult, ShellContext};

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// Which roles may see and run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Everyone,
    AdminOnly,
}

impl Visibility {
    pub fn allows(self, access: &AccessContext) -> bool {
        match self {
            Visibility::Everyone => true,
            Visibility::AdminOnly => access.role == Role::Admin,
        }
    }
}

/// What a positional argument holds, so the shell can offer candidates for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Free,
    Words(&'static [&'static str]),
    Command,
    Dataset,
    Role,
    ConfigKey,
    StationId,
    RecordId,
    LoanId,
    EmployeeId,
    Category,
    /// `month=`, `year=`, and `station=` terms; repeats.
    FilterTerm,
    /// `category=`, `subcategory=`, and `amount=` terms; repeats.
    LineField,
}

impl ArgKind {
    fn repeats(self) -> bool {
        matches!(self, ArgKind::FilterTerm | ArgKind::LineField)
    }
}

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
    pub visibility: Visibility,
    pub args: &'static [ArgKind],
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
            visibility: Visibility::Everyone,
            args: &[],
        }
    }

    pub const fn admin_only(mut self) -> Self {
        self.visibility = Visibility::AdminOnly;
        self
    }

    pub const fn with_args(mut self, args: &'static [ArgKind]) -> Self {
        self.args = args;
        self
    }
}

/// Kind of the argument at `index`; the last kind carries over when it repeats.
pub fn arg_kind_at(args: &[ArgKind], index: usize) -> ArgKind {
    match args.get(index) {
        Some(kind) => *kind,
        None => match args.last() {
            Some(kind) if kind.repeats() => *kind,
            _ => ArgKind::Free,
        },
    }
}

/// Lookup result for a command name under the active role.
pub enum Lookup<'a> {
    Found(&'a CommandEntry),
    Hidden(&'a CommandEntry),
    Missing,
}

/// Commands keyed by name, listed in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        let name = entry.name;
        if self.commands.insert(name, entry).is_none() {
            self.order.push(name);
        }
    }

    pub fn lookup(&self, name: &str, access: &AccessContext) -> Lookup<'_> {
        match self.commands.get(name) {
            Some(entry) if entry.visibility.allows(access) => Lookup::Found(entry),
            Some(entry) => Lookup::Hidden(entry),
            None => Lookup::Missing,
        }
    }

    /// Entries the role may run, in registration order.
    pub fn visible<'a>(
        &'a self,
        access: &'a AccessContext,
    ) -> impl Iterator<Item = &'a CommandEntry> + 'a {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .filter(move |entry| entry.visibility.allows(access))
    }

    /// Closest visible name within edit distance 3.
    pub fn suggest(&self, input: &str, access: &AccessContext) -> Option<&'static str> {
        let needle = input.to_ascii_lowercase();
        self.visible(access)
            .map(|entry| (strsim::levenshtein(entry.name, &needle), entry.name))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(CommandEntry::new("records", "", "records", noop));
        registry.register(
            CommandEntry::new("delete-record", "", "delete-record <id>", noop).admin_only(),
        );
        registry
    }

    #[test]
    fn admin_only_commands_are_hidden_from_other_roles() {
        let registry = registry();
        let manager = AccessContext::manager(1);
        let admin = AccessContext::admin();

        let names: Vec<_> = registry.visible(&manager).map(|entry| entry.name).collect();
        assert_eq!(names, vec!["records"]);
        assert!(matches!(registry.lookup("delete-record", &manager), Lookup::Hidden(_)));
        assert!(matches!(registry.lookup("delete-record", &admin), Lookup::Found(_)));
        assert!(matches!(registry.lookup("nope", &admin), Lookup::Missing));

        assert_eq!(registry.suggest("delete-recrd", &admin), Some("delete-record"));
        assert_eq!(registry.suggest("delete-recrd", &AccessContext::partner()), None);
    }

    #[test]
    fn repeating_kinds_cover_trailing_arguments() {
        let filter = [ArgKind::FilterTerm];
        assert_eq!(arg_kind_at(&filter, 0), ArgKind::FilterTerm);
        assert_eq!(arg_kind_at(&filter, 3), ArgKind::FilterTerm);

        let edit_line = [ArgKind::RecordId, ArgKind::Free, ArgKind::LineField];
        assert_eq!(arg_kind_at(&edit_line, 1), ArgKind::Free);
        assert_eq!(arg_kind_at(&edit_line, 4), ArgKind::LineField);

        assert_eq!(arg_kind_at(&[ArgKind::Dataset], 1), ArgKind::Free);
    }
}
