pub mod dataset;
pub mod record;
pub mod report;
pub mod staff;
pub mod system;

use super::registry::{CommandEntry, CommandRegistry};

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(system::definitions());
    commands.extend(dataset::definitions());
    commands.extend(record::definitions());
    commands.extend(staff::definitions());
    commands.extend(report::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    for entry in all_definitions() {
        registry.register(entry);
    }
}

/// Splits `key=value` arguments; bare words are returned with an empty value.
pub(crate) fn key_values<'a>(args: &[&'a str]) -> Vec<(String, &'a str)> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) => (key.trim().to_ascii_lowercase(), value.trim()),
            None => (arg.trim().to_ascii_lowercase(), ""),
        })
        .collect()
}
