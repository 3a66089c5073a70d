use std::{env, path::PathBuf, sync::Once};

use station_config::Config;

static TRACING_INIT: Once = Once::new();

const HOME_VAR: &str = "STATION_LEDGER_HOME";

/// Workspace crates that log at `info` unless `RUST_LOG` names them.
const DEFAULT_DIRECTIVES: [&str; 3] = [
    "station_ledger=info",
    "station_core=info",
    "station_storage_json=info",
];

/// Initializes the global tracing subscriber. `RUST_LOG` directives are
/// honoured; workspace crates it does not mention log at `info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

        let rust_log = env::var("RUST_LOG").unwrap_or_default();
        let mut filter = EnvFilter::from_default_env();
        for default in default_directives(&rust_log) {
            if let Ok(directive) = default.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn default_directives(rust_log: &str) -> Vec<&'static str> {
    let named: Vec<&str> = rust_log
        .split(',')
        .filter_map(|part| part.split('=').next())
        .map(str::trim)
        .collect();
    DEFAULT_DIRECTIVES
        .into_iter()
        .filter(|directive| {
            let target = directive.split('=').next().unwrap_or_default();
            !named.contains(&target)
        })
        .collect()
}

/// Application data directory: `$STATION_LEDGER_HOME` when set, otherwise
/// `~/Documents/StationLedger`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_VAR) {
        return PathBuf::from(custom);
    }
    Config::default().resolve_default_data_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_crates_log_at_info_by_default() {
        let defaults = default_directives("");
        assert!(defaults.contains(&"station_core=info"));
        assert!(defaults.contains(&"station_storage_json=info"));
        assert_eq!(defaults.len(), DEFAULT_DIRECTIVES.len());
    }

    #[test]
    fn rust_log_overrides_keep_their_level() {
        let defaults = default_directives("warn,station_core=debug");
        assert!(!defaults.contains(&"station_core=info"));
        assert!(defaults.contains(&"station_ledger=info"));
    }
}
