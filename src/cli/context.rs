//! Shell state, dispatch, and error reporting.

use std::{io, path::PathBuf};

use rustyline::error::ReadlineError;
use station_config::{Config, ConfigError, ConfigManager};
use station_core::{
    storage::{dataset_warnings, RecordStore, StationDataset},
    CoreError, RecordScope, ValidationError,
};
use station_domain::{AccessContext, DailyRecord};
use station_storage_json::JsonDatasetStorage;
use thiserror::Error;

use super::{
    commands,
    completion::CompletionData,
    output,
    registry::{CommandRegistry, Lookup},
};
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

/// Failures that stop the shell itself.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
}

/// Failures of a single command; reported and the shell keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No dataset loaded. Use `new` or `load` first.")]
    DatasetNotLoaded,
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) registry: CommandRegistry,
    pub(crate) storage: JsonDatasetStorage,
    pub(crate) config_manager: ConfigManager,
    pub(crate) config: Config,
    pub(crate) dataset: Option<StationDataset>,
    pub(crate) dataset_name: Option<String>,
    pub(crate) dataset_path: Option<PathBuf>,
    pub(crate) scope: RecordScope,
    pub(crate) access: AccessContext,
    pub(crate) running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let base = utils::app_data_dir();
        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        output::set_color_enabled(config.ui_color_enabled && mode == CliMode::Interactive);

        let data_root = config.default_data_root.clone().unwrap_or(base);
        let storage = JsonDatasetStorage::under_root(&data_root)?;

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let mut context = Self {
            mode,
            registry,
            storage,
            config_manager,
            config,
            dataset: None,
            dataset_name: None,
            dataset_path: None,
            scope: RecordScope::default(),
            access: AccessContext::default(),
            running: true,
        };
        context.auto_load_last();
        Ok(context)
    }

    fn auto_load_last(&mut self) {
        if self.mode != CliMode::Interactive {
            return;
        }
        let Some(name) = self.config.last_opened_dataset.clone() else {
            return;
        };
        match self.storage.load_dataset(&name) {
            Ok(dataset) => {
                self.set_dataset(dataset, Some(name.clone()), None);
                output::success(format!("Automatically loaded last dataset `{name}`."));
            }
            Err(err) => tracing::debug!(%err, dataset = %name, "could not reopen last dataset"),
        }
    }

    pub(crate) fn prompt(&self) -> String {
        let name = self.dataset_name.as_deref().unwrap_or("no dataset");
        if self.scope.is_unrestricted() {
            format!("station-ledger [{name}]> ")
        } else {
            format!("station-ledger [{name} | {}]> ", self.scope)
        }
    }

    pub(crate) fn completion_data(&self) -> CompletionData {
        let datasets = self.storage.list_datasets().unwrap_or_default();
        CompletionData::new(&self.registry, &self.access, self.dataset.as_ref(), datasets)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let handler = match self.registry.lookup(command, &self.access) {
            Lookup::Found(entry) => entry.handler,
            Lookup::Hidden(entry) => {
                return Err(CoreError::AccessDenied(format!(
                    "`{}` is limited to the admin role",
                    entry.name
                ))
                .into());
            }
            Lookup::Missing => {
                self.suggest_command(raw);
                return Ok(LoopControl::Continue);
            }
        };
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        if let Some(best) = self.registry.suggest(input, &self.access) {
            output::info(format!("Suggestion: `{best}`?"));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::DatasetNotLoaded => {
                output::error(CommandError::DatasetNotLoaded);
                output::hint("Try `new Demo` to start an empty dataset.");
            }
            other => output::error(other),
        }
    }

    pub(crate) fn dataset(&self) -> Result<&StationDataset, CommandError> {
        self.dataset.as_ref().ok_or(CommandError::DatasetNotLoaded)
    }

    pub(crate) fn dataset_mut(&mut self) -> Result<&mut StationDataset, CommandError> {
        self.dataset.as_mut().ok_or(CommandError::DatasetNotLoaded)
    }

    pub(crate) fn set_dataset(
        &mut self,
        dataset: StationDataset,
        name: Option<String>,
        path: Option<PathBuf>,
    ) {
        for warning in dataset_warnings(&dataset) {
            output::warning(warning);
        }
        self.dataset_name = name.or_else(|| Some(dataset.name.clone()).filter(|n| !n.is_empty()));
        self.dataset_path = path;
        self.dataset = Some(dataset);
    }

    /// The current filter narrowed to what the active role may see.
    pub(crate) fn effective_scope(&self) -> Result<RecordScope, CommandError> {
        Ok(self.scope.clone().restrict_to(&self.access)?)
    }

    pub(crate) fn scoped_records(&self) -> Result<Vec<&DailyRecord>, CommandError> {
        let scope = self.effective_scope()?;
        let dataset = self.dataset()?;
        Ok(station_core::filter_records(&dataset.records, &scope))
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn currency(&self) -> &str {
        &self.config.currency
    }
}
