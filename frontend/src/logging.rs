//! Log facility setup for the daemon.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::ExitCode;

/// Install the global subscriber from a filter directive string and an
/// optional log file. Failures map onto the stable exit codes.
pub fn setup(levels: &str, log_path: Option<&Path>) -> Result<(), ExitCode> {
    let filter = match EnvFilter::try_new(levels) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("invalid log level specification {levels:?}: {e}");
            return Err(ExitCode::LogLevelParseFail);
        }
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match log_path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                eprintln!("cannot create log directory {}: {e}", parent.display());
                return Err(ExitCode::LogFileStructureFail);
            }
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("cannot open log file {}: {e}", path.display());
                    return Err(ExitCode::LogFileStructureFail);
                }
            };
            builder
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .try_init()
        }
        None => builder.try_init(),
    };
    result.map_err(|e| {
        eprintln!("cannot install log subscriber: {e}");
        ExitCode::LogFacilityFail
    })
}
