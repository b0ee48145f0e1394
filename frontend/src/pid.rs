//! PID file handling: exclusive create at startup, removal at clean
//! exit.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::ExitCode;

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn create(path: &Path) -> Result<Self, ExitCode> {
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                error!(path = %path.display(), "process already running");
                return Err(ExitCode::PidExists);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot create PID file");
                return Err(ExitCode::PidCreateFail);
            }
        };
        let pid = std::process::id();
        if let Err(e) = write!(file, "{pid}") {
            error!(path = %path.display(), error = %e, "cannot write PID file");
            let _ = std::fs::remove_file(path);
            return Err(ExitCode::PidCreateFail);
        }
        info!(pid, path = %path.display(), "PID file created");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn remove(self) -> Result<(), ExitCode> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "PID file removed");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "cannot remove PID file");
                Err(ExitCode::PidRemoveFail)
            }
        }
    }
}
