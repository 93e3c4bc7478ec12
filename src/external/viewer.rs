//! Showing an image in an external viewer (`feh` by default).

use super::ExternalError;
use log::info;
use std::path::Path;
use std::process::Command;

pub trait Viewer {
    /// The command that would display `path`.
    fn command_line(&self, path: &Path) -> Vec<String>;

    /// Display `path`, blocking until the viewer exits.
    fn open(&self, path: &Path) -> Result<(), ExternalError>;
}

#[derive(Debug, Clone)]
pub struct CommandViewer {
    program: String,
}

impl CommandViewer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Viewer for CommandViewer {
    fn command_line(&self, path: &Path) -> Vec<String> {
        vec![self.program.clone(), path.to_string_lossy().into_owned()]
    }

    fn open(&self, path: &Path) -> Result<(), ExternalError> {
        info!("Using -> {}", self.command_line(path).join(" "));
        let status = Command::new(&self.program).arg(path).status()?;
        if !status.success() {
            return Err(ExternalError::CommandFailed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
