//! Applies side-effect descriptors.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use kiln_common::fs::{FileSystem, LocalFileSystem};

use crate::error::SideEffectError;
use crate::side_effect::{SideEffectDescriptor, SideEffectState};

/// Applies side effects in order, stopping at the first failure.
pub struct SideEffectExecutor {
    fs: Arc<dyn FileSystem>,
}

impl Default for SideEffectExecutor {
    fn default() -> Self {
        Self::new(Arc::new(LocalFileSystem))
    }
}

impl SideEffectExecutor {
    /// Creates an executor writing through `fs`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Applies every descriptor in order.
    pub fn execute(&self, side_effects: &[SideEffectDescriptor]) -> Result<(), SideEffectError> {
        for effect in side_effects {
            self.apply(effect)?;
        }
        Ok(())
    }

    fn apply(&self, effect: &SideEffectDescriptor) -> Result<(), SideEffectError> {
        match effect {
            SideEffectDescriptor::File(file) => match file.state {
                SideEffectState::Present => {
                    tracing::debug!(path = %file.path.display(), "writing file");
                    let contents = file.contents.as_deref().unwrap_or_default();
                    self.fs.write(&file.path, contents).map_err(io_error(&file.path))
                }
                SideEffectState::Absent => {
                    tracing::debug!(path = %file.path.display(), "removing file");
                    self.fs.remove(&file.path).map_err(io_error(&file.path))
                }
            },
            SideEffectDescriptor::Directory(dir) => match dir.state {
                SideEffectState::Present => {
                    tracing::debug!(path = %dir.path.display(), "creating directory");
                    self.fs.create_directory(&dir.path).map_err(io_error(&dir.path))
                }
                SideEffectState::Absent => {
                    tracing::debug!(path = %dir.path.display(), "removing directory");
                    self.fs.remove(&dir.path).map_err(io_error(&dir.path))
                }
            },
            SideEffectDescriptor::Command(command) => {
                let (program, args) = command
                    .argv
                    .split_first()
                    .ok_or(SideEffectError::EmptyCommand)?;
                tracing::debug!(command = %command.argv.join(" "), "running command");
                let status = Command::new(program)
                    .args(args)
                    .status()
                    .map_err(|source| SideEffectError::Spawn {
                        program: program.clone(),
                        source,
                    })?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SideEffectError::CommandFailed {
                        command: command.argv.join(" "),
                        status: status.to_string(),
                    })
                }
            }
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SideEffectError + '_ {
    move |source| SideEffectError::Io {
        path: path.to_path_buf(),
        source,
    }
}
