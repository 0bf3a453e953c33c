use std::io;
use std::path::PathBuf;

/// Everything that can stop a load or a run.
///
/// Unmatched brackets and exhausted input are not errors; they are absorbed by
/// the machine. `NotFound` is recoverable by the caller. Every other variant
/// is fatal for the run that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("program source {} not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to allocate {cells} tape cells")]
    OutOfMemory { cells: usize },

    #[error("division by zero at instruction {ip}")]
    DivisionByZero { ip: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
