//! Process exit codes.

use pdf_rag::{ErrorKind, RagError};

pub const SUCCESS: u8 = 0;
pub const CONFIGURATION: u8 = 1;
pub const MISSING_INPUT: u8 = 2;
pub const EXTERNAL_SERVICE: u8 = 3;
/// Cancelled by Ctrl-C; the shell convention for SIGINT (128 + 2).
pub const INTERRUPTED: u8 = 130;

/// Map an error kind to the documented exit code.
pub fn code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Configuration | ErrorKind::DimensionMismatch => CONFIGURATION,
        ErrorKind::NotFound | ErrorKind::EmptyIndex | ErrorKind::CorruptIndex | ErrorKind::Io => {
            MISSING_INPUT
        }
        ErrorKind::ExternalService => EXTERNAL_SERVICE,
        ErrorKind::Cancelled => INTERRUPTED,
    }
}

/// Exit code for a top-level error. Errors that did not originate in the
/// pipeline are treated as configuration problems.
pub fn code_for_error(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RagError>().map(|e| code_for(e.kind())).unwrap_or(CONFIGURATION)
}
