//! Error handling utilities

use tracing::error;

use crate::error::Error;

/// Handle fatal errors and exit with appropriate status code
///
/// Crate errors pick their own exit code (see [`Error::exit_code`]); anything
/// else exits with 1. With `verbose >= 1` the full context chain is printed.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);

    eprintln!("Error: {error}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}

/// Exit code for an error, looking through any added context
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(1, Error::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_sees_through_context() {
        let err: anyhow::Result<()> =
            Err(Error::Validation("too short".into())).context("Failed to submit sales.csv");
        assert_eq!(exit_code(&err.unwrap_err()), 2);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
        assert_eq!(exit_code(&Error::NotFound("job_1".into()).into()), 3);
    }
}
