//! stylepack CLI binary entry point
//!
//! Thin wrapper around the library's `run_cli()` that maps failures to
//! distinct exit codes.

use std::process::ExitCode;

use stylepack_cli::run_cli;
use stylepack_ooxml::PackError;

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<PackError>())
                .map(PackError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
