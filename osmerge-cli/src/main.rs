//! Entry point for the `osmerge` binary.
#![forbid(unsafe_code)]

use osmerge_cli::{CliError, run};

#[expect(clippy::print_stderr, reason = "top-level error report")]
fn main() {
    match run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("osmerge: {err}");
            std::process::exit(1);
        }
    }
}
