// Target-specific transitive dependency split (mio/crossterm stack) is accepted for now.
#![allow(clippy::multiple_crate_versions)]

use terrace_cli::CliError;

fn main() {
    match terrace_cli::run() {
        Ok(code) => std::process::exit(code),
        Err(CliError::ArgumentParse(error)) => {
            let _ = error.print();
            std::process::exit(error.exit_code());
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    }
}
