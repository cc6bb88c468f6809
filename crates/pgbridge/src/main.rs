//! pgbridge - load a Singer-style message stream into PostgreSQL.

mod app;
mod cli;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = cli::Args::parse().into_invocation_args();

    match app::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pgbridge: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("hint: {hint}");
            }
            if e.is_pre_connection() {
                eprintln!("pgbridge: no database connection was attempted");
            }
            ExitCode::FAILURE
        }
    }
}
