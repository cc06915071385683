#![allow(missing_docs)]

use clap::Parser;
use mocc_cli::Opts;
use std::process::ExitCode;

fn main() -> ExitCode {
    let opts = Opts::parse();
    match opts.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
