//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error as _;

fn main() {
    if let Err(err) = terraload_cli::run() {
        eprintln!("terraload: {err}");
        let mut cause = err.source();
        while let Some(inner) = cause {
            eprintln!("  caused by: {inner}");
            cause = inner.source();
        }
        std::process::exit(1);
    }
}
