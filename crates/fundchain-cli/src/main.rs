#![forbid(unsafe_code)]

use std::process::ExitCode;

fn main() -> ExitCode {
    fundchain_cli::main_entry()
}
