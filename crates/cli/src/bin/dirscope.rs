use anyhow::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    dirscope_cli::main_entry()
}
