use std::process::ExitCode;

fn main() -> ExitCode {
    callplan_cli::run()
}
