use std::process::ExitCode;

fn main() -> ExitCode {
    fleetpulse_cli::run()
}
