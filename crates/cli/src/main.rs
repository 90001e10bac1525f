use std::process::ExitCode;

fn main() -> ExitCode {
    slackmoji_cli::run()
}
