use std::process::ExitCode;

fn main() -> ExitCode {
    lunarglow::cli::run()
}
