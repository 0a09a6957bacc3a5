use std::process::ExitCode;

fn main() -> ExitCode {
    cartprice_cli::run()
}
