use clap::Parser;
use stocksim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
