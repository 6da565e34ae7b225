use clap::Parser;
use tradeblocks::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
