mod cli;

use clap::Parser;

fn main() {
    let args = cli::normalize_args(std::env::args());
    let cli = cli::Cli::parse_from(args);

    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
