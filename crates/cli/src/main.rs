mod cli;
mod pipeline;

use clap::Parser;
use cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(error) = pipeline::run(&cli) {
        eprintln!("gorbe: {}", error);
        process::exit(1);
    }
}
