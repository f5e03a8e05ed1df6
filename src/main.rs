use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use photo_search::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    photo_search::run(cli)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "photo_search=debug",
        _ => "photo_search=trace",
    };
    let filter = EnvFilter::try_from_env("PHOTO_SEARCH_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
