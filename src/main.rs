use clap::Parser;
use sales_rollup::app::handle_fatal_error;
use sales_rollup::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = execute(cli).await {
        handle_fatal_error(e, verbose);
    }
}
