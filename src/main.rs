use clap::Parser;
use gplay::{
    cli::{Cli, run_cli},
    logging::init_logger,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(err) = run_cli(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
