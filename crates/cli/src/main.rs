use clap::Parser;

use alertstack_cli::cli::Cli;
use alertstack_cli::{commands, logging};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let code = commands::run(Cli::parse()).await;
    if code != 0 {
        std::process::exit(code);
    }
}
