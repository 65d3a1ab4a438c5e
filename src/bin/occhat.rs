use std::process;

use clap::Parser;
use ochat::commands::chat::{self, ChatArgs};

#[derive(Debug, Parser)]
#[command(
    name = "occhat",
    about = "Start an interactive conversation",
    disable_version_flag = true
)]
struct Cli {
    #[command(flatten)]
    chat: ChatArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = chat::run(cli.chat).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
