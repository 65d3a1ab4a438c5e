use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use ochat::commands::chat::{self, ChatArgs};
use ochat::commands::config::{self, ConfigArgs};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("OCHAT_GIT_SHA"), ")");

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  ochat chat --deployment gpt-4o-mini\n  OCHAT_ENDPOINT=https://api.openai.com/v1 ochat chat --deployment gpt-4o-mini --no-stream\n  ochat config check\n  ochat completion bash > ~/.local/share/bash-completion/completions/ochat";

const CHAT_HELP_EXAMPLES: &str = "Examples:\n  ochat chat --deployment gpt-4o-mini\n  ochat chat --profile work --system \"You answer in French.\"\n  ochat chat --deployment gpt-4o-mini --dry-run";

#[derive(Debug, Parser)]
#[command(
    name = "ochat",
    version = VERSION,
    about = "Interactive chat client for chat-completion APIs",
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Start an interactive conversation", after_help = CHAT_HELP_EXAMPLES)]
    Chat(ChatArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "ochat", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "ochat", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "ochat", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => chat::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
