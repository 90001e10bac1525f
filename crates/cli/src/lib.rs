pub mod bootstrap;
pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "slackmoji",
    about = "Announce newly added custom Slack emoji",
    long_about = "Listen for custom emoji additions over Slack Socket Mode and post an \
                  LLM-written example sentence for each new emoji to a channel.",
    after_help = "Examples:\n  slackmoji listen\n  slackmoji generate partyparrot\n  slackmoji config\n  slackmoji version -v"
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging and verbose output")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Listen for new emoji events in Slack and send notifications")]
    Listen,
    #[command(about = "Stream an example sentence for an emoji name to stdout")]
    Generate {
        #[arg(help = "Emoji name, without colons")]
        emoji: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print version information")]
    Version,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Listen => commands::listen::run(cli.verbose),
        Command::Generate { emoji } => commands::generate::run(&emoji, cli.verbose),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Version => {
            commands::CommandResult { exit_code: 0, output: commands::version::run(cli.verbose) }
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
