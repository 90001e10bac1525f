use std::io::Write;

use slackmoji_core::config::{AppConfig, LoadOptions};
use slackmoji_core::notifier::prompt_for;
use slackmoji_llm::build_client;

use crate::commands::{build_runtime, CommandResult};
use crate::logging;

const COMMAND: &str = "generate";

/// Streams the completion for `emoji` straight to stdout, using the same
/// prompt the notifier sends.
pub fn run(emoji: &str, verbose: bool) -> CommandResult {
    let emoji = emoji.trim().trim_matches(':');
    if emoji.is_empty() {
        return CommandResult::failure(COMMAND, "usage", "emoji name must not be empty", 2);
    }

    let config = match AppConfig::load_for_generation(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };
    logging::init(&config.logging, verbose);

    let client = match build_client(&config.llm) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure(COMMAND, "llm_setup", error.to_string(), 1),
    };
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure(COMMAND, "runtime", error.to_string(), 1),
    };

    let prompt = prompt_for(emoji);
    let streamed = runtime.block_on(async {
        let mut stdout = std::io::stdout();
        client
            .stream(&prompt, &mut |chunk: &str| {
                let _ = stdout.write_all(chunk.as_bytes());
                let _ = stdout.flush();
            })
            .await
    });

    match streamed {
        Ok(_) => {
            println!();
            CommandResult::streamed()
        }
        Err(error) => CommandResult::failure(COMMAND, "generation", error.to_string(), 1),
    }
}
