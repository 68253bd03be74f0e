//! Command-line arguments and chat input parsing for the `ezcaters` binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ezcaters_core::config::AgentConfig;
use ezcaters_core::types::SearchType;

/// EZCaters - a voice-driven assistant for finding catering services.
#[derive(Parser, Debug)]
#[command(name = "ezcaters", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the conversation backend.
    #[arg(short = 'b', long = "backend-url", global = true)]
    pub backend_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive conversation on stdin.
    Chat {
        /// Replay each utterance through a scripted speech engine, one per
        /// `:voice` toggle. Without it voice mode is unavailable.
        #[arg(long = "simulate-speech", value_name = "TEXT")]
        simulate_speech: Vec<String>,

        /// Speak replies through the local `espeak` command.
        #[arg(long = "speak")]
        speak: bool,
    },
    /// Send one message and print the reply.
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Search caterers by cuisine, location or menu item.
    Search {
        kind: SearchType,
        #[arg(required = true)]
        query: Vec<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > EZCATERS_CONFIG env var > ~/.ezcaters/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("EZCATERS_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(ref url) = self.backend_url {
            config.backend.base_url = url.clone();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ezcaters").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ezcaters").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// One line typed into the chat loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Quit,
    Voice,
    Search(SearchType, String),
    Text(String),
    Invalid(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return ChatInput::Text(line.to_string());
        };
        let mut parts = command.splitn(3, char::is_whitespace);
        match parts.next().unwrap_or_default() {
            "quit" | "q" => ChatInput::Quit,
            "voice" | "v" => ChatInput::Voice,
            "search" => {
                let kind = parts.next().unwrap_or_default();
                let query = parts.next().unwrap_or_default().trim().to_string();
                match kind.parse() {
                    Ok(kind) => ChatInput::Search(kind, query),
                    Err(e) => ChatInput::Invalid(e),
                }
            }
            other => ChatInput::Invalid(format!("unknown command: :{other}")),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
