//! EZCaters binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialise tracing (stderr, so stdout stays the conversation)
//! 3. Build the HTTP backend and the fallback responder
//! 4. Run the requested command: interactive chat, one-shot ask or search

mod cli;
mod console;
mod speech;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use ezcaters_core::config::AgentConfig;
use ezcaters_core::types::{SearchType, SessionId};
use ezcaters_dialogue::search::{self as caterer_search, EMPTY_QUERY_MESSAGE, SEARCH_FAILED_MESSAGE};
use ezcaters_dialogue::{CatererSearch, DialogueController, FallbackResponder, HttpBackend};
use ezcaters_voice::{event_channel, CaptureSession, ScriptedRecognizer};

use cli::{ChatInput, CliArgs, Command};
use console::ConsoleGateway;
use speech::CommandSynthesizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = AgentConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting EZCaters v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    tracing::info!(base_url = %backend.base_url(), "Conversation backend configured");
    let responder = FallbackResponder::new(backend.clone())
        .with_latency(config.backend.simulated_latency());

    match args.command {
        Command::Chat {
            simulate_speech,
            speak,
        } => run_chat(&config, backend, responder, simulate_speech, speak).await?,
        Command::Ask { text } => {
            let reply = responder.respond(&SessionId::generate(), &text.join(" ")).await;
            println!("{}", reply.text);
        }
        Command::Search { kind, query } => run_search(backend.as_ref(), kind, &query.join(" ")).await,
    }

    Ok(())
}

async fn run_chat(
    config: &AgentConfig,
    backend: Arc<HttpBackend>,
    responder: FallbackResponder,
    simulate_speech: Vec<String>,
    speak: bool,
) -> std::io::Result<()> {
    let (sink, mut events) = event_channel();

    // Without a simulated engine there is nothing to capture speech with.
    let capture = if config.capture.enabled && !simulate_speech.is_empty() {
        let engine = simulate_speech
            .iter()
            .fold(ScriptedRecognizer::new(sink.clone()), |engine, text| {
                engine.push_utterance(text)
            });
        Some(CaptureSession::new(Box::new(engine), sink.clone(), &config.capture))
    } else {
        None
    };

    let mut controller = DialogueController::new(capture, responder, Box::new(ConsoleGateway))
        .with_search(backend);
    if speak {
        controller = controller
            .with_speaker(Box::new(CommandSynthesizer::default()), config.speech.clone());
    }

    println!("Type a message, :voice to toggle speech, :search <cuisine|location|menu> <query>, :quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ChatInput::parse(&line) {
                    ChatInput::Quit => break,
                    ChatInput::Voice => controller.toggle(),
                    ChatInput::Search(kind, query) => {
                        controller.search(kind, &query).await;
                    }
                    ChatInput::Text(text) => {
                        controller.submit_text(&text).await;
                    }
                    ChatInput::Invalid(message) => println!("error: {message}"),
                }
            }
            Some(event) = events.recv() => {
                controller.handle_event(event).await;
            }
        }
    }

    controller.shutdown().await;
    drop(sink);
    Ok(())
}

async fn run_search(search: &dyn CatererSearch, kind: SearchType, query: &str) {
    let request = match caterer_search::build_request(kind, query) {
        Ok(request) => request,
        Err(_) => {
            println!("error: {EMPTY_QUERY_MESSAGE}");
            return;
        }
    };
    match search.search(&request).await {
        Ok(results) => println!("{}", console::render_results(&results)),
        Err(e) => {
            tracing::warn!(error = %e, "Caterer search failed");
            println!("error: {SEARCH_FAILED_MESSAGE}");
        }
    }
}
