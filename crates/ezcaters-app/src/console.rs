//! Terminal rendering of the dialogue.

use std::fmt::Write as _;

use ezcaters_core::types::{CaptureFailure, Caterer, DialogueReply, TranscriptEvent};
use ezcaters_dialogue::PresentationGateway;

/// Shown in place of results when a search matched nothing.
pub const NO_RESULTS_MESSAGE: &str = "No caterers found matching your search.";

/// Gateway that prints every update to stdout.
#[derive(Debug, Default)]
pub struct ConsoleGateway;

impl PresentationGateway for ConsoleGateway {
    fn show_listening(&mut self) {
        println!("[listening] Speak now...");
    }

    fn show_processing(&mut self) {
        println!("[processing] ...");
    }

    fn show_ready(&mut self) {
        println!("[ready]");
    }

    fn show_unavailable(&mut self, failure: &CaptureFailure) {
        println!("{}", render_failure(failure));
    }

    fn show_transcript(&mut self, transcript: &TranscriptEvent) {
        println!("you: {}", transcript.display_text());
    }

    fn show_error(&mut self, failure: &CaptureFailure) {
        println!("{}", render_failure(failure));
    }

    fn show_response(&mut self, reply: &DialogueReply) {
        println!("agent ({}): {}", reply.source, reply.text);
    }

    fn clear_displays(&mut self) {}

    fn clear_text_input(&mut self) {}

    fn show_searching(&mut self) {
        println!("Searching...");
    }

    fn show_search_results(&mut self, results: &[Caterer]) {
        println!("{}", render_results(results));
    }

    fn show_search_error(&mut self, message: &str) {
        println!("error: {message}");
    }
}

pub fn render_failure(failure: &CaptureFailure) -> String {
    format!("error: {}\n  hint: {}", failure.message, failure.suggestion)
}

pub fn render_results(results: &[Caterer]) -> String {
    if results.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }
    results
        .iter()
        .map(render_caterer)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One caterer as a short card.
pub fn render_caterer(caterer: &Caterer) -> String {
    let mut out = format!(
        "{} - {} - {:.1} stars - {}",
        caterer.name, caterer.cuisine, caterer.rating, caterer.price_range
    );
    let _ = write!(out, "\n  {}", caterer.location);
    if let Some(distance) = caterer.distance {
        let _ = write!(out, " ({distance:.1} miles away)");
    }
    if !caterer.specialties.is_empty() {
        let _ = write!(out, "\n  Specialties: {}", caterer.specialties.join(", "));
    }
    let _ = write!(
        out,
        "\n  Min order: ${} | Phone: {}",
        caterer.min_order, caterer.phone
    );
    out
}
