//! Prompt Set
//!
//! The greeting and the three fixed system instructions the session seeds the
//! upstream conversation with. Each text can be overridden by a markdown file
//! in the prompts directory (`greeting.md`, `persona.md`,
//! `description_template.md`, `response_style.md`); compiled-in defaults keep
//! the service bootable from a bare checkout.

use std::fs;
use std::path::Path;
use tracing::debug;

const DEFAULT_GREETING: &str =
    "Hello! I am your guide to the gothic sculpture collection. Ask me about any piece in the gallery.";
const DEFAULT_PERSONA: &str = "You are a knowledgeable, friendly guide for a gallery of gothic \
sculptures. You answer questions about the sculptures on display, their artists, their history \
and the gothic style. Keep the conversation warm and suited to being spoken aloud.";
const DEFAULT_DESCRIPTION_TEMPLATE: &str = "When describing a sculpture, mention its name, its \
artist and year when known, where the original stands, and one or two details a visitor would \
find memorable.";
const DEFAULT_RESPONSE_STYLE: &str = "Answer briefly and clearly. Prefer two or three spoken \
sentences over lists. If you are not sure about a detail, say so instead of inventing one.";

/// The conversational texts owned by the session controller.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub greeting: String,
    pub persona: String,
    pub description_template: String,
    pub response_style: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            persona: DEFAULT_PERSONA.to_string(),
            description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
            response_style: DEFAULT_RESPONSE_STYLE.to_string(),
        }
    }
}

impl PromptSet {
    /// Loads the prompt set, overriding defaults with any files present in
    /// `dir`.
    pub fn load(dir: &Path) -> Self {
        let mut set = Self::default();
        if let Some(text) = read_prompt(dir, "greeting") {
            set.greeting = text;
        }
        if let Some(text) = read_prompt(dir, "persona") {
            set.persona = text;
        }
        if let Some(text) = read_prompt(dir, "description_template") {
            set.description_template = text;
        }
        if let Some(text) = read_prompt(dir, "response_style") {
            set.response_style = text;
        }
        set
    }

    /// The three system instructions, in seeding order.
    pub fn instructions(&self) -> [&str; 3] {
        [
            &self.persona,
            &self.description_template,
            &self.response_style,
        ]
    }
}

fn read_prompt(dir: &Path, stem: &str) -> Option<String> {
    let path = dir.join(format!("{stem}.md"));
    match fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Prompt file not loaded; using default");
            None
        }
    }
}
