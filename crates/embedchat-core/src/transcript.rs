use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::render;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Sender::User),
            "bot" | "assistant" => Some(Sender::Bot),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    sender: Sender,
    text: String,
    rendered_text: String,
    timestamp: String,
}

impl Message {
    /// Create a message stamped with the current local time
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self::at(sender, text, Local::now())
    }

    pub fn at(sender: Sender, text: impl Into<String>, time: DateTime<Local>) -> Self {
        let text = text.into();
        let rendered_text = render::render(&text, sender);
        Self {
            sender,
            text,
            rendered_text,
            timestamp: format_time(&time),
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// The raw text as written or received
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Markup safe to insert into the page
    pub fn rendered_text(&self) -> &str {
        &self.rendered_text
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Format a time as a 12-hour `hh:mm AM` display string
pub fn format_time(time: &DateTime<Local>) -> String {
    time.format("%I:%M %p").to_string()
}

/// Ordered, append-only list of messages
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
