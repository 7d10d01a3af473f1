use serde::{Deserialize, Serialize};

/// Default chat endpoint base URL
pub const DEFAULT_API_BASE: &str = "https://server1001.navaura.in";

/// Default delay before the one-time automatic open
pub const DEFAULT_AUTO_TRIGGER_DELAY_MS: u32 = 5000;

/// Durable storage key holding the conversation identifier
pub const DEFAULT_SESSION_KEY: &str = "navaura_session_id";

/// Ephemeral storage key recording that the auto-trigger fired
pub const DEFAULT_AUTO_TRIGGER_KEY: &str = "navaura_auto_triggered";

pub const DEFAULT_SESSION_PREFIX: &str = "sess_";

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I encountered an error. Please try again or contact us at namaskar@navaura.in";

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hey there! 👋 I'm KRITTIM, your AI assistant from Navaura Arctiq. I'm here to help you with anything you need!";

/// Widget configuration supplied by the hosting page.
///
/// Every field is optional in the JSON form; missing fields take the
/// defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub api_base: String,
    pub title: String,
    pub subtitle: String,
    pub auto_trigger_delay_ms: u32,
    pub session_key: String,
    pub auto_trigger_key: String,
    pub session_prefix: String,
    pub welcome_message: String,
    pub fallback_message: String,
    pub suggestions: Vec<String>,
    pub input_max_height_px: u32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            title: "KRITTIM AI".to_string(),
            subtitle: "Navaura Support • Online".to_string(),
            auto_trigger_delay_ms: DEFAULT_AUTO_TRIGGER_DELAY_MS,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            auto_trigger_key: DEFAULT_AUTO_TRIGGER_KEY.to_string(),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            suggestions: default_suggestions(),
            input_max_height_px: 120,
        }
    }
}

fn default_suggestions() -> Vec<String> {
    [
        "Tell me about your services",
        "I need technical support",
        "Request a demo",
        "Pricing information",
        "Contact your team",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl WidgetConfig {
    /// Parse a JSON configuration object. Blank input yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    /// Letter shown in the bot's avatar
    pub fn bot_avatar(&self) -> String {
        self.title
            .chars()
            .next()
            .map_or_else(|| "B".to_string(), |c| c.to_uppercase().to_string())
    }

    /// Full URL of the chat endpoint (`<api_base>/chat`)
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.api_base.trim_end_matches('/'))
    }
}
