use chrono::Duration;

/// Runtime knobs the built-in handlers need, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub session_ttl: Duration,
    /// Supported language codes, lowercase.
    pub languages: Vec<String>,
    pub default_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            languages: vec!["en".to_string()],
            default_language: "en".to_string(),
        }
    }
}

impl Settings {
    pub fn supports_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l == code)
    }
}
