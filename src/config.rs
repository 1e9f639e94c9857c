//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default provider endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// System instruction used when no Space supplies its own prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a rigorous analytical assistant. Before answering, silently verify \
your reasoning: attack your own first draft, check the question for false \
premises, then compress the result. Answer as one dense paragraph: a direct \
verdict, the strongest evidence for it, why competing views fall short, and \
a source in parentheses. Take a side when the evidence favors one; never \
hedge with \"it depends\" when it does not.";

/// Provider client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key, sent as `x-goog-api-key` on every request.
    pub api_key: SecretString,
    /// Endpoint base URL (overridable for tests and proxies).
    pub base_url: String,
    /// Overall request timeout, including the streamed body.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Build a config with default endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read configuration from the environment.
    ///
    /// `GEMINI_API_KEY` is required; `GEMINI_BASE_URL` and
    /// `GEMINI_TIMEOUT_SECS` override the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;
        let mut config = Self::new(api_key);

        if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(secs) = std::env::var("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GEMINI_TIMEOUT_SECS".to_string(),
                message: format!("not a number: {secs}"),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
