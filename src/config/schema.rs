//! Config schema and deserialization

use serde::{Deserialize, Serialize};

/// Sliding-window limits applied per identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    #[serde(default = "default_per_minute")]
    pub per_minute: usize,
    #[serde(default = "default_per_hour")]
    pub per_hour: usize,
}

fn default_per_minute() -> usize {
    10
}

fn default_per_hour() -> usize {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
        }
    }
}

/// Chat-completion settings for AI commentary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Request AI commentary on every evaluation
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,
    #[serde(default = "default_improvement_max_tokens")]
    pub improvement_max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_analysis_max_tokens() -> u32 {
    500
}

fn default_improvement_max_tokens() -> u32 {
    400
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            analysis_max_tokens: default_analysis_max_tokens(),
            improvement_max_tokens: default_improvement_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Arithmetic challenge before each interactive evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Root config structure for .investrc.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Minimum overall percentage; a batch compares its average (exit 1 if below). Default: none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,

    /// Glob patterns for files/directories to exclude
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Story file suffixes collected from directories (default: .story, .story.md, .story.txt)
    #[serde(default)]
    pub story_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<ChallengeConfig>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_threshold: Option<u8>, cli_ai: bool) -> Self {
        if cli_threshold.is_some() {
            self.threshold = cli_threshold;
        }
        if cli_ai {
            let mut ai = self.ai.take().unwrap_or_default();
            ai.enabled = true;
            self.ai = Some(ai);
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.threshold.is_none() {
            self.threshold = base.threshold;
        }
        if self.extends.is_none() {
            self.extends = base.extends;
        }

        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;

        if self.story_patterns.is_empty() {
            self.story_patterns = base.story_patterns;
        }

        if self.rate_limit.is_none() {
            self.rate_limit = base.rate_limit;
        }
        if self.ai.is_none() {
            self.ai = base.ai;
        }
        if self.challenge.is_none() {
            self.challenge = base.challenge;
        }
    }

    /// Story file suffixes, falling back to the defaults
    pub fn get_story_patterns(&self) -> Vec<&str> {
        if self.story_patterns.is_empty() {
            vec![".story", ".story.md", ".story.txt"]
        } else {
            self.story_patterns.iter().map(|s| s.as_str()).collect()
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit.unwrap_or_default()
    }

    pub fn ai(&self) -> AiConfig {
        self.ai.clone().unwrap_or_default()
    }

    pub fn challenge_enabled(&self) -> bool {
        self.challenge.map(|c| c.enabled).unwrap_or(false)
    }
}
