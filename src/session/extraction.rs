//! Token extraction from persisted provider entries.
//!
//! Provider SDK versions have persisted sessions in different shapes. Each
//! known shape has a pure extraction strategy; they are tried in order and
//! the first one that yields a non-empty token wins. Unknown shapes simply
//! yield nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Default naming convention for provider session keys, e.g.
/// `sb-abcdefgh-auth-token`.
pub const DEFAULT_KEY_PATTERN: &str = r"^sb-.+-auth-token$";

static DEFAULT_MATCHER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_KEY_PATTERN).expect("default key pattern is a valid regex")
});

/// A pure `entry -> token` function.
pub type ExtractionStrategy = fn(&Value) -> Option<String>;

/// Strategies in the order they are tried.
pub const EXTRACTION_STRATEGIES: &[(&str, ExtractionStrategy)] = &[
    ("direct", direct_field),
    ("current_session", current_session_field),
    ("session_array", first_session_in_array),
];

fn non_empty(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        _ => None,
    }
}

/// `{"access_token": "..."}`
pub fn direct_field(entry: &Value) -> Option<String> {
    non_empty(entry.get("access_token"))
}

/// `{"currentSession": {"access_token": "..."}}`
pub fn current_session_field(entry: &Value) -> Option<String> {
    let session = entry
        .get("currentSession")
        .or_else(|| entry.get("current_session"))?;
    non_empty(session.get("access_token"))
}

/// `[{"access_token": "..."}, ...]`
pub fn first_session_in_array(entry: &Value) -> Option<String> {
    non_empty(entry.as_array()?.first()?.get("access_token"))
}

/// Run every strategy over a raw stored value.
///
/// Returns the token and the name of the strategy that matched. Values that
/// are not JSON never match.
pub fn extract_token(raw: &str) -> Option<(String, &'static str)> {
    let entry: Value = serde_json::from_str(raw).ok()?;
    EXTRACTION_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(&entry).map(|token| (token, *name)))
}

/// Decides which storage keys belong to the identity provider.
#[derive(Debug, Clone)]
pub struct ProviderKeyMatcher {
    pattern: Regex,
}

impl ProviderKeyMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }
}

impl Default for ProviderKeyMatcher {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_MATCHER.clone(),
        }
    }
}
