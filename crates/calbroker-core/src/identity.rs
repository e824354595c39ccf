//! Chat-channel identity normalization.
//!
//! End users reach the bot over chat channels whose addresses come in many
//! spellings: `whatsapp:+1 234-567-8900`, `+12345678900`, `12345678900`.
//! Attribution matching and permission checks compare identities, so every
//! spelling of the same underlying address must normalize to one canonical
//! form. That canonical form is what gets written into calendar events as the
//! attribution tag.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Regex for stripping a channel scheme prefix (e.g. `whatsapp:`, `tel:`).
static CHANNEL_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(whatsapp|tel|sms):\s*").expect("Invalid prefix regex"));

/// A normalized chat-channel identity.
///
/// For phone-number-shaped addresses the canonical form is `+` followed by
/// the digits only. Identities without any digits (service accounts, test
/// fixtures) fall back to the lowercased trimmed input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelIdentity(String);

impl ChannelIdentity {
    /// Normalizes a raw channel address into its canonical form.
    ///
    /// Steps:
    /// 1. Trim whitespace and strip the channel scheme prefix.
    /// 2. Drop every character that is not a digit.
    /// 3. If any digits remain, the canonical form is `+<digits>` regardless
    ///    of whether the input carried a leading `+`.
    pub fn normalize(raw: &str) -> Self {
        let stripped = CHANNEL_PREFIX_REGEX.replace(raw.trim(), "");
        let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() {
            Self(stripped.to_lowercase())
        } else {
            Self(format!("+{digits}"))
        }
    }

    /// Wraps a value that is already in canonical form.
    ///
    /// Used when reading attribution tags back out of calendar events, which
    /// were written canonicalized in the first place.
    pub fn from_canonical(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether a raw (possibly unnormalized) address refers to this
    /// identity.
    pub fn matches_raw(&self, raw: &str) -> bool {
        Self::normalize(raw) == *self
    }
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whatsapp_prefix() {
        let id = ChannelIdentity::normalize("whatsapp:+12345678900");
        assert_eq!(id.as_str(), "+12345678900");
    }

    #[test]
    fn spellings_converge() {
        let a = ChannelIdentity::normalize("whatsapp:+1 234-567-8900");
        let b = ChannelIdentity::normalize("12345678900");
        let c = ChannelIdentity::normalize("+12345678900");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "+12345678900");
    }

    #[test]
    fn prefix_is_case_insensitive() {
        let a = ChannelIdentity::normalize("WhatsApp:+49 160 1234567");
        let b = ChannelIdentity::normalize("whatsapp:+491601234567");
        assert_eq!(a, b);
    }

    #[test]
    fn punctuation_and_spaces_dropped() {
        let id = ChannelIdentity::normalize("  +44 (20) 7946-0958 ");
        assert_eq!(id.as_str(), "+442079460958");
    }

    #[test]
    fn non_numeric_identity_falls_back_to_lowercase() {
        let id = ChannelIdentity::normalize("Agent-Console");
        assert_eq!(id.as_str(), "agent-console");
    }

    #[test]
    fn matches_raw_spellings() {
        let id = ChannelIdentity::normalize("+15551230000");
        assert!(id.matches_raw("whatsapp:+1 (555) 123-0000"));
        assert!(id.matches_raw("15551230000"));
        assert!(!id.matches_raw("+15551230001"));
    }

    #[test]
    fn serde_is_transparent() {
        let id = ChannelIdentity::normalize("whatsapp:+12345678900");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""+12345678900""#);
        let parsed: ChannelIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
