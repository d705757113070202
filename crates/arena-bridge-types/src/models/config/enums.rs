//! Conversation shaping enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the arena session is driven.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ConversationMode {
    /// Single model chat; system turns sit on side `b`, everything else on `a`
    #[default]
    DirectChat,
    /// Side-by-side battle; every turn is aligned with the chosen target
    Battle,
}

impl From<String> for ConversationMode {
    fn from(s: String) -> Self {
        Self::from_string(&s)
    }
}

impl From<ConversationMode> for String {
    fn from(mode: ConversationMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DirectChat => write!(f, "direct_chat"),
            Self::Battle => write!(f, "battle"),
        }
    }
}

impl ConversationMode {
    /// Parse from string. Anything other than `battle` is direct chat.
    pub fn from_string(s: &str) -> Self {
        if s.eq_ignore_ascii_case("battle") {
            Self::Battle
        } else {
            Self::DirectChat
        }
    }
}

/// One of the two sides of an arena conversation.
///
/// Serialized in the lowercase wire form (`a`/`b`); the uppercase form used
/// by config files is accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Participant {
    #[default]
    #[serde(rename = "a", alias = "A")]
    A,
    #[serde(rename = "b", alias = "B")]
    B,
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

impl Participant {
    /// The protocol marker character for this side.
    pub const fn marker(self) -> char {
        match self {
            Self::A => 'a',
            Self::B => 'b',
        }
    }
}

/// Output modality of an arena model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Text,
    Image,
}

impl Modality {
    /// Parse from the suffix of a `models.json` entry. Unknown kinds fall back to text.
    pub fn from_string(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("image") {
            Self::Image
        } else {
            Self::Text
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_defaults_to_direct() {
        assert_eq!(ConversationMode::from_string("battle"), ConversationMode::Battle);
        assert_eq!(ConversationMode::from_string("direct_chat"), ConversationMode::DirectChat);
        assert_eq!(ConversationMode::from_string("whatever"), ConversationMode::DirectChat);
    }

    #[test]
    fn test_participant_accepts_uppercase() {
        let p: Participant = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(p, Participant::B);
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"b\"");
    }

    #[test]
    fn test_mode_roundtrips_as_string() {
        let json = serde_json::to_string(&ConversationMode::Battle).unwrap();
        assert_eq!(json, "\"battle\"");
    }
}
