//! Prompt message types.
//!
//! A prompt is an ordered list of role-tagged [`Message`]s. Two roles exist:
//! the single leading system message and the human messages that carry the
//! page data and the final action instruction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Role & Message
// ─────────────────────────────────────────────────────────────────────────────

/// Author role of a prompt message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// Data-bearing or instruction message from the caller.
    Human,
}

impl Role {
    /// Wire label for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "human",
        }
    }
}

/// A single role-tagged prompt message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier
// ─────────────────────────────────────────────────────────────────────────────

/// Representation tier of a prompt.
///
/// `Full` sends every source in its complete form; `Summarized` substitutes
/// condensed counterparts and is the last resort. There is no tier below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Complete source representations.
    Full,
    /// Condensed source representations.
    Summarized,
}

impl Tier {
    /// String label for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Summarized => "summarized",
        }
    }

    /// The next tier down, if any.
    pub fn downgrade(self) -> Option<Self> {
        match self {
            Self::Full => Some(Self::Summarized),
            Self::Summarized => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DeviceType
// ─────────────────────────────────────────────────────────────────────────────

/// Device profile a page is measured under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Mobile emulation (default).
    #[default]
    Mobile,
    /// Desktop profile.
    Desktop,
}

impl DeviceType {
    /// String label for this device type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown device type.
#[derive(Debug, thiserror::Error)]
#[error("unknown device type: {0} (expected \"mobile\" or \"desktop\")")]
pub struct ParseDeviceTypeError(String);

impl FromStr for DeviceType {
    type Err = ParseDeviceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mobile" | "phone" => Ok(Self::Mobile),
            "desktop" => Ok(Self::Desktop),
            other => Err(ParseDeviceTypeError(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
