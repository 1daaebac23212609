use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Approval flag status of an uplift version.
///
/// The tracker uses single-character values; anything unrecognised is kept
/// verbatim so it round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlagStatus {
    /// `?`: requested, no decision yet.
    Pending,
    /// `+`: approved.
    Approved,
    /// `-`: rejected.
    Rejected,
    Other(String),
}

impl FlagStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "?",
            Self::Approved => "+",
            Self::Rejected => "-",
            Self::Other(raw) => raw.as_str(),
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<&str> for FlagStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "?" => Self::Pending,
            "+" => Self::Approved,
            "-" => Self::Rejected,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FlagStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "?" | "+" | "-" => Self::from(raw.as_str()),
            _ => Self::Other(raw),
        }
    }
}

impl From<FlagStatus> for String {
    fn from(status: FlagStatus) -> Self {
        match status {
            FlagStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which editor form is open on a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    None,
    Flags,
    Approve,
    Reject,
}

impl EditorMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Flags => "flags",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for EditorMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "flags" => Ok(Self::Flags),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseEnumError {
                expected: "editor mode",
                got: s.to_string(),
            }),
        }
    }
}

/// Role a contributor played on a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorRole {
    Creator,
    Reviewer,
    Assignee,
    UpliftAuthor,
    #[serde(other)]
    Other,
}

impl ContributorRole {
    /// Label shown on contributor cards.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Creator => "Bug author",
            Self::Reviewer => "Reviewer",
            Self::Assignee => "Assignee",
            Self::UpliftAuthor => "Uplift author",
            Self::Other => "Contributor",
        }
    }
}
