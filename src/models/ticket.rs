//! Support-ticket domain enums.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Support,
    Feedback,
    BugReport,
    FeatureRequest,
}

impl TicketKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Feedback => "feedback",
            Self::BugReport => "bug_report",
            Self::FeatureRequest => "feature_request",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "support" => Some(Self::Support),
            "feedback" => Some(Self::Feedback),
            "bug_report" => Some(Self::BugReport),
            "feature_request" => Some(Self::FeatureRequest),
            _ => None,
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform identifiers match what the mobile clients send verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    Android,
    Web,
}

impl Platform {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Android => "Android",
            Self::Web => "Web",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "iOS" => Some(Self::Ios),
            "Android" => Some(Self::Android),
            "Web" => Some(Self::Web),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    InProgress,
    Resolved,
}

impl TicketStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(TicketKind::parse("bug_report"), Some(TicketKind::BugReport));
        assert_eq!(TicketKind::parse("spam"), None);
    }

    #[test]
    fn test_platform_serde_casing() {
        assert_eq!(serde_json::to_string(&Platform::Ios).unwrap(), "\"iOS\"");
        let p: Platform = serde_json::from_str("\"Android\"").unwrap();
        assert_eq!(p, Platform::Android);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            TicketStatus::parse("in_progress"),
            Some(TicketStatus::InProgress)
        );
        assert_eq!(TicketStatus::parse(""), None);
    }
}
