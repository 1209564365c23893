#![deny(unsafe_code)]
//! # evo-redact
//!
//! Scrubs secret-shaped substrings from text before it is persisted or
//! compared. Pure and total: any input, including the empty string and
//! control bytes, yields a string.
//!
//! Patterns are applied in a fixed order and each class has its own
//! placeholder, so a redacted log still says *what* was removed:
//!
//! | Class | Placeholder |
//! |---|---|
//! | credential assignment (`token=…`, `password: …`) | `[REDACTED]` (key kept) |
//! | bearer header value | `[REDACTED]` (prefix kept) |
//! | AWS access key id | `[REDACTED_AWS_KEY]` |
//! | GitHub token | `[REDACTED_GH_TOKEN]` |
//! | Slack token | `[REDACTED_SLACK_TOKEN]` |
//! | hex blob of 32+ chars | `[REDACTED_HEX]` |
//! | PEM private key block | `[REDACTED_PRIVATE_KEY]` |
//!
//! Redaction is idempotent: placeholders start with `[`, which no pattern
//! accepts as the first character of a secret value.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Secret pattern classes, in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretClass {
    CredentialAssignment,
    BearerToken,
    AwsAccessKey,
    GithubToken,
    SlackToken,
    HexBlob,
    PrivateKey,
}

impl SecretClass {
    pub const ALL: [SecretClass; 7] = [
        SecretClass::CredentialAssignment,
        SecretClass::BearerToken,
        SecretClass::AwsAccessKey,
        SecretClass::GithubToken,
        SecretClass::SlackToken,
        SecretClass::HexBlob,
        SecretClass::PrivateKey,
    ];

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::CredentialAssignment | Self::BearerToken => "[REDACTED]",
            Self::AwsAccessKey => "[REDACTED_AWS_KEY]",
            Self::GithubToken => "[REDACTED_GH_TOKEN]",
            Self::SlackToken => "[REDACTED_SLACK_TOKEN]",
            Self::HexBlob => "[REDACTED_HEX]",
            Self::PrivateKey => "[REDACTED_PRIVATE_KEY]",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::CredentialAssignment => {
                r#"(?i)(api[_-]?key|api[_-]?secret|token|secret|password|passwd|authorization|bearer)(\s*[:=]\s*)(\\?['"]?)([A-Za-z0-9_\-/+=.]{8,})"#
            }
            Self::BearerToken => r"(?i)(Bearer\s+)([A-Za-z0-9_\-/+=.]{8,})",
            Self::AwsAccessKey => r"\bAKIA[0-9A-Z]{16}\b",
            Self::GithubToken => r"\bgh[pousr]_[A-Za-z0-9_]{36,}\b",
            Self::SlackToken => r"\bxox[bpsa]-[A-Za-z0-9\-]{10,}\b",
            Self::HexBlob => r"\b[0-9a-fA-F]{32,}\b",
            Self::PrivateKey => {
                r"(?s)-----BEGIN\s+(RSA\s+)?PRIVATE\s+KEY-----.*?-----END\s+(RSA\s+)?PRIVATE\s+KEY-----"
            }
        }
    }

    /// Replacement template; capture groups keep the non-secret prefix.
    fn replacement(&self) -> &'static str {
        match self {
            Self::CredentialAssignment => "${1}${2}${3}[REDACTED]",
            Self::BearerToken => "${1}[REDACTED]",
            other => other.placeholder(),
        }
    }
}

impl std::fmt::Display for SecretClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CredentialAssignment => "credential assignment",
            Self::BearerToken => "bearer token",
            Self::AwsAccessKey => "AWS access key",
            Self::GithubToken => "GitHub token",
            Self::SlackToken => "Slack token",
            Self::HexBlob => "long hex string",
            Self::PrivateKey => "private key block",
        };
        f.write_str(name)
    }
}

fn compiled() -> &'static [(SecretClass, Regex)] {
    static PATTERNS: OnceLock<Vec<(SecretClass, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SecretClass::ALL
            .iter()
            .map(|class| {
                let re = Regex::new(class.pattern()).expect("secret pattern is a valid regex");
                (*class, re)
            })
            .collect()
    })
}

/// Replace every secret-shaped substring with its class placeholder.
pub fn redact(text: &str) -> String {
    let mut current: Cow<'_, str> = Cow::Borrowed(text);
    for (class, re) in compiled() {
        if let Cow::Owned(next) = re.replace_all(&current, class.replacement()) {
            current = Cow::Owned(next);
        }
    }
    current.into_owned()
}

/// Classes that fired while redacting `text`, in application order.
pub fn detect(text: &str) -> Vec<SecretClass> {
    let mut found = Vec::new();
    let mut current = text.to_string();
    for (class, re) in compiled() {
        let next = re.replace_all(&current, class.replacement()).into_owned();
        if next != current {
            found.push(*class);
            current = next;
        }
    }
    found
}

/// True when redaction would change `text`.
pub fn contains_secrets(text: &str) -> bool {
    redact(text) != text
}
