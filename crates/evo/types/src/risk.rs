//! Risk classification for proposals and the auto-approve threshold.
//!
//! A proposal always carries one of three [`RiskLevel`]s. The operator-only
//! sentinel `none` exists only on [`RiskThreshold`], where it means
//! "never auto-approve anything".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

// ── Risk Level ──────────────────────────────────────────────────────────

/// Declared risk of a proposal. Ordered `Low < Medium < High`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Numeric rank: low(0) < medium(1) < high(2).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TypesError::UnknownRisk(s.to_string())),
        }
    }
}

// ── Risk Threshold ──────────────────────────────────────────────────────

/// Highest risk level the autopilot may apply without a human.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskThreshold {
    /// Nothing is auto-approved, not even `low`.
    None,
    #[default]
    Low,
    Medium,
    High,
}

impl RiskThreshold {
    /// The highest level this threshold admits, if any.
    pub fn ceiling(&self) -> Option<RiskLevel> {
        match self {
            Self::None => None,
            Self::Low => Some(RiskLevel::Low),
            Self::Medium => Some(RiskLevel::Medium),
            Self::High => Some(RiskLevel::High),
        }
    }

    /// Whether a proposal at `level` may be auto-approved.
    pub fn permits(&self, level: RiskLevel) -> bool {
        self.ceiling().is_some_and(|ceiling| level <= ceiling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskThreshold {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TypesError::UnknownThreshold(s.to_string())),
        }
    }
}

/// Return true if `level` is at or below the auto-approve `threshold`.
pub fn risk_allowed(level: RiskLevel, threshold: RiskThreshold) -> bool {
    threshold.permits(level)
}
