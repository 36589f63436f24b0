//! Three-way tone labels derived from a compound sentiment score.

use serde::{Deserialize, Serialize};

/// Compound scores strictly below this are [`Tone::Strict`].
pub const STRICT_BELOW: f64 = -0.2;
/// Compound scores strictly above this are [`Tone::Permissive`].
pub const PERMISSIVE_ABOVE: f64 = 0.2;

/// Anything that maps text to a compound sentiment score in `[-1, 1]`.
///
/// Implementations are built once at startup and shared read-only.
pub trait SentimentScorer: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

/// Tone of a regulation excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tone {
    /// Restrictive language: prohibitions, penalties, obligations.
    Strict,
    Neutral,
    /// Enabling language: permissions, exemptions, allowances.
    Permissive,
}

impl Tone {
    /// Classify a compound score. Both thresholds are exclusive, so exactly
    /// `-0.2` and `0.2` are neutral.
    pub fn from_compound(score: f64) -> Self {
        if score < STRICT_BELOW {
            Self::Strict
        } else if score > PERMISSIVE_ABOVE {
            Self::Permissive
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "STRICT",
            Self::Neutral => "NEUTRAL",
            Self::Permissive => "PERMISSIVE",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running count of results per tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneCounts {
    pub strict: usize,
    pub neutral: usize,
    pub permissive: usize,
}

impl ToneCounts {
    pub fn record(&mut self, tone: Tone) {
        match tone {
            Tone::Strict => self.strict += 1,
            Tone::Neutral => self.neutral += 1,
            Tone::Permissive => self.permissive += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.strict + self.neutral + self.permissive
    }
}
