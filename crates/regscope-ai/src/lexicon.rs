//! Rule-based lexicon sentiment scorer.
//!
//! Reads a VADER-layout lexicon (`token<TAB>valence[<TAB>...]`, one entry per
//! line) and scores text with the usual heuristics:
//!
//! - negation within the three preceding tokens flips and damps a valence
//! - booster words ("strictly", "slightly") push a valence away from or
//!   towards zero, decaying with distance
//! - after a contrastive "but" the clause weighs 1.5×, before it 0.5×
//! - exclamation marks add emphasis in the direction of the total
//!
//! The raw sum is squashed into `[-1, 1]` with `x / sqrt(x² + 15)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::tone::SentimentScorer;

const NORMALIZE_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const BOOST_INCREMENT: f64 = 0.293;
const BUT_BEFORE: f64 = 0.5;
const BUT_AFTER: f64 = 1.5;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
/// Booster weight by distance (1, 2, 3 tokens back).
const BOOST_DECAY: [f64; 3] = [1.0, 0.95, 0.9];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nor", "neither", "nobody", "nothing", "nowhere", "without",
    "cannot", "aint",
];

const BOOST_UP: &[&str] = &[
    "absolutely",
    "completely",
    "entirely",
    "especially",
    "extremely",
    "fully",
    "greatly",
    "highly",
    "particularly",
    "strictly",
    "totally",
    "very",
];

const BOOST_DOWN: &[&str] = &[
    "barely",
    "hardly",
    "marginally",
    "partly",
    "slightly",
    "somewhat",
];

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("cannot read lexicon {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("lexicon line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("lexicon has no entries")]
    Empty,
}

/// Sentiment scorer backed by a token → valence table.
///
/// Construct once with [`load`](Self::load) at startup; scoring is read-only.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    valences: HashMap<String, f64>,
}

impl LexiconScorer {
    /// Load a lexicon file.
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let text = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scorer = Self::parse(&text)?;
        info!(entries = scorer.len(), path = %path.display(), "loaded tone lexicon");
        Ok(scorer)
    }

    /// Parse lexicon text. Blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Result<Self, LexiconError> {
        let mut valences = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let token = fields.next().unwrap_or_default().trim();
            let raw = fields.next().ok_or_else(|| LexiconError::Parse {
                line: idx + 1,
                reason: "expected token<TAB>valence".into(),
            })?;
            let valence: f64 = raw.trim().parse().map_err(|_| LexiconError::Parse {
                line: idx + 1,
                reason: format!("invalid valence {raw:?}"),
            })?;
            if token.is_empty() {
                return Err(LexiconError::Parse {
                    line: idx + 1,
                    reason: "empty token".into(),
                });
            }
            valences.insert(token.to_lowercase(), valence);
        }
        if valences.is_empty() {
            return Err(LexiconError::Empty);
        }
        Ok(Self { valences })
    }

    /// Build from in-memory entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let valences = entries
            .into_iter()
            .map(|(token, v)| (token.into().to_lowercase(), v))
            .collect();
        Self { valences }
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }

    /// Valence of one token after booster and negation rules.
    fn token_valence(&self, tokens: &[String], i: usize) -> f64 {
        let token = tokens[i].as_str();
        if is_booster(token) {
            return 0.0;
        }
        let Some(&base) = self.valences.get(token) else {
            return 0.0;
        };

        let mut valence = base;
        for (back, decay) in BOOST_DECAY.iter().enumerate() {
            let Some(j) = i.checked_sub(back + 1) else {
                break;
            };
            let boost = booster_scalar(&tokens[j], valence) * decay;
            valence += boost;
        }
        let negated = (1..=3)
            .filter_map(|back| i.checked_sub(back))
            .any(|j| is_negator(&tokens[j]));
        if negated {
            valence *= NEGATION_SCALAR;
        }
        valence
    }
}

impl SentimentScorer for LexiconScorer {
    fn compound(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let mut valences: Vec<f64> = (0..tokens.len())
            .map(|i| self.token_valence(&tokens, i))
            .collect();

        if let Some(but) = tokens.iter().position(|t| t == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < but {
                    *v *= BUT_BEFORE;
                } else if i > but {
                    *v *= BUT_AFTER;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            sum += bangs * EXCLAMATION_INCREMENT * sum.signum();
        }
        normalize(sum)
    }
}

/// Lowercased words with surrounding punctuation stripped.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .trim_matches('\'')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't")
}

fn is_booster(token: &str) -> bool {
    BOOST_UP.contains(&token) || BOOST_DOWN.contains(&token)
}

/// Booster contribution of `token`, signed to push `valence` away from zero
/// (or towards it for dampeners).
fn booster_scalar(token: &str, valence: f64) -> f64 {
    let magnitude = if BOOST_UP.contains(&token) {
        BOOST_INCREMENT
    } else if BOOST_DOWN.contains(&token) {
        -BOOST_INCREMENT
    } else {
        return 0.0;
    };
    if valence < 0.0 { -magnitude } else { magnitude }
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}
