use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Outcome of a single evaluation. Closed set; the serialized names are the
/// wire values stored in the records collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Hit,
    HomeRun,
    Out,
}

impl Outcome {
    /// Hits and home runs both count toward the batting average.
    pub fn is_hit(self) -> bool {
        matches!(self, Outcome::Hit | Outcome::HomeRun)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Hit => "hit",
            Outcome::HomeRun => "home run",
            Outcome::Out => "out",
        };
        f.write_str(label)
    }
}

/// One evaluator's rating submission.
///
/// Records are append-only: never edited or individually deleted, only
/// wiped wholesale by the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Display name of the submitting user, not their id.
    pub evaluator: String,
    pub result: Outcome,
    pub memo: Option<String>,
    /// `YYYY-MM-DD HH:MM`, local wall-clock time, minute precision.
    pub timestamp: String,
}

impl EvalRecord {
    /// Whether the record was submitted on the given `YYYY-MM-DD` date.
    pub fn is_on(&self, date: &str) -> bool {
        self.timestamp.starts_with(date)
    }
}

impl Document for EvalRecord {
    const COLLECTION: &'static str = "records";
}
