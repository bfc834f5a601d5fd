//! Pure statistics over the full record set.
//!
//! Everything here recomputes from an in-memory slice on every call; there
//! is no store access and no async. The batting-style aggregates, the
//! same-day leaderboard, and the member tiers all derive from the same
//! records the recorder lists.

use std::fmt;

use chrono::Local;

use crate::domain::{EvalRecord, Outcome, User};

/// Aggregate batting-style metrics over every record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatLine {
    pub total: usize,
    /// Hits and home runs combined.
    pub hits: usize,
    pub home_runs: usize,
    pub outs: usize,
    pub batting_average: f64,
    pub home_run_rate: f64,
}

/// `None` when there are no records; the ratios are undefined then and the
/// caller reports an empty state instead of a table.
pub fn stat_line(records: &[EvalRecord]) -> Option<StatLine> {
    let total = records.len();
    if total == 0 {
        return None;
    }
    let hits = records.iter().filter(|r| r.result.is_hit()).count();
    let home_runs = records
        .iter()
        .filter(|r| r.result == Outcome::HomeRun)
        .count();
    Some(StatLine {
        total,
        hits,
        home_runs,
        outs: total - hits,
        batting_average: round3(hits as f64 / total as f64),
        home_run_rate: round3(home_runs as f64 / total as f64),
    })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// =============================================================================
// DAILY LEADERBOARD
// =============================================================================

/// Positional decoration on the daily leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Gold,
    Silver,
    Bronze,
    Qualifier,
}

/// Medals for the top three, a qualifier marker for the next ten, nothing
/// below that.
pub fn badge_for(rank: usize) -> Option<Badge> {
    match rank {
        0 => Some(Badge::Gold),
        1 => Some(Badge::Silver),
        2 => Some(Badge::Bronze),
        3..=12 => Some(Badge::Qualifier),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
    pub evaluator: String,
    pub count: usize,
    pub badge: Option<Badge>,
}

/// Groups the given day's records by evaluator and ranks them by count,
/// descending. The sort is stable on count alone, so evaluators tied on
/// count keep their first-appearance order. An empty result means no
/// activity that day.
pub fn daily_rank(records: &[EvalRecord], date: &str) -> Vec<RankRow> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records.iter().filter(|r| r.is_on(date)) {
        match counts.iter_mut().find(|(name, _)| *name == record.evaluator) {
            Some((_, n)) => *n += 1,
            None => counts.push((record.evaluator.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .enumerate()
        .map(|(rank, (evaluator, count))| RankRow {
            evaluator,
            count,
            badge: badge_for(rank),
        })
        .collect()
}

/// The current local date as the `YYYY-MM-DD` prefix used for the
/// leaderboard's timestamp match.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

// =============================================================================
// MEMBER TIERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberTier {
    Novice,
    Apprentice,
    Devoted,
    Official,
    Master,
}

impl fmt::Display for MemberTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MemberTier::Novice => "novice",
            MemberTier::Apprentice => "apprentice judge",
            MemberTier::Devoted => "devoted judge",
            MemberTier::Official => "official judge",
            MemberTier::Master => "master",
        };
        f.write_str(label)
    }
}

/// Tier bounds, ascending; the first bound strictly above the count wins,
/// and counts at or past the last bound are [`MemberTier::Master`]. Kept as
/// a table so the thresholds stay independently testable and tunable.
pub const TIER_TABLE: [(usize, MemberTier); 4] = [
    (5, MemberTier::Novice),
    (10, MemberTier::Apprentice),
    (20, MemberTier::Devoted),
    (40, MemberTier::Official),
];

pub fn member_tier(count: usize) -> MemberTier {
    TIER_TABLE
        .iter()
        .find(|(bound, _)| count < *bound)
        .map(|(_, tier)| *tier)
        .unwrap_or(MemberTier::Master)
}

/// Records are matched to members by display name, not id; the record shape
/// stores only the evaluator's name.
pub fn evaluation_count(records: &[EvalRecord], name: &str) -> usize {
    records.iter().filter(|r| r.evaluator == name).count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberLevel {
    pub name: String,
    pub tier: MemberTier,
    pub count: usize,
}

/// One line per active member, including members with no records yet.
pub fn member_levels(users: &[User], records: &[EvalRecord]) -> Vec<MemberLevel> {
    users
        .iter()
        .map(|user| {
            let count = evaluation_count(records, &user.name);
            MemberLevel {
                name: user.name.clone(),
                tier: member_tier(count),
                count,
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
