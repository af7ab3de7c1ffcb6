//! Run summary.
//!
//! The engine always produces a [`RunSummary`], whether the like phase ran to
//! exhaustion or the run was aborted. It serializes to JSON and renders as a
//! plain-text report.

use crate::gateway::{PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Loading and validating configuration
    Setup,
    /// Signing up the population
    Bootstrap,
    /// Publishing posts
    Seeding,
    /// Like assignment
    Liking,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => f.write_str("setup"),
            Phase::Bootstrap => f.write_str("bootstrap"),
            Phase::Seeding => f.write_str("seeding"),
            Phase::Liking => f.write_str("liking"),
        }
    }
}

/// Why the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The like phase ran until no further like was possible
    Exhausted,
    /// A fatal error stopped the run
    Aborted { phase: Phase, cause: String },
}

/// A non-fatal error that was recorded and skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub phase: Phase,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReport {
    pub id: PostId,
    pub content: String,
    pub likes_received: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub id: UserId,
    pub display_name: String,
    pub likes_given: usize,
    pub posts: Vec<PostReport>,
}

/// Final summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users_created: usize,
    pub posts_created: usize,
    pub likes_given: usize,
    /// Like rounds executed (0 if the like phase never started)
    pub rounds: usize,
    pub outcome: RunOutcome,
    pub failures: Vec<FailureRecord>,
    pub users: Vec<UserReport>,
}

impl RunSummary {
    /// Whether the run reached exhaustion
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Exhausted)
    }
}

/// Human-readable report
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------")?;
        writeln!(f, "Total results:")?;
        match &self.outcome {
            RunOutcome::Exhausted => writeln!(f, "Run completed: no more likes possible")?,
            RunOutcome::Aborted { phase, cause } => {
                writeln!(f, "Run aborted during {}: {}", phase, cause)?
            }
        }
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Users created: {}", self.users_created)?;
        writeln!(f, "Posts created: {}", self.posts_created)?;
        writeln!(f, "Likes given: {}", self.likes_given)?;
        writeln!(f, "Like rounds: {}", self.rounds)?;

        if !self.failures.is_empty() {
            writeln!(f, "Recorded failures: {}", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  [{}] {}", failure.phase, failure.message)?;
            }
        }

        writeln!(f, "Details:")?;
        for user in &self.users {
            writeln!(f, "Username: {}", user.display_name)?;
            writeln!(f, "Likes given: {}", user.likes_given)?;
            let posts: Vec<String> = user
                .posts
                .iter()
                .map(|p| format!("({}, {})", p.id, p.likes_received))
                .collect();
            writeln!(
                f,
                "Own posts (post_id, number of likes): [{}]",
                posts.join(", ")
            )?;
            writeln!(f)?;
        }
        Ok(())
    }
}
