//! Online leaderboard client types
//!
//! The leaderboard service itself lives outside this crate. The game only
//! submits a final score at game over and shows the rank it gets back; any
//! failure leaves the score recorded locally and the game carries on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::highscores::sanitize_name;

/// Highest score the service accepts
pub const MAX_SUBMITTED_SCORE: u64 = 10_000_000;
/// Submissions allowed per player inside the rate window
pub const RATE_LIMIT_COUNT: usize = 5;
/// Rate window (ms)
pub const RATE_LIMIT_WINDOW_MS: f64 = 5.0 * 60.0 * 1000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeaderboardError {
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("too many submissions, try again later")]
    RateLimited,

    /// Network failure or an unreadable response
    #[error("leaderboard unreachable: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;

/// One row of `GET /api/v1/leaderboard?limit=N`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: u64,
    pub level: u32,
    pub created_at: String,
    pub rank: u32,
}

/// Body of `POST /api/v1/leaderboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub player_name: String,
    pub score: u64,
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_data: Option<serde_json::Value>,
}

impl ScoreSubmission {
    pub fn new(player_name: &str, score: u64, level: u32) -> Self {
        Self {
            player_name: sanitize_name(player_name),
            score,
            level,
            game_data: None,
        }
    }

    /// Reject what the service would reject, before it goes over the wire
    pub fn validate(&self) -> Result<()> {
        if self.score > MAX_SUBMITTED_SCORE {
            return Err(LeaderboardError::Validation(format!(
                "score {} exceeds {MAX_SUBMITTED_SCORE}",
                self.score
            )));
        }
        if self.level == 0 {
            return Err(LeaderboardError::Validation("level must be at least 1".into()));
        }
        Ok(())
    }
}

/// Successful submission response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub score_id: u64,
    pub rank: u32,
    pub is_new_record: bool,
}

/// Error body: `{"success": false, "error": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Interpret a submission response by HTTP status and body
pub fn parse_submission_response(status: u16, body: &str) -> Result<SubmissionReceipt> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map_err(|e| LeaderboardError::Transport(format!("bad response: {e}")));
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .filter(|b| !b.success)
        .map(|b| b.error)
        .unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        429 => Err(LeaderboardError::RateLimited),
        400..=499 => Err(LeaderboardError::Validation(message)),
        _ => Err(LeaderboardError::Transport(message)),
    }
}

/// Submit / fetch-top-N view of the leaderboard service
pub trait Leaderboard {
    fn submit(&mut self, submission: &ScoreSubmission, now: f64) -> Result<SubmissionReceipt>;

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
}

/// What the game-over screen shows about the online board
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Ranked { rank: u32, is_new_record: bool },
    /// Recorded in the local table only
    LocalOnly { reason: String },
}

/// Submit at game over; never fails
pub fn submit_final_score<L: Leaderboard + ?Sized>(
    board: &mut L,
    name: &str,
    score: u64,
    level: u32,
    now: f64,
) -> SubmissionOutcome {
    let submission = ScoreSubmission::new(name, score, level);
    let result = submission
        .validate()
        .and_then(|()| board.submit(&submission, now));

    match result {
        Ok(receipt) => {
            log::info!(
                "Leaderboard rank #{} for {}{}",
                receipt.rank,
                submission.player_name,
                if receipt.is_new_record { " (new record)" } else { "" }
            );
            SubmissionOutcome::Ranked {
                rank: receipt.rank,
                is_new_record: receipt.is_new_record,
            }
        }
        Err(e) => {
            log::warn!("Score kept locally: {e}");
            SubmissionOutcome::LocalOnly {
                reason: e.to_string(),
            }
        }
    }
}

/// In-process leaderboard with the service's validation and rate limiting.
/// Used by the native build and tests.
#[derive(Debug, Default)]
pub struct MemoryLeaderboard {
    entries: Vec<LeaderboardEntry>,
    /// Submission instants per player (ms)
    recent: HashMap<String, Vec<f64>>,
    next_id: u64,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Leaderboard for MemoryLeaderboard {
    fn submit(&mut self, submission: &ScoreSubmission, now: f64) -> Result<SubmissionReceipt> {
        submission.validate()?;

        let recent = self.recent.entry(submission.player_name.clone()).or_default();
        recent.retain(|&t| now - t < RATE_LIMIT_WINDOW_MS);
        if recent.len() >= RATE_LIMIT_COUNT {
            return Err(LeaderboardError::RateLimited);
        }
        recent.push(now);

        let is_new_record = self
            .entries
            .first()
            .is_none_or(|best| submission.score > best.score);
        let pos = self
            .entries
            .iter()
            .position(|e| submission.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            LeaderboardEntry {
                player_name: submission.player_name.clone(),
                score: submission.score,
                level: submission.level,
                created_at: format!("{now:.0}"),
                rank: 0,
            },
        );
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }

        self.next_id += 1;
        Ok(SubmissionReceipt {
            score_id: self.next_id,
            rank: pos as u32 + 1,
            is_new_record,
        })
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        Ok(self.entries.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(ScoreSubmission::new("A", 0, 1).validate().is_ok());
        assert!(ScoreSubmission::new("A", MAX_SUBMITTED_SCORE, 1).validate().is_ok());
        assert!(matches!(
            ScoreSubmission::new("A", MAX_SUBMITTED_SCORE + 1, 1).validate(),
            Err(LeaderboardError::Validation(_))
        ));
    }

    #[test]
    fn test_submission_wire_format() {
        let json = serde_json::to_value(ScoreSubmission::new("Doc", 1500, 3)).unwrap();
        assert_eq!(json["playerName"], "Doc");
        assert_eq!(json["score"], 1500);
        assert!(json.get("gameData").is_none());
    }

    #[test]
    fn test_parse_responses() {
        let ok = parse_submission_response(201, r#"{"scoreId":7,"rank":2,"isNewRecord":false}"#);
        assert_eq!(
            ok,
            Ok(SubmissionReceipt {
                score_id: 7,
                rank: 2,
                is_new_record: false
            })
        );

        let limited = parse_submission_response(429, r#"{"success":false,"error":"slow down"}"#);
        assert_eq!(limited, Err(LeaderboardError::RateLimited));

        let invalid = parse_submission_response(400, r#"{"success":false,"error":"bad score"}"#);
        assert_eq!(invalid, Err(LeaderboardError::Validation("bad score".into())));

        let down = parse_submission_response(502, "<html>");
        assert_eq!(down, Err(LeaderboardError::Transport("HTTP 502".into())));
    }

    #[test]
    fn test_ranking_and_records() {
        let mut board = MemoryLeaderboard::new();
        let first = board.submit(&ScoreSubmission::new("A", 500, 2), 0.0).unwrap();
        assert_eq!(first.rank, 1);
        assert!(first.is_new_record);

        let second = board.submit(&ScoreSubmission::new("B", 300, 1), 0.0).unwrap();
        assert_eq!(second.rank, 2);
        assert!(!second.is_new_record);

        let top = board.top(10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].player_name, "A");
        assert_eq!(top[1].rank, 2);
    }

    #[test]
    fn test_rate_limit_window() {
        let mut board = MemoryLeaderboard::new();
        let submission = ScoreSubmission::new("Spammer", 10, 1);
        for i in 0..RATE_LIMIT_COUNT {
            assert!(board.submit(&submission, i as f64 * 1000.0).is_ok());
        }
        assert_eq!(
            board.submit(&submission, 10_000.0),
            Err(LeaderboardError::RateLimited)
        );
        // Window has slid past the first submission
        assert!(board.submit(&submission, RATE_LIMIT_WINDOW_MS + 500.0).is_ok());
    }

    #[test]
    fn test_failure_falls_back_to_local() {
        let mut board = MemoryLeaderboard::new();
        let outcome = submit_final_score(&mut board, "Cheater", MAX_SUBMITTED_SCORE + 1, 3, 0.0);
        assert!(matches!(outcome, SubmissionOutcome::LocalOnly { .. }));
        assert!(board.is_empty());

        let outcome = submit_final_score(&mut board, "Annie", 2500, 3, 0.0);
        assert_eq!(
            outcome,
            SubmissionOutcome::Ranked {
                rank: 1,
                is_new_record: true
            }
        );
    }
}
