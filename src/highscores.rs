//! Local high score table
//!
//! Persisted to LocalStorage under a single key, tracks the top 10 scores.

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Longest name kept, in characters
pub const MAX_NAME_LEN: usize = 16;

/// Name used when the player leaves it blank
pub const DEFAULT_NAME: &str = "Stranger";

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    /// Player's score
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Unix timestamp (ms) when achieved
    pub date: f64,
}

/// One formatted row for the high score screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighScoreRow {
    /// 1-indexed
    pub rank: usize,
    pub name: String,
    pub score: u64,
    pub level: u32,
    pub date: String,
}

/// Trim, cap the length, and fill in a blank name
pub fn sanitize_name(name: &str) -> String {
    let name: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}

/// High score table, best first
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "knockoff_arcade_highscores";

    /// Create empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the table
    pub fn is_high_score(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.is_high_score(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the table (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_high_score(&mut self, name: &str, score: u64, level: u32, date: f64) -> Option<usize> {
        if !self.is_high_score(score) {
            return None;
        }

        let entry = HighScoreEntry {
            name: sanitize_name(name),
            score,
            level,
            date,
        };

        // Find insertion point (sorted descending by score, ties keep the older entry first)
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        // Trim to max size
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Rows ready for display
    pub fn displayable_list(&self) -> Vec<HighScoreRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| HighScoreRow {
                rank: i + 1,
                name: e.name.clone(),
                score: e.score,
                level: e.level,
                date: format_date(e.date),
            })
            .collect()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load high scores from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(scores) = serde_json::from_str::<HighScores>(&json) {
                    log::info!("Loaded {} high scores", scores.entries.len());
                    return scores;
                }
            }
        }

        log::info!("No high scores found, starting fresh");
        Self::new()
    }

    /// Save high scores to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("High scores saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs: the table lives in memory only
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Format a timestamp as a short month/day/year date
#[cfg(target_arch = "wasm32")]
pub fn format_date(timestamp: f64) -> String {
    let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(timestamp));
    format!(
        "{}/{}/{}",
        date.get_month() + 1,
        date.get_date(),
        date.get_full_year() % 100
    )
}

#[cfg(not(target_arch = "wasm32"))]
pub fn format_date(_timestamp: f64) -> String {
    "N/A".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_descending() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_high_score("A", 500, 2, 0.0), Some(1));
        assert_eq!(scores.add_high_score("B", 900, 3, 0.0), Some(1));
        assert_eq!(scores.add_high_score("C", 700, 2, 0.0), Some(2));
        assert_eq!(scores.top_score(), Some(900));

        let names: Vec<&str> = scores.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_zero_never_qualifies() {
        let mut scores = HighScores::new();
        assert!(!scores.is_high_score(0));
        assert_eq!(scores.add_high_score("A", 0, 1, 0.0), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_table_is_capped() {
        let mut scores = HighScores::new();
        for i in 1..=MAX_HIGH_SCORES as u64 {
            scores.add_high_score("P", i * 100, 1, 0.0);
        }
        assert!(!scores.is_high_score(100));
        assert!(scores.is_high_score(150));
        assert_eq!(scores.potential_rank(2000), Some(1));

        assert_eq!(scores.add_high_score("New", 150, 1, 0.0), Some(10));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().map(|e| e.score), Some(150));
    }

    #[test]
    fn test_names_are_sanitized() {
        assert_eq!(sanitize_name("   "), DEFAULT_NAME);
        assert_eq!(sanitize_name("  Doc Holliday  "), "Doc Holliday");
        assert_eq!(sanitize_name("Wyatt Earp The Lawman").chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_displayable_list() {
        let mut scores = HighScores::new();
        scores.add_high_score("Calamity", 1200, 4, 0.0);
        scores.add_high_score("Billy", 800, 2, 0.0);
        let rows = scores.displayable_list();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].name, "Calamity");
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].level, 2);
    }

    #[test]
    fn test_json_round_trip() {
        let mut scores = HighScores::new();
        scores.add_high_score("Annie", 4200, 5, 1_700_000_000_000.0);
        let json = serde_json::to_string(&scores).unwrap();
        let back: HighScores = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries, scores.entries);
    }
}
