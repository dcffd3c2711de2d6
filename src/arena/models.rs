use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AppError;

pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub photo: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub occasion: String,
    pub source_mode: String,
    pub user_id: String,
    pub created_at: String,
    #[serde(default)]
    pub total_votes: i64,
    #[serde(default)]
    pub total_rating: i64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub average_rating: f64,
}

impl Submission {
    pub fn recompute_average(&mut self) {
        self.average_rating = if self.vote_count > 0 {
            round2(self.total_rating as f64 / self.vote_count as f64)
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "upvote" => Ok(VoteType::Upvote),
            "downvote" => Ok(VoteType::Downvote),
            _ => Err(AppError::Validation(
                "Invalid vote_type. Must be 'upvote' or 'downvote'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub submission_id: String,
    pub voter_id: String,
    pub vote_type: VoteType,
    pub rating: i64,
    pub voted_at: String,
}

pub fn vote_key(submission_id: &str, voter_id: &str) -> String {
    format!("{}_{}", submission_id, voter_id)
}

/// Whole on-disk document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaDb {
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub votes: BTreeMap<String, Vote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Recent,
    TopVoted,
    TopRated,
}

impl SortBy {
    /// Unknown values sort by recency.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("top_voted") => SortBy::TopVoted,
            Some("top_rated") => SortBy::TopRated,
            _ => SortBy::Recent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub photo: String,
    pub title: String,
    pub description: String,
    pub occasion: String,
    pub source_mode: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaStats {
    pub total_submissions: usize,
    pub total_votes: usize,
    pub avg_rating_overall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub original_count: usize,
    pub removed_count: usize,
    pub remaining_count: usize,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_param_defaults_to_recent() {
        assert_eq!(SortBy::from_param(None), SortBy::Recent);
        assert_eq!(SortBy::from_param(Some("oldest")), SortBy::Recent);
        assert_eq!(SortBy::from_param(Some("top_rated")), SortBy::TopRated);
        assert_eq!(SortBy::from_param(Some("top_voted")), SortBy::TopVoted);
    }

    #[test]
    fn vote_type_rejects_unknown() {
        assert_eq!(VoteType::parse("downvote").unwrap(), VoteType::Downvote);
        assert!(matches!(
            VoteType::parse("sideways"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn votes_default_when_missing_from_document() {
        let db: ArenaDb = serde_json::from_str(r#"{"submissions": []}"#).unwrap();
        assert!(db.votes.is_empty());
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(20.0 / 3.0), 6.67);
        assert_eq!(round2(8.0), 8.0);
    }
}
