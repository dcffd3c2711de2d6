mod models;
mod storage;

pub use models::*;
pub use storage::*;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::AppError;

const LOCAL_FILE_SCHEME: &str = "file://";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn not_found() -> AppError {
    AppError::NotFound("Submission not found".to_string())
}

/// Fashion Arena submissions and votes on top of an [`ArenaStorage`].
pub struct ArenaStore<S> {
    storage: S,
}

impl<S: ArenaStorage> ArenaStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn submit(&self, new: NewSubmission) -> Result<Submission, AppError> {
        if new.photo.trim().is_empty() {
            return Err(AppError::Validation("No photo provided".to_string()));
        }

        let mut db = self.storage.load()?;
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            photo: new.photo,
            title: new.title,
            description: new.description,
            occasion: new.occasion,
            source_mode: new.source_mode,
            user_id: new
                .user_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            created_at: now_iso(),
            total_votes: 0,
            total_rating: 0,
            vote_count: 0,
            average_rating: 0.0,
        };

        db.submissions.push(submission.clone());
        self.storage.save(&db)?;

        Ok(submission)
    }

    pub fn list(&self, sort_by: SortBy) -> Result<Vec<Submission>, AppError> {
        let mut submissions = self.storage.load()?.submissions;
        match sort_by {
            SortBy::Recent => submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::TopVoted => submissions.sort_by(|a, b| b.total_votes.cmp(&a.total_votes)),
            SortBy::TopRated => {
                submissions.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating))
            }
        }
        Ok(submissions)
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<Submission>, AppError> {
        let mut submissions = self.storage.load()?.submissions;
        submissions.sort_by(|a, b| {
            b.average_rating
                .total_cmp(&a.average_rating)
                .then(b.total_votes.cmp(&a.total_votes))
        });
        submissions.truncate(limit);
        Ok(submissions)
    }

    pub fn vote(
        &self,
        submission_id: &str,
        vote_type: VoteType,
        rating: i64,
        voter_id: Option<&str>,
    ) -> Result<Submission, AppError> {
        if !(1..=10).contains(&rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 10".to_string(),
            ));
        }
        let voter_id = voter_id.filter(|id| !id.is_empty()).unwrap_or(ANONYMOUS);

        let mut db = self.storage.load()?;
        let key = vote_key(submission_id, voter_id);
        let previous = db.votes.get(&key).cloned();

        let submission = db
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(not_found)?;

        match previous {
            Some(old) => {
                match (old.vote_type, vote_type) {
                    (VoteType::Upvote, VoteType::Downvote) => submission.total_votes -= 1,
                    (VoteType::Downvote, VoteType::Upvote) => submission.total_votes += 1,
                    _ => {}
                }
                submission.total_rating = submission.total_rating - old.rating + rating;
            }
            None => {
                if vote_type == VoteType::Upvote {
                    submission.total_votes += 1;
                }
                submission.vote_count += 1;
                submission.total_rating += rating;
            }
        }
        submission.recompute_average();
        let updated = submission.clone();

        db.votes.insert(
            key,
            Vote {
                submission_id: submission_id.to_string(),
                voter_id: voter_id.to_string(),
                vote_type,
                rating,
                voted_at: now_iso(),
            },
        );
        self.storage.save(&db)?;

        Ok(updated)
    }

    pub fn like(&self, submission_id: &str) -> Result<Submission, AppError> {
        let mut db = self.storage.load()?;
        let submission = db
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(not_found)?;

        submission.total_votes += 1;
        let updated = submission.clone();

        self.storage.save(&db)?;
        Ok(updated)
    }

    pub fn get(&self, submission_id: &str) -> Result<Submission, AppError> {
        self.storage
            .load()?
            .submissions
            .into_iter()
            .find(|s| s.id == submission_id)
            .ok_or_else(not_found)
    }

    pub fn voter_vote(
        &self,
        submission_id: &str,
        voter_id: Option<&str>,
    ) -> Result<Option<Vote>, AppError> {
        let voter_id = voter_id.filter(|id| !id.is_empty()).unwrap_or(ANONYMOUS);
        let mut db = self.storage.load()?;
        Ok(db.votes.remove(&vote_key(submission_id, voter_id)))
    }

    pub fn stats(&self) -> Result<ArenaStats, AppError> {
        let db = self.storage.load()?;
        let avg_rating_overall = if db.submissions.is_empty() {
            0.0
        } else {
            let sum: f64 = db.submissions.iter().map(|s| s.average_rating).sum();
            round2(sum / db.submissions.len() as f64)
        };

        Ok(ArenaStats {
            total_submissions: db.submissions.len(),
            total_votes: db.votes.len(),
            avg_rating_overall,
        })
    }

    /// Drops submissions whose photo points at a local file, which remote
    /// clients cannot resolve.
    pub fn cleanup_invalid(&self) -> Result<CleanupReport, AppError> {
        let mut db = self.storage.load()?;
        let original_count = db.submissions.len();

        db.submissions.retain(|s| !s.photo.starts_with(LOCAL_FILE_SCHEME));
        let remaining_count = db.submissions.len();
        let removed_count = original_count - remaining_count;

        if removed_count > 0 {
            self.storage.save(&db)?;
        }

        Ok(CleanupReport {
            original_count,
            removed_count,
            remaining_count,
        })
    }

    /// Replaces the whole store. Accepts `{submissions, votes}` or a bare list
    /// of submissions.
    pub fn restore(&self, backup: serde_json::Value) -> Result<usize, AppError> {
        let invalid =
            |e: serde_json::Error| AppError::Validation(format!("Invalid backup format: {}", e));
        let db = if backup.is_array() {
            ArenaDb {
                submissions: serde_json::from_value(backup).map_err(invalid)?,
                votes: Default::default(),
            }
        } else if backup.get("submissions").is_some() {
            serde_json::from_value(backup).map_err(invalid)?
        } else {
            return Err(AppError::Validation("Invalid backup format".to_string()));
        };

        let restored = db.submissions.len();
        self.storage.save(&db)?;
        Ok(restored)
    }

    pub fn export(&self) -> Result<ArenaDb, AppError> {
        self.storage.load()
    }
}
