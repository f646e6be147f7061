//! In-memory storage used by demo mode and the test suite.
//!
//! One mutex guards the whole state, so every trait method is trivially
//! atomic - including the multi-entity ones (vote casting, escalation, the
//! delete cascade).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use civic_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Comment, Location, NewComment, NewReport, NewSuggestion, NewUser, Report, Suggestion,
    SuggestionStatus, User, Vote,
};
use crate::storage::{
    CommentStore, MaintenanceStore, ReportStore, SuggestionStore, UserStore, VoteStore,
};

struct MemState {
    users: BTreeMap<i32, User>,
    suggestions: BTreeMap<i32, Suggestion>,
    comments: BTreeMap<i32, Comment>,
    votes: BTreeMap<i32, Vote>,
    reports: BTreeMap<i32, Report>,
    next_user_id: i32,
    next_suggestion_id: i32,
    next_comment_id: i32,
    next_vote_id: i32,
    next_report_id: i32,
}

impl Default for MemState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            suggestions: BTreeMap::new(),
            comments: BTreeMap::new(),
            votes: BTreeMap::new(),
            reports: BTreeMap::new(),
            next_user_id: 1,
            next_suggestion_id: 1,
            next_comment_id: 1,
            next_vote_id: 1,
            next_report_id: 1,
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemState> {
        // A poisoned lock only means a panic elsewhere; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "user not found")
}

fn suggestion_not_found() -> AppError {
    AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found")
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut st = self.state();
        let id = st.next_user_id;
        st.next_user_id += 1;

        let user = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            warning_count: 0,
            is_banned: false,
            location: None,
            created_at: Utc::now(),
        };
        st.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user_location(&self, user_id: i32, location: Location) -> AppResult<User> {
        let mut st = self.state();
        let user = st.users.get_mut(&user_id).ok_or_else(user_not_found)?;
        user.location = Some(location);
        Ok(user.clone())
    }

    async fn escalate_warnings(
        &self,
        user_id: i32,
        increment: i32,
        ban_threshold: i32,
    ) -> AppResult<User> {
        let mut st = self.state();
        let user = st.users.get_mut(&user_id).ok_or_else(user_not_found)?;
        user.warning_count += increment;
        if user.warning_count >= ban_threshold {
            user.is_banned = true;
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl SuggestionStore for MemoryStorage {
    async fn get_suggestion(&self, id: i32) -> AppResult<Option<Suggestion>> {
        Ok(self.state().suggestions.get(&id).cloned())
    }

    async fn list_suggestions(&self) -> AppResult<Vec<Suggestion>> {
        Ok(self.state().suggestions.values().cloned().collect())
    }

    async fn suggestions_by_user(&self, user_id: i32) -> AppResult<Vec<Suggestion>> {
        Ok(self
            .state()
            .suggestions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_suggestion(&self, suggestion: NewSuggestion) -> AppResult<Suggestion> {
        let mut st = self.state();
        let id = st.next_suggestion_id;
        st.next_suggestion_id += 1;

        let suggestion = Suggestion {
            id,
            title: suggestion.title,
            description: suggestion.description,
            location: suggestion.location,
            user_id: suggestion.user_id,
            status: SuggestionStatus::Active,
            rejection_reason: None,
            upvotes: 0,
            downvotes: 0,
            photo_url: suggestion.photo_url,
            created_at: Utc::now(),
        };
        st.suggestions.insert(id, suggestion.clone());
        Ok(suggestion)
    }

    async fn update_status(
        &self,
        id: i32,
        status: SuggestionStatus,
        rejection_reason: Option<String>,
    ) -> AppResult<Suggestion> {
        let mut st = self.state();
        let suggestion = st
            .suggestions
            .get_mut(&id)
            .ok_or_else(suggestion_not_found)?;
        suggestion.status = status;
        suggestion.rejection_reason = if status == SuggestionStatus::Rejected {
            rejection_reason
        } else {
            None
        };
        Ok(suggestion.clone())
    }

    async fn delete_suggestion_cascade(&self, id: i32) -> AppResult<()> {
        let mut st = self.state();
        if !st.suggestions.contains_key(&id) {
            return Err(suggestion_not_found());
        }

        let comment_ids: Vec<i32> = st
            .comments
            .values()
            .filter(|c| c.suggestion_id == id)
            .map(|c| c.id)
            .collect();

        st.reports.retain(|_, r| {
            r.suggestion_id != Some(id)
                && !r.comment_id.map_or(false, |cid| comment_ids.contains(&cid))
        });
        st.votes.retain(|_, v| v.suggestion_id != id);
        st.comments.retain(|_, c| c.suggestion_id != id);
        st.suggestions.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStorage {
    async fn get_comment(&self, id: i32) -> AppResult<Option<Comment>> {
        Ok(self.state().comments.get(&id).cloned())
    }

    async fn comments_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Comment>> {
        Ok(self
            .state()
            .comments
            .values()
            .filter(|c| c.suggestion_id == suggestion_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let mut st = self.state();
        let id = st.next_comment_id;
        st.next_comment_id += 1;

        let comment = Comment {
            id,
            content: comment.content,
            suggestion_id: comment.suggestion_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            created_at: Utc::now(),
        };
        st.comments.insert(id, comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl VoteStore for MemoryStorage {
    async fn get_vote(&self, user_id: i32, suggestion_id: i32) -> AppResult<Option<Vote>> {
        Ok(self
            .state()
            .votes
            .values()
            .find(|v| v.user_id == user_id && v.suggestion_id == suggestion_id)
            .cloned())
    }

    async fn votes_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Vote>> {
        Ok(self
            .state()
            .votes
            .values()
            .filter(|v| v.suggestion_id == suggestion_id)
            .cloned()
            .collect())
    }

    async fn cast_vote(
        &self,
        user_id: i32,
        suggestion_id: i32,
        is_upvote: bool,
    ) -> AppResult<(Vote, Suggestion)> {
        let mut st = self.state();
        if !st.suggestions.contains_key(&suggestion_id) {
            return Err(suggestion_not_found());
        }

        let existing = st
            .votes
            .values()
            .find(|v| v.user_id == user_id && v.suggestion_id == suggestion_id)
            .cloned();

        let vote = match existing {
            // Same direction twice: idempotent, counters untouched.
            Some(vote) if vote.is_upvote == is_upvote => vote,
            // Direction flip: move one count from the old bucket to the new.
            Some(mut vote) => {
                vote.is_upvote = is_upvote;
                st.votes.insert(vote.id, vote.clone());
                let suggestion = st
                    .suggestions
                    .get_mut(&suggestion_id)
                    .ok_or_else(suggestion_not_found)?;
                if is_upvote {
                    suggestion.upvotes += 1;
                    suggestion.downvotes -= 1;
                } else {
                    suggestion.upvotes -= 1;
                    suggestion.downvotes += 1;
                }
                vote
            }
            None => {
                let id = st.next_vote_id;
                st.next_vote_id += 1;
                let vote = Vote {
                    id,
                    suggestion_id,
                    user_id,
                    is_upvote,
                };
                st.votes.insert(id, vote.clone());
                let suggestion = st
                    .suggestions
                    .get_mut(&suggestion_id)
                    .ok_or_else(suggestion_not_found)?;
                if is_upvote {
                    suggestion.upvotes += 1;
                } else {
                    suggestion.downvotes += 1;
                }
                vote
            }
        };

        let suggestion = st
            .suggestions
            .get(&suggestion_id)
            .cloned()
            .ok_or_else(suggestion_not_found)?;
        Ok((vote, suggestion))
    }
}

#[async_trait]
impl ReportStore for MemoryStorage {
    async fn get_report(&self, id: i32) -> AppResult<Option<Report>> {
        Ok(self.state().reports.get(&id).cloned())
    }

    async fn reports_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Report>> {
        Ok(self
            .state()
            .reports
            .values()
            .filter(|r| r.suggestion_id == Some(suggestion_id))
            .cloned()
            .collect())
    }

    async fn reports_by_comment(&self, comment_id: i32) -> AppResult<Vec<Report>> {
        Ok(self
            .state()
            .reports
            .values()
            .filter(|r| r.comment_id == Some(comment_id))
            .cloned()
            .collect())
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        let mut st = self.state();
        let id = st.next_report_id;
        st.next_report_id += 1;

        let report = Report {
            id,
            reason: report.reason,
            description: report.description,
            user_id: report.user_id,
            suggestion_id: report.suggestion_id,
            comment_id: report.comment_id,
            photo_url: report.photo_url,
            resolved: false,
            created_at: Utc::now(),
        };
        st.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn resolve_report(&self, id: i32) -> AppResult<Report> {
        let mut st = self.state();
        let report = st
            .reports
            .get_mut(&id)
            .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))?;
        report.resolved = true;
        Ok(report.clone())
    }

    async fn list_open_reports(&self, offset: i64, limit: i64) -> AppResult<(Vec<Report>, i64)> {
        let st = self.state();
        let mut open: Vec<Report> = st.reports.values().filter(|r| !r.resolved).cloned().collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = open.len() as i64;
        let items = open
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((items, total))
    }
}

#[async_trait]
impl MaintenanceStore for MemoryStorage {
    async fn reset(&self) -> AppResult<()> {
        *self.state() = MemState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_user(storage: &MemoryStorage, username: &str) -> User {
        storage
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "x".into(),
                name: username.to_string(),
                email: format!("{username}@example.com"),
                is_admin: false,
            })
            .await
            .unwrap()
    }

    async fn seed_suggestion(storage: &MemoryStorage, user_id: i32) -> Suggestion {
        storage
            .create_suggestion(NewSuggestion {
                title: "road repair".into(),
                description: "details".into(),
                location: Location::new(12.97, 77.59),
                user_id,
                photo_url: None,
            })
            .await
            .unwrap()
    }

    fn counter_truth(votes: &[Vote]) -> (i32, i32) {
        let up = votes.iter().filter(|v| v.is_upvote).count() as i32;
        (up, votes.len() as i32 - up)
    }

    #[tokio::test]
    async fn repeated_same_direction_vote_is_idempotent() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;
        let s = seed_suggestion(&storage, user.id).await;

        let (_, after_first) = storage.cast_vote(user.id, s.id, true).await.unwrap();
        let (_, after_second) = storage.cast_vote(user.id, s.id, true).await.unwrap();
        assert_eq!(after_first.upvotes, 1);
        assert_eq!(after_second.upvotes, 1);
        assert_eq!(after_second.downvotes, 0);
        assert_eq!(storage.votes_by_suggestion(s.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn direction_flip_moves_one_count() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;
        let s = seed_suggestion(&storage, user.id).await;

        storage.cast_vote(user.id, s.id, true).await.unwrap();
        let (vote, suggestion) = storage.cast_vote(user.id, s.id, false).await.unwrap();
        assert!(!vote.is_upvote);
        assert_eq!(suggestion.upvotes, 0);
        assert_eq!(suggestion.downvotes, 1);
        assert_eq!(storage.votes_by_suggestion(s.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counters_always_match_the_vote_rows() {
        let storage = MemoryStorage::new();
        let a = seed_user(&storage, "asha").await;
        let b = seed_user(&storage, "bina").await;
        let c = seed_user(&storage, "chetan").await;
        let s = seed_suggestion(&storage, a.id).await;

        let sequence = [
            (a.id, true),
            (b.id, false),
            (c.id, true),
            (a.id, false),
            (a.id, false),
            (b.id, true),
        ];
        for (user_id, dir) in sequence {
            let (_, suggestion) = storage.cast_vote(user_id, s.id, dir).await.unwrap();
            let votes = storage.votes_by_suggestion(s.id).await.unwrap();
            let (up, down) = counter_truth(&votes);
            assert_eq!(suggestion.upvotes, up);
            assert_eq!(suggestion.downvotes, down);
        }
    }

    #[tokio::test]
    async fn vote_on_missing_suggestion_fails() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;
        let err = storage.cast_vote(user.id, 42, true).await.unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::SuggestionNotFound));
    }

    #[tokio::test]
    async fn escalation_bans_at_threshold_and_stays_banned() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;

        let user = storage.escalate_warnings(user.id, 1, 2).await.unwrap();
        assert_eq!(user.warning_count, 1);
        assert!(!user.is_banned);

        let user = storage.escalate_warnings(user.id, 1, 2).await.unwrap();
        assert_eq!(user.warning_count, 2);
        assert!(user.is_banned);

        let user = storage.escalate_warnings(user.id, 1, 2).await.unwrap();
        assert_eq!(user.warning_count, 3);
        assert!(user.is_banned);
    }

    #[tokio::test]
    async fn cascade_delete_removes_all_dependents() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        let other = seed_user(&storage, "bina").await;
        let s = seed_suggestion(&storage, author.id).await;
        let untouched = seed_suggestion(&storage, other.id).await;

        let c1 = storage
            .create_comment(NewComment {
                content: "first".into(),
                suggestion_id: s.id,
                user_id: other.id,
                parent_id: None,
            })
            .await
            .unwrap();
        storage
            .create_comment(NewComment {
                content: "reply".into(),
                suggestion_id: s.id,
                user_id: author.id,
                parent_id: Some(c1.id),
            })
            .await
            .unwrap();
        storage.cast_vote(author.id, s.id, true).await.unwrap();
        storage.cast_vote(other.id, s.id, false).await.unwrap();
        storage.cast_vote(other.id, untouched.id, true).await.unwrap();
        storage
            .create_report(NewReport {
                reason: "SPAM".into(),
                description: "on the suggestion".into(),
                user_id: other.id,
                suggestion_id: Some(s.id),
                comment_id: None,
                photo_url: None,
            })
            .await
            .unwrap();
        storage
            .create_report(NewReport {
                reason: "ABUSE".into(),
                description: "on the comment".into(),
                user_id: author.id,
                suggestion_id: None,
                comment_id: Some(c1.id),
                photo_url: None,
            })
            .await
            .unwrap();
        let unrelated = storage
            .create_report(NewReport {
                reason: "SPAM".into(),
                description: "other suggestion".into(),
                user_id: author.id,
                suggestion_id: Some(untouched.id),
                comment_id: None,
                photo_url: None,
            })
            .await
            .unwrap();

        storage.delete_suggestion_cascade(s.id).await.unwrap();

        assert!(storage.get_suggestion(s.id).await.unwrap().is_none());
        assert!(storage.comments_by_suggestion(s.id).await.unwrap().is_empty());
        assert!(storage.votes_by_suggestion(s.id).await.unwrap().is_empty());
        assert!(storage.reports_by_suggestion(s.id).await.unwrap().is_empty());
        assert!(storage.reports_by_comment(c1.id).await.unwrap().is_empty());

        // Unrelated rows survive.
        assert!(storage.get_suggestion(untouched.id).await.unwrap().is_some());
        assert_eq!(storage.votes_by_suggestion(untouched.id).await.unwrap().len(), 1);
        assert!(storage.get_report(unrelated.id).await.unwrap().is_some());

        let err = storage.delete_suggestion_cascade(s.id).await.unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::SuggestionNotFound));
    }

    #[tokio::test]
    async fn open_reports_are_paged_newest_first() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;
        let s = seed_suggestion(&storage, user.id).await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let r = storage
                .create_report(NewReport {
                    reason: "SPAM".into(),
                    description: format!("report {i}"),
                    user_id: user.id,
                    suggestion_id: Some(s.id),
                    comment_id: None,
                    photo_url: None,
                })
                .await
                .unwrap();
            ids.push(r.id);
        }
        storage.resolve_report(ids[0]).await.unwrap();

        let (items, total) = storage.list_open_reports(0, 3).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|r| !r.resolved));

        let (rest, _) = storage.list_open_reports(3, 3).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_everything_and_restarts_ids() {
        let storage = MemoryStorage::new();
        let user = seed_user(&storage, "asha").await;
        seed_suggestion(&storage, user.id).await;

        storage.reset().await.unwrap();
        assert!(storage.list_suggestions().await.unwrap().is_empty());
        assert!(storage.get_user(user.id).await.unwrap().is_none());

        let fresh = seed_user(&storage, "bina").await;
        assert_eq!(fresh.id, 1);
    }
}
