//! Persistence ports for the five entity tables.
//!
//! Core services only ever see `Arc<dyn Storage>`; whether the rows live in
//! Postgres or in a mutex-guarded map is an implementation detail. Every
//! multi-entity mutation (vote casting, warning escalation, the delete
//! cascade) is a single trait method so each backend can make it atomic.

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::{DbPool, PgStorage};

use async_trait::async_trait;
use civic_shared::errors::AppResult;

use crate::models::{
    Comment, Location, NewComment, NewReport, NewSuggestion, NewUser, Report, Suggestion,
    SuggestionStatus, User, Vote,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i32) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn update_user_location(&self, user_id: i32, location: Location) -> AppResult<User>;

    /// Atomically add `increment` to the user's warning count and flip
    /// `is_banned` once the new count reaches `ban_threshold`. The ban flag
    /// never goes back to false here.
    async fn escalate_warnings(
        &self,
        user_id: i32,
        increment: i32,
        ban_threshold: i32,
    ) -> AppResult<User>;
}

#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn get_suggestion(&self, id: i32) -> AppResult<Option<Suggestion>>;
    async fn list_suggestions(&self) -> AppResult<Vec<Suggestion>>;
    async fn suggestions_by_user(&self, user_id: i32) -> AppResult<Vec<Suggestion>>;
    async fn create_suggestion(&self, suggestion: NewSuggestion) -> AppResult<Suggestion>;

    /// Unrestricted status assignment. A REJECTED target keeps the supplied
    /// reason; every other target clears it.
    async fn update_status(
        &self,
        id: i32,
        status: SuggestionStatus,
        rejection_reason: Option<String>,
    ) -> AppResult<Suggestion>;

    /// Remove the suggestion together with its comments, votes and the
    /// reports referencing either - all or nothing.
    async fn delete_suggestion_cascade(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn get_comment(&self, id: i32) -> AppResult<Option<Comment>>;
    async fn comments_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn get_vote(&self, user_id: i32, suggestion_id: i32) -> AppResult<Option<Vote>>;
    async fn votes_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Vote>>;

    /// Upsert the caller's vote and keep the denormalized counters in sync,
    /// in one atomic unit: a fresh vote bumps one counter, a repeated vote in
    /// the same direction is a no-op, a direction flip moves one count from
    /// the old bucket to the new one. Returns the vote plus the refreshed
    /// suggestion row.
    async fn cast_vote(
        &self,
        user_id: i32,
        suggestion_id: i32,
        is_upvote: bool,
    ) -> AppResult<(Vote, Suggestion)>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(&self, id: i32) -> AppResult<Option<Report>>;
    async fn reports_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Report>>;
    async fn reports_by_comment(&self, comment_id: i32) -> AppResult<Vec<Report>>;
    async fn create_report(&self, report: NewReport) -> AppResult<Report>;
    async fn resolve_report(&self, id: i32) -> AppResult<Report>;

    /// Unresolved reports, newest first, with the total unresolved count.
    async fn list_open_reports(&self, offset: i64, limit: i64) -> AppResult<(Vec<Report>, i64)>;
}

#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Drop every row in every table. Callers are responsible for keeping
    /// user traffic out while this runs.
    async fn reset(&self) -> AppResult<()>;
}

pub trait Storage:
    UserStore + SuggestionStore + CommentStore + VoteStore + ReportStore + MaintenanceStore
{
}

impl<T> Storage for T where
    T: UserStore + SuggestionStore + CommentStore + VoteStore + ReportStore + MaintenanceStore
{
}
