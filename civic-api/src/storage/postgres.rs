//! Diesel/Postgres storage.
//!
//! Multi-entity mutations run inside `conn.transaction`; the vote path
//! additionally row-locks the suggestion so concurrent votes on the same
//! suggestion serialize instead of racing the counters.

use async_trait::async_trait;
use civic_shared::errors::{AppError, AppResult, ErrorCode};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::models::{
    Comment, Location, NewComment, NewReport, NewSuggestion, NewUser, NewVote, Report, Suggestion,
    SuggestionStatus, User, Vote,
};
use crate::schema::{comments, reports, suggestions, users, votes};
use crate::storage::{
    CommentStore, MaintenanceStore, ReportStore, SuggestionStore, UserStore, VoteStore,
};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        self.pool
            .get()
            .map_err(|e| AppError::internal(format!("db pool error: {e}")))
    }
}

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "user not found")
}

fn suggestion_not_found() -> AppError {
    AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found")
}

/// The one place vote counters change: a signed delta pair applied in the
/// same transaction as the vote write.
fn adjust_vote_counts(
    conn: &mut PgConnection,
    suggestion_id: i32,
    up: i32,
    down: i32,
) -> QueryResult<usize> {
    diesel::update(suggestions::table.find(suggestion_id))
        .set((
            suggestions::upvotes.eq(suggestions::upvotes + up),
            suggestions::downvotes.eq(suggestions::downvotes + down),
        ))
        .execute(conn)
}

#[async_trait]
impl UserStore for PgStorage {
    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table.find(id).first(&mut conn).optional()?)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .first(&mut conn)
            .optional()?)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .first(&mut conn)
            .optional()?)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .get_result(&mut conn)?)
    }

    async fn update_user_location(&self, user_id: i32, location: Location) -> AppResult<User> {
        let mut conn = self.conn()?;
        diesel::update(users::table.find(user_id))
            .set(users::location.eq(Some(location)))
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(user_not_found)
    }

    async fn escalate_warnings(
        &self,
        user_id: i32,
        increment: i32,
        ban_threshold: i32,
    ) -> AppResult<User> {
        let mut conn = self.conn()?;
        conn.transaction::<User, AppError, _>(|conn| {
            let user: User = diesel::update(users::table.find(user_id))
                .set(users::warning_count.eq(users::warning_count + increment))
                .get_result(conn)
                .optional()?
                .ok_or_else(user_not_found)?;

            if user.warning_count >= ban_threshold && !user.is_banned {
                Ok(diesel::update(users::table.find(user_id))
                    .set(users::is_banned.eq(true))
                    .get_result(conn)?)
            } else {
                Ok(user)
            }
        })
    }
}

#[async_trait]
impl SuggestionStore for PgStorage {
    async fn get_suggestion(&self, id: i32) -> AppResult<Option<Suggestion>> {
        let mut conn = self.conn()?;
        Ok(suggestions::table.find(id).first(&mut conn).optional()?)
    }

    async fn list_suggestions(&self) -> AppResult<Vec<Suggestion>> {
        let mut conn = self.conn()?;
        Ok(suggestions::table
            .order(suggestions::created_at.desc())
            .load(&mut conn)?)
    }

    async fn suggestions_by_user(&self, user_id: i32) -> AppResult<Vec<Suggestion>> {
        let mut conn = self.conn()?;
        Ok(suggestions::table
            .filter(suggestions::user_id.eq(user_id))
            .order(suggestions::created_at.desc())
            .load(&mut conn)?)
    }

    async fn create_suggestion(&self, suggestion: NewSuggestion) -> AppResult<Suggestion> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(suggestions::table)
            .values(&suggestion)
            .get_result(&mut conn)?)
    }

    async fn update_status(
        &self,
        id: i32,
        status: SuggestionStatus,
        rejection_reason: Option<String>,
    ) -> AppResult<Suggestion> {
        let reason = if status == SuggestionStatus::Rejected {
            rejection_reason
        } else {
            None
        };
        let mut conn = self.conn()?;
        diesel::update(suggestions::table.find(id))
            .set((
                suggestions::status.eq(status),
                suggestions::rejection_reason.eq(reason),
            ))
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(suggestion_not_found)
    }

    async fn delete_suggestion_cascade(&self, id: i32) -> AppResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<(), AppError, _>(|conn| {
            let comment_ids: Vec<i32> = comments::table
                .filter(comments::suggestion_id.eq(id))
                .select(comments::id)
                .load(conn)?;

            // Children first, so referential integrity holds at every step.
            let comment_refs: Vec<Option<i32>> = comment_ids.iter().map(|c| Some(*c)).collect();
            diesel::delete(reports::table.filter(reports::comment_id.eq_any(comment_refs)))
                .execute(conn)?;
            diesel::delete(reports::table.filter(reports::suggestion_id.eq(Some(id))))
                .execute(conn)?;
            diesel::delete(votes::table.filter(votes::suggestion_id.eq(id))).execute(conn)?;
            diesel::delete(comments::table.filter(comments::suggestion_id.eq(id)))
                .execute(conn)?;

            let deleted = diesel::delete(suggestions::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(suggestion_not_found());
            }
            Ok(())
        })
    }
}

#[async_trait]
impl CommentStore for PgStorage {
    async fn get_comment(&self, id: i32) -> AppResult<Option<Comment>> {
        let mut conn = self.conn()?;
        Ok(comments::table.find(id).first(&mut conn).optional()?)
    }

    async fn comments_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Comment>> {
        let mut conn = self.conn()?;
        Ok(comments::table
            .filter(comments::suggestion_id.eq(suggestion_id))
            .order(comments::created_at.asc())
            .load(&mut conn)?)
    }

    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(comments::table)
            .values(&comment)
            .get_result(&mut conn)?)
    }
}

#[async_trait]
impl VoteStore for PgStorage {
    async fn get_vote(&self, user_id: i32, suggestion_id: i32) -> AppResult<Option<Vote>> {
        let mut conn = self.conn()?;
        Ok(votes::table
            .filter(votes::user_id.eq(user_id))
            .filter(votes::suggestion_id.eq(suggestion_id))
            .first(&mut conn)
            .optional()?)
    }

    async fn votes_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Vote>> {
        let mut conn = self.conn()?;
        Ok(votes::table
            .filter(votes::suggestion_id.eq(suggestion_id))
            .load(&mut conn)?)
    }

    async fn cast_vote(
        &self,
        user_id: i32,
        suggestion_id: i32,
        is_upvote: bool,
    ) -> AppResult<(Vote, Suggestion)> {
        let mut conn = self.conn()?;
        conn.transaction::<(Vote, Suggestion), AppError, _>(|conn| {
            // Row-lock the aggregate for the duration of the transaction.
            let _locked: Suggestion = suggestions::table
                .find(suggestion_id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(suggestion_not_found)?;

            let existing: Option<Vote> = votes::table
                .filter(votes::user_id.eq(user_id))
                .filter(votes::suggestion_id.eq(suggestion_id))
                .first(conn)
                .optional()?;

            let vote = match existing {
                Some(vote) if vote.is_upvote == is_upvote => vote,
                Some(vote) => {
                    let updated: Vote = diesel::update(votes::table.find(vote.id))
                        .set(votes::is_upvote.eq(is_upvote))
                        .get_result(conn)?;
                    let (up, down) = if is_upvote { (1, -1) } else { (-1, 1) };
                    adjust_vote_counts(conn, suggestion_id, up, down)?;
                    updated
                }
                None => {
                    let inserted: Vote = diesel::insert_into(votes::table)
                        .values(&NewVote {
                            suggestion_id,
                            user_id,
                            is_upvote,
                        })
                        .get_result(conn)?;
                    let (up, down) = if is_upvote { (1, 0) } else { (0, 1) };
                    adjust_vote_counts(conn, suggestion_id, up, down)?;
                    inserted
                }
            };

            let suggestion: Suggestion = suggestions::table.find(suggestion_id).first(conn)?;
            Ok((vote, suggestion))
        })
    }
}

#[async_trait]
impl ReportStore for PgStorage {
    async fn get_report(&self, id: i32) -> AppResult<Option<Report>> {
        let mut conn = self.conn()?;
        Ok(reports::table.find(id).first(&mut conn).optional()?)
    }

    async fn reports_by_suggestion(&self, suggestion_id: i32) -> AppResult<Vec<Report>> {
        let mut conn = self.conn()?;
        Ok(reports::table
            .filter(reports::suggestion_id.eq(Some(suggestion_id)))
            .load(&mut conn)?)
    }

    async fn reports_by_comment(&self, comment_id: i32) -> AppResult<Vec<Report>> {
        let mut conn = self.conn()?;
        Ok(reports::table
            .filter(reports::comment_id.eq(Some(comment_id)))
            .load(&mut conn)?)
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(reports::table)
            .values(&report)
            .get_result(&mut conn)?)
    }

    async fn resolve_report(&self, id: i32) -> AppResult<Report> {
        let mut conn = self.conn()?;
        diesel::update(reports::table.find(id))
            .set(reports::resolved.eq(true))
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))
    }

    async fn list_open_reports(&self, offset: i64, limit: i64) -> AppResult<(Vec<Report>, i64)> {
        let mut conn = self.conn()?;
        let items = reports::table
            .filter(reports::resolved.eq(false))
            .order(reports::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load(&mut conn)?;
        let total = reports::table
            .filter(reports::resolved.eq(false))
            .count()
            .get_result(&mut conn)?;
        Ok((items, total))
    }
}

#[async_trait]
impl MaintenanceStore for PgStorage {
    async fn reset(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<(), AppError, _>(|conn| {
            diesel::delete(reports::table).execute(conn)?;
            diesel::delete(votes::table).execute(conn)?;
            diesel::delete(comments::table).execute(conn)?;
            diesel::delete(suggestions::table).execute(conn)?;
            diesel::delete(users::table).execute(conn)?;
            Ok(())
        })
    }
}
