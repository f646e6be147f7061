use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{Jsonb, Text};
use serde::{Deserialize, Serialize};

use crate::schema::{comments, reports, suggestions, users, votes};

// --- Location ---

/// A geographic point embedded in users and suggestions. A value type, not
/// an entity of its own; stored as JSONB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Jsonb)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, address: None }
    }

    /// A (0, 0) point is the "no location recorded" sentinel inherited from
    /// the data model; it never takes part in proximity queries.
    pub fn is_usable(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }

    pub fn validate_bounds(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} out of range", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("longitude {} out of range", self.lng));
        }
        Ok(())
    }
}

impl FromSql<Jsonb, Pg> for Location {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <serde_json::Value as FromSql<Jsonb, Pg>>::from_sql(bytes)?;
        serde_json::from_value(value).map_err(Into::into)
    }
}

impl ToSql<Jsonb, Pg> for Location {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        // JSONB wire format: version byte followed by the JSON text.
        out.write_all(&[1])?;
        serde_json::to_writer(out, self)?;
        Ok(IsNull::No)
    }
}

// --- Suggestion status ---

/// Lifecycle state of a suggestion. Transitions are unrestricted assignments
/// gated by the admin capability; REJECTED back to ACTIVE stays allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionStatus {
    Active,
    InProgress,
    Done,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SuggestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("unknown suggestion status: {s}")),
        }
    }
}

impl FromSql<Text, Pg> for SuggestionStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl ToSql<Text, Pg> for SuggestionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub warning_count: i32,
    pub is_banned: bool,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// The slice of a user that is safe to embed in public payloads.
#[derive(Debug, Serialize, Clone)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

// --- Suggestion ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = suggestions)]
pub struct Suggestion {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub user_id: i32,
    pub status: SuggestionStatus,
    pub rejection_reason: Option<String>,
    pub upvotes: i32,
    pub downvotes: i32,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    /// The embedded location, only when it can drive a proximity query.
    pub fn coordinates(&self) -> Option<&Location> {
        self.location.is_usable().then_some(&self.location)
    }

    /// Net score used by hot-first ordering.
    pub fn score(&self) -> i32 {
        self.upvotes - self.downvotes
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = suggestions)]
pub struct NewSuggestion {
    pub title: String,
    pub description: String,
    pub location: Location,
    pub user_id: i32,
    pub photo_url: Option<String>,
}

// --- Comment ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub content: String,
    pub suggestion_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub content: String,
    pub suggestion_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
}

// --- Vote ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = votes)]
pub struct Vote {
    pub id: i32,
    pub suggestion_id: i32,
    pub user_id: i32,
    pub is_upvote: bool,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = votes)]
pub struct NewVote {
    pub suggestion_id: i32,
    pub user_id: i32,
    pub is_upvote: bool,
}

// --- Report ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: i32,
    pub reason: String,
    pub description: String,
    pub user_id: i32,
    pub suggestion_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub photo_url: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub reason: String,
    pub description: String,
    pub user_id: i32,
    pub suggestion_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub photo_url: Option<String>,
}
