//! Suggestion workflows: submission with moderation, proximity retrieval,
//! search, ordering, lifecycle changes and deletion.

use std::cmp::Ordering;
use std::collections::HashMap;

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::types::AuthUser;
use serde::Serialize;

use crate::models::{
    Comment, Location, NewComment, NewSuggestion, Suggestion, SuggestionStatus, UserSummary,
};
use crate::services::geo::haversine_km;
use crate::services::moderation::{escalate_if_flagged, ProfanityFilter};
use crate::storage::Storage;

/// A suggestion as the listing endpoints return it: the row itself, the
/// distance from the query origin when one was given, and the author's
/// public fields.
#[derive(Debug, Serialize)]
pub struct SuggestionView {
    #[serde(flatten)]
    pub suggestion: Suggestion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Hot,
    Nearest,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "hot" => Ok(Self::Hot),
            "nearest" => Ok(Self::Nearest),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

pub struct SuggestionDraft {
    pub title: String,
    pub description: String,
    pub location: Location,
    pub photo_url: Option<String>,
}

/// Load suggestions, keeping only those within `radius_km` of `origin` when
/// an origin is given. Suggestions without a usable location never match a
/// proximity query but are kept when no origin is supplied.
pub async fn find_near(
    storage: &dyn Storage,
    origin: Option<&Location>,
    radius_km: f64,
) -> AppResult<Vec<SuggestionView>> {
    let rows = storage.list_suggestions().await?;
    let mut views = Vec::with_capacity(rows.len());
    for suggestion in rows {
        let distance_km = match origin {
            Some(origin) => match suggestion.coordinates() {
                Some(point) => {
                    let d = haversine_km(origin, point);
                    if d > radius_km {
                        continue;
                    }
                    Some(d)
                }
                None => continue,
            },
            None => None,
        };
        views.push(SuggestionView {
            suggestion,
            distance_km,
            author: None,
        });
    }
    Ok(views)
}

/// Fill in the author summary for each view. A missing user leaves the
/// author unset rather than failing the listing.
pub async fn attach_authors(storage: &dyn Storage, views: &mut [SuggestionView]) -> AppResult<()> {
    let mut cache: HashMap<i32, Option<UserSummary>> = HashMap::new();
    for view in views.iter_mut() {
        let user_id = view.suggestion.user_id;
        if let Some(cached) = cache.get(&user_id) {
            view.author = cached.clone();
            continue;
        }
        let author = storage.get_user(user_id).await?.map(|u| UserSummary::from(&u));
        cache.insert(user_id, author.clone());
        view.author = author;
    }
    Ok(())
}

/// Case-insensitive substring match over title, description and author name.
pub fn apply_search(views: &mut Vec<SuggestionView>, query: &str) {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return;
    }
    views.retain(|v| {
        v.suggestion.title.to_lowercase().contains(&needle)
            || v.suggestion.description.to_lowercase().contains(&needle)
            || v.author
                .as_ref()
                .map_or(false, |a| a.name.to_lowercase().contains(&needle))
    });
}

pub fn sort_results(views: &mut [SuggestionView], order: SortOrder) {
    match order {
        SortOrder::Newest => {
            views.sort_by(|a, b| b.suggestion.created_at.cmp(&a.suggestion.created_at));
        }
        SortOrder::Hot => {
            views.sort_by(|a, b| {
                b.suggestion
                    .score()
                    .cmp(&a.suggestion.score())
                    .then_with(|| b.suggestion.created_at.cmp(&a.suggestion.created_at))
            });
        }
        SortOrder::Nearest => {
            // Views without a distance sort last.
            views.sort_by(|a, b| match (a.distance_km, b.distance_km) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }
}

/// Persist a new suggestion after screening its text. A banned author is
/// turned away; flagged text is stored masked and the warning escalation
/// runs after the write.
pub async fn submit_suggestion(
    storage: &dyn Storage,
    filter: &ProfanityFilter,
    author: &AuthUser,
    draft: SuggestionDraft,
    ban_threshold: i32,
) -> AppResult<Suggestion> {
    let user = storage
        .get_user(author.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
    if user.is_banned {
        return Err(AppError::new(
            ErrorCode::UserBanned,
            "account is banned from posting",
        ));
    }

    let title = filter.screen(&draft.title);
    let description = filter.screen(&draft.description);
    let flagged = title.flagged || description.flagged;

    let suggestion = storage
        .create_suggestion(NewSuggestion {
            title: title.text,
            description: description.text,
            location: draft.location,
            user_id: author.id,
            photo_url: draft.photo_url,
        })
        .await?;

    escalate_if_flagged(storage, author.id, flagged, ban_threshold).await;
    Ok(suggestion)
}

/// Assign a lifecycle status. REJECTED requires a non-empty reason; any
/// other status clears a previously stored reason.
pub async fn change_status(
    storage: &dyn Storage,
    id: i32,
    status: SuggestionStatus,
    rejection_reason: Option<String>,
) -> AppResult<Suggestion> {
    let reason = match status {
        SuggestionStatus::Rejected => {
            let reason = rejection_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or_else(|| AppError::validation("a rejection reason is required"))?;
            Some(reason)
        }
        _ => None,
    };
    storage.update_status(id, status, reason).await
}

/// Delete a suggestion and everything hanging off it. Allowed for the owner
/// and for admins only.
pub async fn delete_suggestion(storage: &dyn Storage, actor: &AuthUser, id: i32) -> AppResult<()> {
    let suggestion = storage
        .get_suggestion(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found"))?;
    if suggestion.user_id != actor.id && !actor.is_admin {
        return Err(AppError::new(
            ErrorCode::NotSuggestionOwner,
            "only the author or an admin can delete a suggestion",
        ));
    }
    storage.delete_suggestion_cascade(id).await
}

/// Attach a comment, optionally threaded under a parent comment on the same
/// suggestion. Text goes through the same moderation pipeline as suggestions.
pub async fn add_comment(
    storage: &dyn Storage,
    filter: &ProfanityFilter,
    author: &AuthUser,
    suggestion_id: i32,
    content: String,
    parent_id: Option<i32>,
    ban_threshold: i32,
) -> AppResult<Comment> {
    let user = storage
        .get_user(author.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
    if user.is_banned {
        return Err(AppError::new(
            ErrorCode::UserBanned,
            "account is banned from posting",
        ));
    }

    storage
        .get_suggestion(suggestion_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found"))?;

    if let Some(parent_id) = parent_id {
        let parent = storage
            .get_comment(parent_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "parent comment not found"))?;
        if parent.suggestion_id != suggestion_id {
            return Err(AppError::validation(
                "parent comment belongs to a different suggestion",
            ));
        }
    }

    let screened = filter.screen(&content);
    let comment = storage
        .create_comment(NewComment {
            content: screened.text,
            suggestion_id,
            user_id: author.id,
            parent_id,
        })
        .await?;

    escalate_if_flagged(storage, author.id, screened.flagged, ban_threshold).await;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::storage::{MemoryStorage, SuggestionStore, UserStore, VoteStore};

    const BAN_THRESHOLD: i32 = 2;

    async fn seed_user(storage: &MemoryStorage, username: &str) -> AuthUser {
        let user = storage
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "x".into(),
                name: format!("{username} kumar"),
                email: format!("{username}@example.com"),
                is_admin: false,
            })
            .await
            .unwrap();
        AuthUser {
            id: user.id,
            username: user.username,
            is_admin: false,
        }
    }

    async fn seed_suggestion(
        storage: &MemoryStorage,
        author: &AuthUser,
        title: &str,
        lat: f64,
        lng: f64,
    ) -> Suggestion {
        storage
            .create_suggestion(NewSuggestion {
                title: title.to_string(),
                description: "details".into(),
                location: Location::new(lat, lng),
                user_id: author.id,
                photo_url: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn proximity_filtering_keeps_nearby_only() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        seed_suggestion(&storage, &author, "near", 12.9716, 77.5946).await;
        seed_suggestion(&storage, &author, "city edge", 13.05, 77.60).await;
        seed_suggestion(&storage, &author, "chennai", 13.0827, 80.2707).await;
        seed_suggestion(&storage, &author, "unlocated", 0.0, 0.0).await;

        let origin = Location::new(12.9716, 77.5946);
        let views = find_near(&storage, Some(&origin), 50.0).await.unwrap();
        let titles: Vec<&str> = views.iter().map(|v| v.suggestion.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"near"));
        assert!(titles.contains(&"city edge"));
        assert!(views.iter().all(|v| v.distance_km.is_some()));
    }

    #[tokio::test]
    async fn no_origin_keeps_everything_including_unlocated() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        seed_suggestion(&storage, &author, "near", 12.9716, 77.5946).await;
        seed_suggestion(&storage, &author, "unlocated", 0.0, 0.0).await;

        let views = find_near(&storage, None, 50.0).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.distance_km.is_none()));
    }

    #[tokio::test]
    async fn nearest_sort_orders_by_distance() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        seed_suggestion(&storage, &author, "far", 13.05, 77.60).await;
        seed_suggestion(&storage, &author, "close", 12.9720, 77.5946).await;

        let origin = Location::new(12.9716, 77.5946);
        let mut views = find_near(&storage, Some(&origin), 50.0).await.unwrap();
        sort_results(&mut views, SortOrder::Nearest);
        assert_eq!(views[0].suggestion.title, "close");
        assert_eq!(views[1].suggestion.title, "far");
    }

    #[tokio::test]
    async fn hot_sort_uses_net_score() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        let voter_a = seed_user(&storage, "bina").await;
        let voter_b = seed_user(&storage, "chetan").await;
        let cold = seed_suggestion(&storage, &author, "cold", 12.97, 77.59).await;
        let hot = seed_suggestion(&storage, &author, "hot", 12.97, 77.59).await;
        storage.cast_vote(voter_a.id, hot.id, true).await.unwrap();
        storage.cast_vote(voter_b.id, hot.id, true).await.unwrap();
        storage.cast_vote(voter_a.id, cold.id, false).await.unwrap();

        let mut views = find_near(&storage, None, 50.0).await.unwrap();
        sort_results(&mut views, SortOrder::Hot);
        assert_eq!(views[0].suggestion.title, "hot");
    }

    #[tokio::test]
    async fn search_matches_title_description_and_author() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        seed_suggestion(&storage, &author, "Fix the Streetlight", 12.97, 77.59).await;
        seed_suggestion(&storage, &author, "New park bench", 12.97, 77.59).await;

        let mut views = find_near(&storage, None, 50.0).await.unwrap();
        attach_authors(&storage, &mut views).await.unwrap();

        let mut by_title = views;
        apply_search(&mut by_title, "streetlight");
        assert_eq!(by_title.len(), 1);

        let mut views = find_near(&storage, None, 50.0).await.unwrap();
        attach_authors(&storage, &mut views).await.unwrap();
        apply_search(&mut views, "ASHA kumar");
        assert_eq!(views.len(), 2);
    }

    #[tokio::test]
    async fn submission_masks_and_warns_then_bans() {
        let storage = MemoryStorage::new();
        let filter = ProfanityFilter::default();
        let author = seed_user(&storage, "asha").await;
        let draft = |title: &str| SuggestionDraft {
            title: title.to_string(),
            description: "clean text".into(),
            location: Location::new(12.97, 77.59),
            photo_url: None,
        };

        let s = submit_suggestion(&storage, &filter, &author, draft("this crap road"), BAN_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(s.title, "this **** road");
        let user = storage.get_user(author.id).await.unwrap().unwrap();
        assert_eq!(user.warning_count, 1);
        assert!(!user.is_banned);

        submit_suggestion(&storage, &filter, &author, draft("damn potholes"), BAN_THRESHOLD)
            .await
            .unwrap();
        let user = storage.get_user(author.id).await.unwrap().unwrap();
        assert_eq!(user.warning_count, 2);
        assert!(user.is_banned);

        let err = submit_suggestion(&storage, &filter, &author, draft("anything"), BAN_THRESHOLD)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::UserBanned));
    }

    #[tokio::test]
    async fn rejection_requires_reason_and_other_statuses_clear_it() {
        let storage = MemoryStorage::new();
        let author = seed_user(&storage, "asha").await;
        let s = seed_suggestion(&storage, &author, "road", 12.97, 77.59).await;

        let err = change_status(&storage, s.id, SuggestionStatus::Rejected, Some("  ".into()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ValidationError));

        let s = change_status(
            &storage,
            s.id,
            SuggestionStatus::Rejected,
            Some("duplicate".into()),
        )
        .await
        .unwrap();
        assert_eq!(s.rejection_reason.as_deref(), Some("duplicate"));

        let s = change_status(&storage, s.id, SuggestionStatus::Active, None)
            .await
            .unwrap();
        assert_eq!(s.status, SuggestionStatus::Active);
        assert!(s.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes() {
        let storage = MemoryStorage::new();
        let owner = seed_user(&storage, "asha").await;
        let other = seed_user(&storage, "bina").await;
        let s = seed_suggestion(&storage, &owner, "road", 12.97, 77.59).await;

        let err = delete_suggestion(&storage, &other, s.id).await.unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::NotSuggestionOwner));

        let admin = AuthUser {
            id: other.id,
            username: other.username.clone(),
            is_admin: true,
        };
        delete_suggestion(&storage, &admin, s.id).await.unwrap();
        assert!(storage.get_suggestion(s.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn comment_threading_validates_parent() {
        let storage = MemoryStorage::new();
        let filter = ProfanityFilter::default();
        let author = seed_user(&storage, "asha").await;
        let s1 = seed_suggestion(&storage, &author, "one", 12.97, 77.59).await;
        let s2 = seed_suggestion(&storage, &author, "two", 12.97, 77.59).await;

        let root = add_comment(&storage, &filter, &author, s1.id, "agreed".into(), None, BAN_THRESHOLD)
            .await
            .unwrap();
        let reply = add_comment(
            &storage,
            &filter,
            &author,
            s1.id,
            "me too".into(),
            Some(root.id),
            BAN_THRESHOLD,
        )
        .await
        .unwrap();
        assert_eq!(reply.parent_id, Some(root.id));

        let err = add_comment(
            &storage,
            &filter,
            &author,
            s2.id,
            "cross thread".into(),
            Some(root.id),
            BAN_THRESHOLD,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ValidationError));
    }
}
