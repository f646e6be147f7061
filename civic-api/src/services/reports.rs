//! Report filing and admin triage.

use civic_shared::errors::{AppError, AppResult, ErrorCode};
use civic_shared::types::AuthUser;

use crate::models::{NewReport, Report};
use crate::storage::Storage;

pub struct ReportDraft {
    pub reason: String,
    pub description: String,
    pub suggestion_id: Option<i32>,
    pub comment_id: Option<i32>,
    pub photo_url: Option<String>,
}

/// File a report against exactly one target: a suggestion or a comment.
/// The target must exist at filing time.
pub async fn file_report(
    storage: &dyn Storage,
    reporter: &AuthUser,
    draft: ReportDraft,
) -> AppResult<Report> {
    match (draft.suggestion_id, draft.comment_id) {
        (Some(_), Some(_)) => {
            return Err(AppError::new(
                ErrorCode::ReportTargetAmbiguous,
                "a report targets either a suggestion or a comment, not both",
            ))
        }
        (None, None) => {
            return Err(AppError::new(
                ErrorCode::ReportTargetMissing,
                "a report needs a suggestion or a comment to target",
            ))
        }
        (Some(suggestion_id), None) => {
            storage
                .get_suggestion(suggestion_id)
                .await?
                .ok_or_else(|| {
                    AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found")
                })?;
        }
        (None, Some(comment_id)) => {
            storage
                .get_comment(comment_id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "comment not found"))?;
        }
    }

    if draft.reason.trim().is_empty() {
        return Err(AppError::validation("a report reason is required"));
    }

    storage
        .create_report(NewReport {
            reason: draft.reason,
            description: draft.description,
            user_id: reporter.id,
            suggestion_id: draft.suggestion_id,
            comment_id: draft.comment_id,
            photo_url: draft.photo_url,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NewComment, NewSuggestion, NewUser};
    use crate::storage::{CommentStore, MemoryStorage, SuggestionStore, UserStore};

    async fn setup() -> (MemoryStorage, AuthUser, i32, i32) {
        let storage = MemoryStorage::new();
        let user = storage
            .create_user(NewUser {
                username: "asha".into(),
                password_hash: "x".into(),
                name: "Asha".into(),
                email: "asha@example.com".into(),
                is_admin: false,
            })
            .await
            .unwrap();
        let suggestion = storage
            .create_suggestion(NewSuggestion {
                title: "road".into(),
                description: "details".into(),
                location: Location::new(12.97, 77.59),
                user_id: user.id,
                photo_url: None,
            })
            .await
            .unwrap();
        let comment = storage
            .create_comment(NewComment {
                content: "agreed".into(),
                suggestion_id: suggestion.id,
                user_id: user.id,
                parent_id: None,
            })
            .await
            .unwrap();
        let reporter = AuthUser {
            id: user.id,
            username: user.username,
            is_admin: false,
        };
        (storage, reporter, suggestion.id, comment.id)
    }

    fn draft(suggestion_id: Option<i32>, comment_id: Option<i32>) -> ReportDraft {
        ReportDraft {
            reason: "SPAM".into(),
            description: "looks automated".into(),
            suggestion_id,
            comment_id,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn requires_exactly_one_target() {
        let (storage, reporter, sid, cid) = setup().await;

        let err = file_report(&storage, &reporter, draft(Some(sid), Some(cid)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ReportTargetAmbiguous));

        let err = file_report(&storage, &reporter, draft(None, None))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ReportTargetMissing));
    }

    #[tokio::test]
    async fn target_must_exist() {
        let (storage, reporter, _, _) = setup().await;

        let err = file_report(&storage, &reporter, draft(Some(999), None))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::SuggestionNotFound));

        let err = file_report(&storage, &reporter, draft(None, Some(999)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::CommentNotFound));
    }

    #[tokio::test]
    async fn files_against_suggestion_and_comment() {
        let (storage, reporter, sid, cid) = setup().await;

        let r = file_report(&storage, &reporter, draft(Some(sid), None))
            .await
            .unwrap();
        assert_eq!(r.suggestion_id, Some(sid));
        assert!(!r.resolved);

        let r = file_report(&storage, &reporter, draft(None, Some(cid)))
            .await
            .unwrap();
        assert_eq!(r.comment_id, Some(cid));
    }
}
