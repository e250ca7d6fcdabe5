//! Caller identity
//!
//! Accounts live in the surrounding platform. The gateway in front of this
//! service authenticates the caller and forwards who they are in headers.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const TEAM_ID_HEADER: &str = "x-team-id";

/// The user making the request, optionally acting for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(&parts.headers, USER_ID_HEADER)?.ok_or_else(|| {
            debug!(path = %parts.uri.path(), "Missing caller identity");
            AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
        })?;
        let team_id = header_uuid(&parts.headers, TEAM_ID_HEADER)?;

        Ok(Actor { user_id, team_id })
    }
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::InvalidInput(format!("{} is not valid text", name)))?;
    if value.trim().is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value.trim())
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("{} must be a UUID", name)))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(headers: &[(&str, String)]) -> Result<Actor, AppError> {
        let mut builder = Request::builder().uri("/api/v1/submissions");
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_user_only() {
        let user = Uuid::new_v4();
        let actor = extract(&[(USER_ID_HEADER, user.to_string())]).await.unwrap();
        assert_eq!(actor, Actor { user_id: user, team_id: None });
    }

    #[tokio::test]
    async fn test_user_acting_for_team() {
        let user = Uuid::new_v4();
        let team = Uuid::new_v4();
        let actor = extract(&[
            (USER_ID_HEADER, user.to_string()),
            (TEAM_ID_HEADER, team.to_string()),
        ])
        .await
        .unwrap();
        assert_eq!(actor, Actor { user_id: user, team_id: Some(team) });
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let err = extract(&[(TEAM_ID_HEADER, Uuid::new_v4().to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_malformed_id_rejected() {
        let err = extract(&[(USER_ID_HEADER, "alice".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
