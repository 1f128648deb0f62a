//! Caller identity, as asserted by the upstream gateway.
//!
//! Authentication itself happens in front of this service; requests arrive
//! with `x-user-id` / `x-session-id` / `x-user-role` headers already
//! verified. Guests carry only a session id.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub admin: bool,
}

impl Identity {
    /// Audit-log attribution string.
    pub fn actor(&self) -> String {
        match (self.admin, self.user_id, &self.session_id) {
            (true, Some(id), _) => format!("admin:{id}"),
            (true, None, _) => "admin".to_string(),
            (false, Some(id), _) => format!("user:{id}"),
            (false, None, Some(session)) => format!("guest:{session}"),
            (false, None, None) => "anonymous".to_string(),
        }
    }

    pub fn require_user(&self) -> Result<Uuid, ApiError> {
        self.user_id.ok_or(ApiError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.admin { Ok(()) } else { Err(ApiError::Forbidden) }
    }

    /// A caller must be identifiable somehow to own a cart.
    pub fn require_any(&self) -> Result<(), ApiError> {
        if self.user_id.is_some() || self.session_id.is_some() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let user_id = match header("x-user-id") {
            Some(raw) => Some(
                raw.parse::<Uuid>()
                    .map_err(|_| ApiError::Validation("invalid x-user-id header".into()))?,
            ),
            None => None,
        };
        let session_id = header("x-session-id").filter(|s| !s.is_empty());
        let admin = header("x-user-role").is_some_and(|r| r.eq_ignore_ascii_case("admin"));

        Ok(Identity { user_id, session_id, admin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_attribution() {
        let guest = Identity { user_id: None, session_id: Some("s1".into()), admin: false };
        assert_eq!(guest.actor(), "guest:s1");
        let id = Uuid::from_u128(1);
        let admin = Identity { user_id: Some(id), session_id: None, admin: true };
        assert!(admin.actor().starts_with("admin:"));
    }

    #[test]
    fn guards() {
        let anon = Identity::default();
        assert!(anon.require_user().is_err());
        assert!(anon.require_any().is_err());
        assert!(anon.require_admin().is_err());
        let guest = Identity { session_id: Some("s".into()), ..Default::default() };
        assert!(guest.require_any().is_ok());
        assert!(guest.require_user().is_err());
    }
}
