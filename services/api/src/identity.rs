//! services/api/src/identity.rs
//!
//! Request-scoped identity. The `session` cookie is resolved to an optional user;
//! a request without a valid session is anonymous, not an error.

use async_trait::async_trait;
use study_insights_core::domain::User;
use study_insights_core::ports::{IdentityProvider, PortResult};

/// Looks up browser auth sessions issued by the identity provider.
#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    /// Returns the session's user, or `None` if it is unknown or expired.
    async fn resolve_auth_session(&self, session_id: &str) -> PortResult<Option<User>>;
}

/// The user attached to the current request, inserted by the identity middleware.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl IdentityProvider for CurrentUser {
    fn current_user(&self) -> Option<User> {
        self.0.clone()
    }
}

/// Extracts the `session=` value from a `Cookie` header.
pub fn session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_session_cookie() {
        assert_eq!(session_cookie("theme=dark; session=abc123"), Some("abc123"));
        assert_eq!(session_cookie("session=xyz"), Some("xyz"));
        assert_eq!(session_cookie("theme=dark"), None);
        assert_eq!(session_cookie("session="), None);
    }
}
