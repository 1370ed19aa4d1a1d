//! The resolved "who is signed in" handle.

use serde::Serialize;

use super::session::Session;

/// Where an identity was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityOrigin {
    StartupProbe,
    LiveEvent,
}

/// A signed-in principal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub id: String,
    /// Bearer credential carried with the identity. May be stale.
    #[serde(skip_serializing)]
    pub token: String,
    pub origin: IdentityOrigin,
}

impl Identity {
    pub fn new(id: impl Into<String>, token: impl Into<String>, origin: IdentityOrigin) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
            origin,
        }
    }

    pub fn from_session(session: &Session, origin: IdentityOrigin) -> Self {
        Self::new(session.user_id.clone(), session.access_token.clone(), origin)
    }

    /// Same principal, regardless of token or origin.
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session() {
        let identity = Identity::from_session(&Session::new("u1", "t1"), IdentityOrigin::StartupProbe);
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.token, "t1");
        assert_eq!(identity.origin, IdentityOrigin::StartupProbe);
    }

    #[test]
    fn test_same_principal_ignores_token() {
        let a = Identity::new("u1", "t1", IdentityOrigin::StartupProbe);
        let b = Identity::new("u1", "t2", IdentityOrigin::LiveEvent);
        let c = Identity::new("u2", "t1", IdentityOrigin::LiveEvent);
        assert!(a.same_principal(&b));
        assert!(!a.same_principal(&c));
    }

    #[test]
    fn test_token_is_not_serialized() {
        let identity = Identity::new("u1", "secret", IdentityOrigin::LiveEvent);
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("live_event"));
    }
}
