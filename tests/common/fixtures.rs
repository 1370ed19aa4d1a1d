//! Fixture builders shared by the integration tests.

use rota_session::domain::{Profile, Session};

/// A session that won't expire during test execution.
pub fn session(user_id: &str, token: &str) -> Session {
    Session::new(user_id, token)
        .with_refresh_token(format!("refresh-{}", token))
        .with_expires_at(i64::MAX)
}

pub fn manager_profile() -> Profile {
    Profile {
        id: Some("U1".to_string()),
        role: Some("manager".to_string()),
        organization_id: Some("O1".to_string()),
        display_name: Some("Dana Reyes".to_string()),
        ..Default::default()
    }
}

pub fn admin_profile() -> Profile {
    Profile {
        role: Some("admin".to_string()),
        organization_id: Some("O1".to_string()),
        ..Default::default()
    }
}

/// A persisted provider entry, as the backend SDK writes it.
pub fn persisted_entry(user_id: &str, token: &str) -> String {
    serde_json::json!({
        "access_token": token,
        "refresh_token": format!("refresh-{}", token),
        "expires_at": i64::MAX,
        "token_type": "bearer",
        "user": { "id": user_id }
    })
    .to_string()
}
