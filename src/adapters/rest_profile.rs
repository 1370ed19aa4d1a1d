//! REST profile store for the hosted backend's row endpoint.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::domain::Profile;
use crate::error::{ProfileError, SessionResult};
use crate::traits::{Headers, HttpClient, ProfileStore};

/// Reads one profile row from `/rest/v1/<table>`.
///
/// Requests are authorized with the caller's bearer token, or the anon key
/// when there is none (row-level security will then hide the row).
pub struct RestProfileStore {
    http: Arc<dyn HttpClient>,
    base_url: String,
    anon_key: String,
    table: String,
}

impl RestProfileStore {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            table: table.into(),
        }
    }

    pub fn from_config(config: &SessionConfig, http: Arc<dyn HttpClient>) -> SessionResult<Self> {
        let (url, anon_key) = config.backend()?;
        Ok(Self::new(http, url, anon_key, config.profile_table.clone()))
    }

    fn profile_url(&self, identity_id: &str) -> String {
        format!(
            "{}/rest/v1/{}?id=eq.{}&select=*&limit=1",
            self.base_url,
            urlencoding::encode(&self.table),
            urlencoding::encode(identity_id)
        )
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn get_profile(
        &self,
        identity_id: &str,
        token: Option<&str>,
    ) -> Result<Option<Profile>, ProfileError> {
        let mut headers = Headers::new();
        headers.insert("apikey".to_string(), self.anon_key.clone());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", token.unwrap_or(&self.anon_key)),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());

        let response = self
            .http
            .get(&self.profile_url(identity_id), &headers)
            .await?
            .error_for_status()?;

        let rows: Vec<Profile> = response.json()?;
        Ok(rows.into_iter().next())
    }
}

impl std::fmt::Debug for RestProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestProfileStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::traits::HttpError;
    use serde_json::json;

    const URL: &str = "https://proj.example.co/rest/v1/users?id=eq.u%201&select=*&limit=1";

    fn store(http: &MockHttpClient) -> RestProfileStore {
        RestProfileStore::new(Arc::new(http.clone()), "https://proj.example.co/", "anon", "users")
    }

    #[tokio::test]
    async fn test_found_row() {
        let http = MockHttpClient::new();
        http.set_response(
            URL,
            MockResponse::json(
                200,
                json!([{"id": "u 1", "role": "manager", "organization_id": "o1", "timezone": "UTC"}]),
            ),
        );

        let profile = store(&http).get_profile("u 1", Some("t1")).await.unwrap().unwrap();

        assert_eq!(profile.role.as_deref(), Some("manager"));
        assert_eq!(profile.extra.get("timezone"), Some(&json!("UTC")));
        let request = &http.get_requests()[0];
        assert_eq!(request.url, URL);
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer t1".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_result_is_not_found() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::json(200, json!([])));

        assert_eq!(store(&http).get_profile("u 1", None).await, Ok(None));
        assert_eq!(
            http.get_requests()[0].headers.get("Authorization"),
            Some(&"Bearer anon".to_string())
        );
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let http = MockHttpClient::new();
        http.push_response(URL, MockResponse::Error(HttpError::Cancelled));
        http.push_response(URL, MockResponse::json(401, json!({"message": "JWT expired"})));
        http.push_response(URL, MockResponse::json(500, json!({"message": "boom"})));
        http.push_response(URL, MockResponse::json(200, json!({"not": "an array"})));
        let store = store(&http);

        assert_eq!(
            store.get_profile("u 1", Some("t")).await,
            Err(ProfileError::Cancelled)
        );
        assert_eq!(
            store.get_profile("u 1", Some("t")).await,
            Err(ProfileError::Unauthorized {
                message: "JWT expired".to_string()
            })
        );
        assert!(matches!(
            store.get_profile("u 1", Some("t")).await,
            Err(ProfileError::Http { status: 500, .. })
        ));
        assert!(matches!(
            store.get_profile("u 1", Some("t")).await,
            Err(ProfileError::Decode { .. })
        ));
    }
}
