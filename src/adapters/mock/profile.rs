//! Mock profile store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::Profile;
use crate::error::ProfileError;
use crate::traits::ProfileStore;

/// Scripted outcome of one lookup.
#[derive(Debug, Clone)]
pub enum MockProfileResponse {
    Found(Profile),
    NotFound,
    Error(ProfileError),
}

/// A recorded lookup for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileLookup {
    pub identity_id: String,
    pub token: Option<String>,
}

/// Mock [`ProfileStore`].
///
/// Each lookup answers from, in order: the per-identity script queue (one
/// entry consumed per call), the inserted profiles, then the default response
/// (not found unless changed).
///
/// # Example
///
/// ```ignore
/// let store = MockProfileStore::new();
/// store.push_response("u1", MockProfileResponse::Error(ProfileError::Cancelled));
/// store.insert_profile("u1", profile);
///
/// // First call is cancelled, second finds the profile
/// ```
#[derive(Debug, Clone)]
pub struct MockProfileStore {
    profiles: Arc<Mutex<HashMap<String, Profile>>>,
    scripted: Arc<Mutex<HashMap<String, VecDeque<MockProfileResponse>>>>,
    default_response: Arc<Mutex<MockProfileResponse>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<Mutex<Vec<ProfileLookup>>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(HashMap::new())),
            scripted: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(MockProfileResponse::NotFound)),
            delay: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn insert_profile(&self, identity_id: &str, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(identity_id.to_string(), profile);
    }

    /// Queue a one-shot response for `identity_id`.
    pub fn push_response(&self, identity_id: &str, response: MockProfileResponse) {
        self.scripted
            .lock()
            .unwrap()
            .entry(identity_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_default_response(&self, response: MockProfileResponse) {
        *self.default_response.lock().unwrap() = response;
    }

    /// Simulated latency applied to every lookup.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<ProfileLookup> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of lookups made for one identity.
    pub fn calls_for(&self, identity_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.identity_id == identity_id)
            .count()
    }

    fn next_response(&self, identity_id: &str) -> MockProfileResponse {
        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(identity_id)
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return response;
        }
        if let Some(profile) = self.profiles.lock().unwrap().get(identity_id) {
            return MockProfileResponse::Found(profile.clone());
        }
        self.default_response.lock().unwrap().clone()
    }
}

impl Default for MockProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn get_profile(
        &self,
        identity_id: &str,
        token: Option<&str>,
    ) -> Result<Option<Profile>, ProfileError> {
        self.calls.lock().unwrap().push(ProfileLookup {
            identity_id: identity_id.to_string(),
            token: token.map(str::to_string),
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_response(identity_id) {
            MockProfileResponse::Found(profile) => Ok(Some(profile)),
            MockProfileResponse::NotFound => Ok(None),
            MockProfileResponse::Error(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_order() {
        let store = MockProfileStore::new();
        let profile = Profile {
            role: Some("employee".to_string()),
            ..Default::default()
        };
        store.insert_profile("u1", profile.clone());
        store.push_response("u1", MockProfileResponse::Error(ProfileError::Cancelled));

        assert_eq!(
            store.get_profile("u1", Some("t")).await,
            Err(ProfileError::Cancelled)
        );
        assert_eq!(store.get_profile("u1", Some("t")).await, Ok(Some(profile)));
        assert_eq!(store.get_profile("u2", None).await, Ok(None));
    }

    #[tokio::test]
    async fn test_records_calls() {
        let store = MockProfileStore::new();
        store.get_profile("u1", Some("t1")).await.unwrap();
        store.get_profile("u2", None).await.unwrap();

        assert_eq!(store.call_count(), 2);
        assert_eq!(store.calls_for("u1"), 1);
        assert_eq!(
            store.calls()[1],
            ProfileLookup {
                identity_id: "u2".to_string(),
                token: None
            }
        );
    }
}
