//! Profile store trait abstraction.

use async_trait::async_trait;

use crate::domain::Profile;
use crate::error::ProfileError;

/// Single-record lookup of the profile attached to an identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for `identity_id`, authorized by `token`.
    ///
    /// # Returns
    /// - `Ok(Some(profile))` if the record exists
    /// - `Ok(None)` if it does not (not an error)
    /// - `Err(error)` for cancellation, auth and transport failures
    async fn get_profile(
        &self,
        identity_id: &str,
        token: Option<&str>,
    ) -> Result<Option<Profile>, ProfileError>;
}
