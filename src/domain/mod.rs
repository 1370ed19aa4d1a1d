//! Domain types shared by the synchronizer and its collaborators.
//!
//! - [`Session`] / [`AuthEvent`]: what the identity provider reports
//! - [`Identity`]: the resolved signed-in principal
//! - [`Profile`] / [`Role`]: the business record attached to an identity

pub mod identity;
pub mod profile;
pub mod session;

pub use identity::{Identity, IdentityOrigin};
pub use profile::{Profile, Role};
pub use session::{AuthEvent, AuthEventKind, Session};
