//! Identity boundary. Login, registration, and logout live outside this
//! crate; the lifecycle only ever asks "who is signed in right now".

/// Supplies the opaque identifier of the authenticated user.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Identity pinned to a single user id, for embedders that resolve
/// authentication before constructing the tracker.
pub struct FixedIdentity {
    user_id: String,
}

impl FixedIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }
}
