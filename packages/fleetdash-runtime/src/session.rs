//! Authentication session shared by the gateways of one client.

use parking_lot::RwLock;

/// Holds the bearer token of the signed-in user.
///
/// Starts empty. Pass it explicitly (usually as `Arc<SessionContext>`)
/// to whatever needs the token.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: RwLock<Option<String>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}
