use tokio_util::sync::CancellationToken;

use crate::error::{DatastoreError, Result};

/// Per-request context handed to every datastore operation.
///
/// Cancellation is cooperative: the token is checked before a handle is
/// acquired and before each statement, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(DatastoreError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_context_fails_check() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());
        assert!(ctx.check().is_ok());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(DatastoreError::Cancelled)));
    }
}
