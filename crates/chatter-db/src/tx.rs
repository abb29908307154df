//! Transaction scope for multi-statement mutations.

use tracing::warn;

use crate::connection::{Connector, Tx, master};
use crate::context::Context;
use crate::error::{DatastoreError, Result};

/// Runs `f` inside one write transaction on master.
///
/// `Ok` commits; a commit failure is returned wrapped with `operation` and
/// the transaction is rolled back as it drops. `Err` rolls back and returns
/// the error from `f` unchanged; a rollback failure is only logged. A panic
/// in `f` rolls back as the transaction unwinds.
pub fn with_transaction<C, T, F>(ctx: &Context, connector: &C, operation: &str, f: F) -> Result<T>
where
    C: Connector + ?Sized,
    F: FnOnce(&mut Tx<'_>) -> Result<T>,
{
    let mut handle = master(ctx, connector)?;
    let mut tx = handle.begin().map_err(|e| {
        DatastoreError::transaction(format!("An error occurred while beginning {}", operation), e)
    })?;

    match f(&mut tx) {
        Ok(value) => {
            tx.commit().map_err(|e| {
                DatastoreError::transaction(format!("An error occurred while committing {}", operation), e)
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("Rollback of {} failed: {}", operation, rollback_err);
            }
            Err(err)
        }
    }
}
