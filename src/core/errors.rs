/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

pub use crate::persist::{PersistError, StoreError};
pub use crate::process::ProcessError;

/// Top-level kernel error aggregating all subsystem errors
#[derive(Error, Debug)]
pub enum KernelError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
