use thiserror::Error;

use crate::{inventory::InventoryError, spec::SpecError};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Couldn't list the provider inventory! Reason: {}", .0)]
    InventoryListingError(InventoryError),
    #[error("{}", .0)]
    SpecError(SpecError),
}
