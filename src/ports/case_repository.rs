//! Case Repository Port - Interface for loading authored exam cases.
//!
//! Cases are read-only for the simulator; authoring and import happen
//! elsewhere.

use async_trait::async_trait;

use crate::domain::case::CaseProfile;
use crate::domain::foundation::{CaseId, ValidationError};

/// Errors that can occur while loading a case.
#[derive(Debug, thiserror::Error)]
pub enum CaseLoadError {
    #[error("Case not found: {0}")]
    NotFound(CaseId),

    #[error("Failed to read case {case_id}: {message}")]
    Io { case_id: CaseId, message: String },

    #[error("Failed to list cases: {0}")]
    Listing(String),

    #[error("Failed to parse case {case_id}: {message}")]
    Parse { case_id: CaseId, message: String },

    #[error("Case {case_id} is invalid: {source}")]
    Invalid {
        case_id: CaseId,
        #[source]
        source: ValidationError,
    },
}

/// Port for loading case profiles.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Load and validate a case.
    ///
    /// # Errors
    /// Returns `CaseLoadError::NotFound` if no case has this id, or
    /// `CaseLoadError::Invalid` if required fields are missing.
    async fn load(&self, case_id: &CaseId) -> Result<CaseProfile, CaseLoadError>;

    /// List the ids of all available cases.
    async fn list(&self) -> Result<Vec<CaseId>, CaseLoadError>;
}
