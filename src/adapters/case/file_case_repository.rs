//! File-based Case Repository Adapter
//!
//! Loads case profiles from a directory of JSON or YAML documents named
//! after the case id (`<case_dir>/<case_id>.json`, `.yaml` or `.yml`).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::case::CaseProfile;
use crate::domain::foundation::CaseId;
use crate::ports::{CaseLoadError, CaseRepository};

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// File-based case storage
#[derive(Debug, Clone)]
pub struct FileCaseRepository {
    base_path: PathBuf,
}

impl FileCaseRepository {
    /// Create a repository rooted at `base_path`
    ///
    /// # Example
    /// ```ignore
    /// let cases = FileCaseRepository::new("./cases");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// First existing file for the case, in extension preference order
    fn find_case_file(&self, case_id: &CaseId) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.base_path.join(format!("{}.{}", case_id.as_str(), ext)))
            .find(|path| path.is_file())
    }

    fn parse(case_id: &CaseId, path: &Path, text: &str) -> Result<CaseProfile, CaseLoadError> {
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let parsed = if is_json {
            serde_json::from_str::<CaseProfile>(text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<CaseProfile>(text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| CaseLoadError::Parse {
            case_id: case_id.clone(),
            message,
        })
    }
}

#[async_trait]
impl CaseRepository for FileCaseRepository {
    async fn load(&self, case_id: &CaseId) -> Result<CaseProfile, CaseLoadError> {
        let path = self
            .find_case_file(case_id)
            .ok_or_else(|| CaseLoadError::NotFound(case_id.clone()))?;

        let text = fs::read_to_string(&path).await.map_err(|e| CaseLoadError::Io {
            case_id: case_id.clone(),
            message: e.to_string(),
        })?;

        let profile = Self::parse(case_id, &path, &text)?;
        if &profile.case_id != case_id {
            tracing::warn!(
                requested = %case_id,
                declared = %profile.case_id,
                "Case file declares a different case_id"
            );
        }
        profile.validate().map_err(|source| CaseLoadError::Invalid {
            case_id: case_id.clone(),
            source,
        })?;

        tracing::debug!(case_id = %case_id, path = %path.display(), "Loaded case");
        Ok(profile)
    }

    async fn list(&self) -> Result<Vec<CaseId>, CaseLoadError> {
        let io_error = |e: std::io::Error| CaseLoadError::Listing(e.to_string());

        let mut entries = fs::read_dir(&self.base_path).await.map_err(io_error)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let has_case_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if !has_case_extension {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| CaseId::new(s).ok())
            {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}
