//! In-Memory Case Repository Adapter
//!
//! Holds case profiles in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::case::CaseProfile;
use crate::domain::foundation::CaseId;
use crate::ports::{CaseLoadError, CaseRepository};

/// In-memory case storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryCaseRepository {
    cases: Arc<RwLock<HashMap<CaseId, CaseProfile>>>,
}

impl InMemoryCaseRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `cases`
    pub fn with_cases(cases: impl IntoIterator<Item = CaseProfile>) -> Self {
        let map = cases
            .into_iter()
            .map(|case| (case.case_id.clone(), case))
            .collect();
        Self {
            cases: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a case
    pub async fn insert(&self, case: CaseProfile) {
        self.cases.write().await.insert(case.case_id.clone(), case);
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn load(&self, case_id: &CaseId) -> Result<CaseProfile, CaseLoadError> {
        let profile = self
            .cases
            .read()
            .await
            .get(case_id)
            .cloned()
            .ok_or_else(|| CaseLoadError::NotFound(case_id.clone()))?;
        profile.validate().map_err(|source| CaseLoadError::Invalid {
            case_id: case_id.clone(),
            source,
        })?;
        Ok(profile)
    }

    async fn list(&self) -> Result<Vec<CaseId>, CaseLoadError> {
        let mut ids: Vec<CaseId> = self.cases.read().await.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::PersonaKind;

    fn case(id: &str, name: &str) -> CaseProfile {
        CaseProfile::new(CaseId::new(id).unwrap(), PersonaKind::Patient, name)
    }

    #[tokio::test]
    async fn load_returns_inserted_case() {
        let repo = InMemoryCaseRepository::new();
        repo.insert(case("c1", "A")).await;

        let loaded = repo.load(&CaseId::new("c1").unwrap()).await.unwrap();
        assert_eq!(loaded.simulator.name, "A");
    }

    #[tokio::test]
    async fn load_validates_profile() {
        let repo = InMemoryCaseRepository::with_cases([case("c1", " ")]);
        let result = repo.load(&CaseId::new("c1").unwrap()).await;
        assert!(matches!(result, Err(CaseLoadError::Invalid { .. })));
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let repo = InMemoryCaseRepository::with_cases([case("b", "B"), case("a", "A")]);
        let ids = repo.list().await.unwrap();
        assert_eq!(ids[0].as_str(), "a");
        assert_eq!(ids[1].as_str(), "b");
    }
}
