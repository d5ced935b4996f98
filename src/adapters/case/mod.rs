//! Case Repository Adapters
//!
//! - `FileCaseRepository` - JSON/YAML case documents on disk
//! - `InMemoryCaseRepository` - In-memory cases for tests

mod file_case_repository;
mod in_memory_case_repository;

pub use file_case_repository::FileCaseRepository;
pub use in_memory_case_repository::InMemoryCaseRepository;
