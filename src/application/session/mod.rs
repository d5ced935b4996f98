//! Live session registry and the idle-session reaper.

mod reaper;
mod store;

pub use reaper::{SessionReaper, SessionReaperConfig};
pub use store::{SessionEntry, SessionMetadata, SessionStore, SessionStoreError};
