//! Domain layer containing the simulator's business rules and types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `case` - Authored case profiles (persona, scenario, fallback questions)
//! - `conversation` - Message history, question tracking, prompt rendering,
//!   classification parsing, compaction and generation policy

pub mod case;
pub mod conversation;
pub mod foundation;
