//! OSCE Simulator - Virtual-patient role-play for clinical skills exams
//!
//! A student interviews a simulated patient or guardian whose persona comes
//! from an authored case. Each session runs a `ConversationEngine` that keeps
//! the role-play prompt in step with which fallback questions the student
//! has already reached, compacts long histories, and proxies turns to an
//! LLM chat-completion API.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
