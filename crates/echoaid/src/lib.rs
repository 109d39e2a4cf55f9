//! `echoaid` - Disaster-response coordination core
//!
//! This library provides the SOS request lifecycle, the durable offline queue
//! with reconnect replay, AI-assisted triage and verification gating, and the
//! supporting mock authentication, chat and feed services.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod ai;
pub mod app;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod feed;
pub mod geo;
pub mod lifecycle;
pub mod logging;
pub mod pulse;
pub mod queue;
pub mod request;
pub mod seed;
pub mod storage;
pub mod submission;
pub mod triage;
pub mod verification;

pub use ai::{AiCollaborator, GeminiClient, MockCollaborator};
pub use app::{AppSettings, AppState, SharedState};
pub use auth::{AuthService, User, UserRole};
pub use config::Config;
pub use connectivity::Connectivity;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use request::{EmergencyType, RequestDraft, RequestStatus, SosRequest};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
