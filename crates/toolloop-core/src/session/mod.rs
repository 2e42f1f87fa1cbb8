//! Session module - conversation state and the generation loop
//!
//! - `Session`/`Message`: the conversation record
//! - `SessionStore`: persistence (`FileSessionStore`, `MemorySessionStore`)
//! - `ConversationManager`: current session, cache, search and statistics
//! - `AgentLoop`: the generation-retry-tool-dispatch loop
//!
//! # Flow
//!
//! ```text
//! Agent::submit ──▶ ConversationManager::append(user)
//!                      │
//!                      ▼
//!                  AgentLoop::run ──▶ MessageNormalizer
//!                      │   ▲              │
//!                      │   └── tool results ◀── ToolRegistry::dispatch_all
//!                      ▼
//!                  ModelGateway::generate (retry + backoff)
//!                      │
//!                      ▼
//!              ConversationManager::append(assistant) ──▶ SessionStore::save
//! ```

mod agent_loop;
mod export;
mod manager;
mod persistence;
mod types;

pub use agent_loop::{AgentLoop, LoopOutcome, LoopSettings, FALLBACK_RESPONSE};
pub use export::{export_session, ExportFormat};
pub use manager::{ConversationManager, SearchHit, SessionStatistics, DEFAULT_SEARCH_LIMIT};
pub use persistence::{default_sessions_dir, FileSessionStore, MemorySessionStore, SessionStore};
pub use types::{ContentPart, Message, Role, Session};
