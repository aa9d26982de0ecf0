//! Agent turns, interaction logs, configuration and the application context
//! for the docent documentation assistant.

pub mod agent;
pub mod config;
pub mod context;
pub mod logs;
pub mod session;
pub mod transcript;

pub use agent::{Agent, AgentError, StreamUpdate, TurnOutcome, TurnStream};
pub use config::Config;
pub use context::AppContext;
pub use logs::{LogRecord, LogSource, LogStore, LogWriteError};
pub use session::{ChatSession, TurnReply};
pub use transcript::{ModelMessage, Part};
