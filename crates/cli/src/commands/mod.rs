//! Command handlers for the lexcase CLI.

pub mod analyze;
pub mod chat;
pub mod index;
pub mod media;
pub mod search;
pub mod stats;

pub use analyze::AnalyzeCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
pub use media::MediaCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;
