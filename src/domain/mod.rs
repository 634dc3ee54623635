//! Domain layer - Pure business logic.

pub mod dedup;
pub mod export;
pub mod known;
pub mod message;
pub mod priority;
pub mod report;
pub mod watch;

pub use dedup::{Deduplicated, Deduplicator};
pub use export::{ExportFormat, ExportRef, ParseError};
pub use known::KnownIdentifierSet;
pub use message::OutboundMessage;
pub use report::{FileStatus, InvocationReport, Stage};
pub use watch::{EntryKind, WatchEntry};
