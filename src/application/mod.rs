//! Application layer - Generic services that use ports.

pub mod fetcher;
pub mod pipeline;
pub mod publisher;

pub use pipeline::{IngestRequest, IngestService};
