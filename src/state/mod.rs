//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the orchestrator's tier state machine (index, directories, details)
//! - `Tier`: which link tier a URL belongs to
//! - `SkipReason`: why a URL or page produced no output
//! - `DomainState`: per-host request spacing and request counting

mod crawl_phase;
mod domain_state;
mod skip_reason;

pub use crawl_phase::{CrawlPhase, Tier};
pub use domain_state::DomainState;
pub use skip_reason::SkipReason;
