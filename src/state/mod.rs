//! State module for crawl work items
//!
//! # Components
//!
//! - `StageLabel`: which handler a request is routed to
//! - `Request`: a URL with its stage, priority and attempt counter
//! - `Priority`: normal or forefront queue placement

mod request;
mod stage;

// Re-export main types
pub use request::{Priority, Request};
pub use stage::StageLabel;
