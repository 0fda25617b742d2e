//! Common types shared across pinstore.
//!
//! - Configuration constants
//! - Error types
//! - Identifiers (PageId, FrameId, Rid)

pub mod config;
pub mod error;
mod ids;

pub use error::{Error, Result};
pub use ids::{FrameId, PageId, Rid};
