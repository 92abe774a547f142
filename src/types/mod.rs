//! Type definitions for visitlift

mod analytics;
mod error;
mod visit;

pub use analytics::*;
pub use error::*;
pub use visit::*;
