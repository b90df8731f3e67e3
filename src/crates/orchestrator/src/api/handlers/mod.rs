//! API request handlers
//!
//! Provides handler functions for all API endpoints organized by resource.

pub mod analyze;
pub mod health;
pub mod interests;
pub mod lexical_map;
pub mod pronunciation;

pub use analyze::{analyze_mistakes, analyze_word};
pub use health::{health, root};
pub use interests::summarize_interests_from_usage;
pub use lexical_map::{generate_lexical_image, generate_lexical_map_text};
pub use pronunciation::get_pronunciation;
