//! Prompt rendering for every generation stage
//!
//! Rendering is pure string formatting: (stage, parameters) in,
//! [`RenderedPrompt`] out. Personalization inputs are shown to the model as
//! short previews; the full lists are never truncated anywhere else.

mod renderer;

pub use renderer::PromptRenderer;

/// History words shown in personalization previews.
pub const HISTORY_PREVIEW_LIMIT: usize = 5;
/// Interest topics shown in personalization previews.
pub const INTERESTS_PREVIEW_LIMIT: usize = 5;
/// Blocked titles shown in personalization previews.
pub const BLOCKED_PREVIEW_LIMIT: usize = 5;
/// Favorite words shown in personalization previews.
pub const FAVORITES_PREVIEW_LIMIT: usize = 10;
/// Candidates forwarded from recall into enrichment.
pub const MAX_CANDIDATES: usize = 5;

/// An instruction prompt plus optional system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl RenderedPrompt {
    pub fn new(system: Option<&str>, user: String) -> Self {
        Self {
            system: system.map(str::to_string),
            user,
        }
    }
}

/// Coarse proficiency bucket selecting a level note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    Beginner,
    Intermediate,
    Advanced,
    Unknown,
}

impl LevelBand {
    /// Bucket a free-form CEFR-ish hint ("A2", "B1+", "below A1 (Starter)").
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.trim().to_lowercase();

        if hint.is_empty() {
            return LevelBand::Unknown;
        }
        if hint.contains("starter") || hint.contains("below") || hint.starts_with("a1") || hint.starts_with("a2") {
            return LevelBand::Beginner;
        }
        if hint.starts_with("b1") || hint.starts_with("b2") {
            return LevelBand::Intermediate;
        }
        if hint.starts_with("c1") || hint.starts_with("c2") {
            return LevelBand::Advanced;
        }
        LevelBand::Unknown
    }
}

/// Join the first `limit` items with commas.
pub(crate) fn preview<S: AsRef<str>>(items: &[S], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
