//! Peripheral services used by the HTTP layer

pub mod pronunciation;

pub use pronunciation::{
    PronunciationCache, PronunciationError, PronunciationService, DEFAULT_DICTIONARY_URL,
};
