//! Configuration for the LexiLens service
//!
//! - [`Settings`]: TOML file plus environment overrides
//! - [`ModelRouting`]: per-stage model selection and reasoning parameters

pub mod routing;
pub mod settings;

pub use routing::{ModelRouting, ModelSlot};
pub use settings::{
    GenerationSettings, LookupSettings, OpenRouterSettings, ServerSettings, Settings,
    SettingsError,
};
