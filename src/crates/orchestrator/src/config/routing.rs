//! Per-stage model selection
//!
//! Each stage resolves its model through an override chain ending at the
//! global default, and may attach vendor reasoning parameters when enabled.

use serde_json::{json, Map, Value};

/// Logical call site used for model lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSlot {
    /// Word sense stream, interests, anything without its own override
    Default,
    /// Example contexts
    Layer2,
    /// Common mistakes
    Layer3,
    /// Related-word candidate recall
    Layer4Fast,
    /// Related-word enrichment and the personalized stream
    Layer4,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRouting {
    pub default_model: String,
    pub fast_model: Option<String>,
    pub layer3_model: Option<String>,
    pub layer4_fast_model: Option<String>,
    pub layer4_main_model: Option<String>,
    pub layer3_thinking: bool,
    pub layer4_thinking: bool,
}

impl ModelRouting {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            ..Default::default()
        }
    }

    pub fn model_for(&self, slot: ModelSlot) -> String {
        let chosen = match slot {
            ModelSlot::Default => None,
            ModelSlot::Layer2 => pick(&[&self.fast_model]),
            ModelSlot::Layer3 => pick(&[&self.layer3_model]),
            ModelSlot::Layer4Fast => pick(&[&self.layer4_fast_model, &self.fast_model]),
            ModelSlot::Layer4 => pick(&[&self.layer4_main_model]),
        };

        chosen.unwrap_or(&self.default_model).to_string()
    }

    /// Extra body parameters for the slot; empty unless thinking is enabled.
    pub fn reasoning_for(&self, slot: ModelSlot) -> Map<String, Value> {
        let enabled = match slot {
            ModelSlot::Layer3 => self.layer3_thinking,
            ModelSlot::Layer4 => self.layer4_thinking,
            _ => false,
        };

        let mut params = Map::new();
        if enabled {
            params.insert("reasoning".to_string(), json!({"effort": "medium"}));
        }
        params
    }
}

fn pick<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_falls_back_to_default() {
        let routing = ModelRouting::new("main/model");
        for slot in [
            ModelSlot::Default,
            ModelSlot::Layer2,
            ModelSlot::Layer3,
            ModelSlot::Layer4Fast,
            ModelSlot::Layer4,
        ] {
            assert_eq!(routing.model_for(slot), "main/model");
        }
    }

    #[test]
    fn test_override_chain() {
        let mut routing = ModelRouting::new("main");
        routing.fast_model = Some("fast".into());
        routing.layer4_main_model = Some("l4main".into());

        assert_eq!(routing.model_for(ModelSlot::Layer2), "fast");
        assert_eq!(routing.model_for(ModelSlot::Layer4Fast), "fast");
        assert_eq!(routing.model_for(ModelSlot::Layer4), "l4main");
        assert_eq!(routing.model_for(ModelSlot::Layer3), "main");

        routing.layer4_fast_model = Some("l4fast".into());
        assert_eq!(routing.model_for(ModelSlot::Layer4Fast), "l4fast");
    }

    #[test]
    fn test_blank_override_ignored() {
        let mut routing = ModelRouting::new("main");
        routing.fast_model = Some("  ".into());
        assert_eq!(routing.model_for(ModelSlot::Layer2), "main");
    }

    #[test]
    fn test_reasoning_only_for_layer3_and_layer4() {
        let mut routing = ModelRouting::new("main");
        assert!(routing.reasoning_for(ModelSlot::Layer3).is_empty());

        routing.layer3_thinking = true;
        routing.layer4_thinking = true;
        assert_eq!(routing.reasoning_for(ModelSlot::Layer3)["reasoning"]["effort"], "medium");
        assert!(routing.reasoning_for(ModelSlot::Layer4).contains_key("reasoning"));
        assert!(routing.reasoning_for(ModelSlot::Layer2).is_empty());
        assert!(routing.reasoning_for(ModelSlot::Layer4Fast).is_empty());
    }
}
