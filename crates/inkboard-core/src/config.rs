//! Board tuning knobs.

use serde::{Deserialize, Serialize};

/// Interaction thresholds used by a [`Board`](crate::board::Board).
///
/// Any field missing from a JSON config keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Radius around the cursor used when picking a shape.
    pub hit_radius: f64,
    /// Drag selections smaller than this in either dimension are ignored.
    pub min_drag_size: f64,
    /// How many line-height steps to try when placing new text.
    pub text_placement_attempts: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            hit_radius: 10.0,
            min_drag_size: 4.0,
            text_placement_attempts: 200,
        }
    }
}

impl BoardConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = BoardConfig::from_json(r#"{"hit_radius": 4.5}"#).unwrap();
        assert_eq!(config.hit_radius, 4.5);
        assert_eq!(config.min_drag_size, 4.0);
        assert_eq!(config.text_placement_attempts, 200);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(BoardConfig::from_json(r#"{"min_drag_size": "big"}"#).is_err());
    }
}
