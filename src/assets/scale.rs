use serde::{Deserialize, Serialize};

/// `scale` applies when the model path contains `contains`. First match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRule {
    pub contains: String,
    pub scale: f32,
}

impl ScaleRule {
    pub fn new(contains: &str, scale: f32) -> Self {
        Self {
            contains: contains.to_string(),
            scale,
        }
    }
}

const FALLBACK_SCALE: f32 = 0.1;

/// A zero, negative or non-finite scale would make the object matrix
/// singular.
pub fn is_usable_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Static per-model uniform scale. Not derived from geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTable {
    default_scale: f32,
    rules: Vec<ScaleRule>,
}

impl ScaleTable {
    /// Unusable scales are dropped with a warning: a bad rule never matches
    /// and a bad default becomes 0.1.
    pub fn new(default_scale: f32, rules: Vec<ScaleRule>) -> Self {
        let default_scale = if is_usable_scale(default_scale) {
            default_scale
        } else {
            log::warn!(
                "Ignoring default scale {}; using {}",
                default_scale,
                FALLBACK_SCALE
            );
            FALLBACK_SCALE
        };
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let usable = is_usable_scale(rule.scale);
                if !usable {
                    log::warn!("Ignoring scale rule '{}': scale {}", rule.contains, rule.scale);
                }
                usable
            })
            .collect();
        Self {
            default_scale,
            rules,
        }
    }

    pub fn default_rules() -> Vec<ScaleRule> {
        vec![
            ScaleRule::new("bruschetta", 0.2),
            ScaleRule::new("Cibo", 0.2),
            ScaleRule::new("Margherita", 0.5),
            ScaleRule::new("Carbonara", 0.4),
        ]
    }

    pub fn scale_for(&self, path: &str) -> f32 {
        self.rules
            .iter()
            .find(|rule| !rule.contains.is_empty() && path.contains(rule.contains.as_str()))
            .map(|rule| rule.scale)
            .unwrap_or(self.default_scale)
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::new(FALLBACK_SCALE, Self::default_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_rules_and_fallback() {
        let table = ScaleTable::default();
        assert_eq!(table.scale_for("asset/Pizza_Margherita.glb"), 0.5);
        assert_eq!(table.scale_for("asset/bruschetta_v2.glb"), 0.2);
        assert_eq!(table.scale_for("asset/Carbonara.glb"), 0.4);
        assert_eq!(table.scale_for("asset/tiramisu.glb"), 0.1);
    }

    #[test]
    fn first_rule_wins() {
        let table = ScaleTable::new(
            1.0,
            vec![ScaleRule::new("pizza", 2.0), ScaleRule::new("pizza_big", 3.0)],
        );
        assert_eq!(table.scale_for("pizza_big.glb"), 2.0);
    }

    #[test]
    fn unusable_scales_are_dropped() {
        let table = ScaleTable::new(
            0.0,
            vec![
                ScaleRule::new("flat", 0.0),
                ScaleRule::new("flat", -2.0),
                ScaleRule::new("flat", f32::NAN),
                ScaleRule::new("flat_ok", 0.3),
            ],
        );
        assert_eq!(table.scale_for("flat.glb"), 0.1);
        assert_eq!(table.scale_for("flat_ok.glb"), 0.3);
        assert_eq!(table.scale_for("other.glb"), 0.1);
    }

    #[test]
    fn empty_pattern_never_matches() {
        let table = ScaleTable::new(0.3, vec![ScaleRule::new("", 9.0)]);
        assert_eq!(table.scale_for("anything.glb"), 0.3);
    }
}
