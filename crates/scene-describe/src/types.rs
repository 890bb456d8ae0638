use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriberKind {
    /// Local brightness/edge heuristic.
    #[default]
    Heuristic,
    /// Remote vision-language model over HTTP.
    VlmHttp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriberConfig {
    pub kind: DescriberKind,
    /// Model name forwarded to the inference server.
    pub model: String,
    /// Base URL of the inference server.
    pub endpoint: String,
    pub max_tokens: u32,
    /// Per-request timeout; `None` waits for the server.
    pub timeout_s: Option<f64>,
}

impl Default for DescriberConfig {
    fn default() -> Self {
        Self {
            kind: DescriberKind::VlmHttp,
            model: "VILA-1.5-3B".to_string(),
            endpoint: "http://127.0.0.1:8080".to_string(),
            max_tokens: 100,
            timeout_s: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightLevel {
    Dark,
    ModeratelyLit,
    Bright,
}

impl LightLevel {
    pub fn from_brightness(mean: f64) -> Self {
        if mean < 50.0 {
            LightLevel::Dark
        } else if mean < 150.0 {
            LightLevel::ModeratelyLit
        } else {
            LightLevel::Bright
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LightLevel::Dark => "dark",
            LightLevel::ModeratelyLit => "moderately lit",
            LightLevel::Bright => "bright",
        }
    }
}

impl fmt::Display for LightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn from_edge_density(density: f64) -> Self {
        if density < 0.1 {
            Complexity::Simple
        } else if density < 0.3 {
            Complexity::Moderate
        } else {
            Complexity::Complex
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Simple => "simple scene with few details",
            Complexity::Moderate => "moderate complexity",
            Complexity::Complex => "complex scene with many details",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numbers behind a heuristic description.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SceneStats {
    /// Mean luma, 0..=255.
    pub brightness: f64,
    /// Fraction of pixels marked as edges, 0..=1.
    pub edge_density: f64,
    pub light: LightLevel,
    pub complexity: Complexity,
}

impl SceneStats {
    pub fn sentence(&self) -> String {
        format!("I see a {} scene with {}.", self.light, self.complexity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_thresholds() {
        assert_eq!(LightLevel::from_brightness(0.0), LightLevel::Dark);
        assert_eq!(LightLevel::from_brightness(49.9), LightLevel::Dark);
        assert_eq!(LightLevel::from_brightness(50.0), LightLevel::ModeratelyLit);
        assert_eq!(LightLevel::from_brightness(149.9), LightLevel::ModeratelyLit);
        assert_eq!(LightLevel::from_brightness(150.0), LightLevel::Bright);
    }

    #[test]
    fn test_complexity_thresholds() {
        assert_eq!(Complexity::from_edge_density(0.0), Complexity::Simple);
        assert_eq!(Complexity::from_edge_density(0.1), Complexity::Moderate);
        assert_eq!(Complexity::from_edge_density(0.29), Complexity::Moderate);
        assert_eq!(Complexity::from_edge_density(0.3), Complexity::Complex);
    }

    #[test]
    fn test_sentence() {
        let stats = SceneStats {
            brightness: 200.0,
            edge_density: 0.5,
            light: LightLevel::Bright,
            complexity: Complexity::Complex,
        };
        assert_eq!(
            stats.sentence(),
            "I see a bright scene with complex scene with many details."
        );
    }

    #[test]
    fn test_config_yaml() {
        let cfg: DescriberConfig =
            serde_yaml::from_str("kind: heuristic\nmax_tokens: 64\n").unwrap();
        assert_eq!(cfg.kind, DescriberKind::Heuristic);
        assert_eq!(cfg.max_tokens, 64);
        assert_eq!(cfg.model, "VILA-1.5-3B");
        assert_eq!(cfg.timeout_s, None);
    }
}
