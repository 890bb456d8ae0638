use crate::{DescriberConfig, DescriberKind, HeuristicDescriber, Result, SceneDescriber};
use camera_session::probe::Availability;

/// Whether the configured inference endpoint can serve requests right now.
pub fn probe_inference(config: &DescriberConfig) -> Availability {
    #[cfg(feature = "vlm-http")]
    {
        match crate::vlm_http::check_health(config) {
            Ok(()) => Availability::Available,
            Err(e) => Availability::Missing(e.to_string()),
        }
    }
    #[cfg(not(feature = "vlm-http"))]
    {
        let _ = config;
        Availability::Missing("vlm-http feature not enabled at compile time".into())
    }
}

/// Mock mode when requested or when the model cannot be reached.
pub fn select_kind(force_mock: bool, inference: &Availability) -> DescriberKind {
    if force_mock || !inference.is_available() {
        DescriberKind::Heuristic
    } else {
        DescriberKind::VlmHttp
    }
}

pub fn new_describer(config: &DescriberConfig) -> Result<Box<dyn SceneDescriber>> {
    match config.kind {
        DescriberKind::Heuristic => Ok(Box::new(HeuristicDescriber::new())),
        DescriberKind::VlmHttp => {
            #[cfg(feature = "vlm-http")]
            {
                tracing::info!(model = %config.model, endpoint = %config.endpoint, "using VLM describer");
                crate::VlmHttpDescriber::new(config).map(|d| Box::new(d) as Box<dyn SceneDescriber>)
            }
            #[cfg(not(feature = "vlm-http"))]
            {
                Err(crate::Error::Unavailable(
                    "vlm-http feature not enabled".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_kind() {
        let up = Availability::Available;
        let down = Availability::Missing("connection refused".into());
        assert_eq!(select_kind(false, &up), DescriberKind::VlmHttp);
        assert_eq!(select_kind(true, &up), DescriberKind::Heuristic);
        assert_eq!(select_kind(false, &down), DescriberKind::Heuristic);
    }

    #[test]
    fn test_heuristic_factory() {
        let cfg = DescriberConfig {
            kind: DescriberKind::Heuristic,
            ..DescriberConfig::default()
        };
        let d = new_describer(&cfg).unwrap();
        assert_eq!(d.name(), "heuristic");
    }

    #[cfg(not(feature = "vlm-http"))]
    #[test]
    fn test_vlm_without_feature() {
        let cfg = DescriberConfig::default();
        assert!(new_describer(&cfg).is_err());
        assert!(!probe_inference(&cfg).is_available());
    }
}
