//! scene-describe: one `describe(frame)` capability, two implementations
//!
//! [`HeuristicDescriber`] classifies brightness and edge density locally and
//! is always available. The `vlm-http` feature adds [`VlmHttpDescriber`],
//! which forwards frames to a running vision-language inference endpoint.
//! Which one is used is decided once, from a [`DescriberConfig`] and the
//! result of [`probe_inference`].

mod types;
pub use types::{Complexity, DescriberConfig, DescriberKind, LightLevel, SceneStats};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::SceneDescriber;

mod heuristic;
pub use heuristic::HeuristicDescriber;

#[cfg(feature = "vlm-http")]
mod vlm_http;
#[cfg(feature = "vlm-http")]
pub use vlm_http::VlmHttpDescriber;

pub mod plugin;
pub use plugin::{new_describer, probe_inference, select_kind};
