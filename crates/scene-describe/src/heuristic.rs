use crate::{Complexity, Error, LightLevel, Result, SceneDescriber, SceneStats};
use camera_session::Frame;
use image::GrayImage;
use imageproc::edges::canny;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Brightness and edge-density classifier. Ignores the prompt.
#[derive(Debug, Default, Clone)]
pub struct HeuristicDescriber;

impl HeuristicDescriber {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, frame: &Frame) -> Result<SceneStats> {
        let luma = frame.gray_luma();
        let pixels = frame.width as usize * frame.height as usize;
        if pixels == 0 || luma.len() < pixels {
            return Err(Error::InvalidFrame(format!(
                "{}x{} frame with {} luma bytes",
                frame.width,
                frame.height,
                luma.len()
            )));
        }

        let brightness = luma[..pixels].iter().map(|&v| f64::from(v)).sum::<f64>() / pixels as f64;

        let gray = GrayImage::from_raw(frame.width, frame.height, luma[..pixels].to_vec())
            .ok_or_else(|| Error::InvalidFrame("luma buffer does not match geometry".into()))?;
        let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
        let edge_pixels = edges.as_raw().iter().filter(|&&v| v > 0).count();
        let edge_density = edge_pixels as f64 / pixels as f64;

        Ok(SceneStats {
            brightness,
            edge_density,
            light: LightLevel::from_brightness(brightness),
            complexity: Complexity::from_edge_density(edge_density),
        })
    }
}

impl SceneDescriber for HeuristicDescriber {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn describe(&mut self, frame: &Frame, _prompt: &str) -> Result<String> {
        let stats = self.analyze(frame)?;
        tracing::debug!(
            brightness = stats.brightness,
            edge_density = stats.edge_density,
            "heuristic scene analysis"
        );
        Ok(stats.sentence())
    }
}
