use crate::Result;
use camera_session::Frame;

pub trait SceneDescriber {
    /// Short name for logs and banners.
    fn name(&self) -> &str;

    /// Describe `frame` in natural language, guided by `prompt`.
    fn describe(&mut self, frame: &Frame, prompt: &str) -> Result<String>;
}
