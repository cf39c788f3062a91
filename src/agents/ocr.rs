//! Subprocess-based OCR engine
//!
//! The extraction algorithm itself lives outside this crate: a configured
//! command is spawned per image and must print a JSON array of elements
//! (`[{"text": ..., "confidence": ..., "region": [x, y, w, h]}, ...]`)
//! on stdout.

use crate::agents::{AgentError, OcrEngine};
use crate::core::config::OcrConfig;
use crate::core::outputs::{ExtractionOutput, OcrElement};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// OCR engine that shells out to an external extraction command.
#[derive(Debug, Clone)]
pub struct CommandOcrEngine {
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl CommandOcrEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    fn parse_output(&self, stdout: &[u8]) -> Result<Vec<OcrElement>, AgentError> {
        serde_json::from_slice(stdout)
            .map_err(|e| AgentError::MalformedResponse(format!("OCR output: {e}")))
    }
}

#[async_trait]
impl OcrEngine for CommandOcrEngine {
    async fn extract(&self, image: &Path) -> Result<ExtractionOutput, AgentError> {
        if !image.exists() {
            return Err(AgentError::Input(format!(
                "image file not found: {}",
                image.display()
            )));
        }

        debug!(command = %self.command, image = %image.display(), "spawning OCR command");
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(image).kill_on_drop(true);

        let output = timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| AgentError::Timeout(self.timeout_secs))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Input(format!(
                "OCR command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let elements = self.parse_output(&output.stdout)?;
        Ok(ExtractionOutput::from_elements(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CommandOcrEngine {
        CommandOcrEngine::new(&OcrConfig::default())
    }

    #[test]
    fn test_parse_elements() {
        let raw = br#"[
            {"text": "Hello", "confidence": 0.9, "region": [0, 0, 40, 12]},
            {"text": "World", "confidence": 0.8}
        ]"#;
        let elements = engine().parse_output(raw).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text, "Hello");
        assert_eq!(elements[0].region, Some([0.0, 0.0, 40.0, 12.0]));
        assert_eq!(elements[1].region, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            engine().parse_output(b"not json"),
            Err(AgentError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_image_is_input_error() {
        let err = engine()
            .extract(Path::new("/nonexistent/img.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Input(_)));
    }
}
