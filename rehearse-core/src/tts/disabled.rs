use std::path::Path;

use async_trait::async_trait;

use super::{TtsBackend, TtsError};

/// Backend used when synthesis is switched off or failed to initialise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTts;

#[async_trait]
impl TtsBackend for DisabledTts {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn check(&self) -> Result<String, TtsError> {
        Err(TtsError::Disabled)
    }

    async fn synthesize(&self, _text: &str, _output: &Path) -> Result<(), TtsError> {
        Err(TtsError::Disabled)
    }
}
