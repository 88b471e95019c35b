//! Speech synthesis for assistant replies.
//!
//! Every engine implements [`TtsBackend`]; which one a deployment uses is
//! decided once from [`TtsSettings`] by [`load_backend`]. [`SpeechService`]
//! wraps the chosen backend and owns everything engine-independent: text
//! cleaning, the output file name, artifact validation and the public URL.
//!
//! Synthesis is best-effort. [`SpeechService::speak`] never returns an error;
//! any failure is logged and reported as "no audio".

mod disabled;
#[cfg(feature = "onnx")]
mod onnx;
mod piper;
#[cfg(feature = "onnx")]
mod wav;

use std::fmt::{Debug, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum::{Display, EnumString};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

pub use disabled::DisabledTts;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxVoice, VoiceConfig};
pub use piper::PiperProcess;

/// URL prefix under which the audio directory is served.
pub const AUDIO_URL_PREFIX: &str = "/audio";

#[derive(Debug, Error)]
pub enum TtsError {
    /// The engine executable could not be found. Not fatal.
    #[error("speech engine `{0}` not found")]
    EngineMissing(String),

    #[error("speech synthesis is disabled")]
    Disabled,

    #[error("speech engine exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    #[error("speech engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("speech engine produced no playable audio at {}", .0.display())]
    InvalidOutput(PathBuf),

    #[error("voice model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A text-to-speech engine that renders text into a WAV file.
#[async_trait]
pub trait TtsBackend: Send + Sync + Debug {
    /// Short identifier reported by `/health` and in logs.
    fn name(&self) -> &'static str;

    /// Check that the engine can run, returning a human-readable description.
    async fn check(&self) -> Result<String, TtsError>;

    /// Render already-cleaned `text` into a WAV file at `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), TtsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// External `piper` command-line process.
    Piper,
    /// In-process Piper voice through ONNX Runtime.
    Onnx,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct TtsSettings {
    pub backend: BackendKind,
    pub piper_bin: String,
    pub piper_voice: String,
    pub piper_timeout: Duration,
    pub onnx_model: PathBuf,
    pub onnx_config: PathBuf,
    /// Upper bound on loading ONNX Runtime and the voice model.
    pub onnx_load_timeout: Duration,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Piper,
            piper_bin: "piper".into(),
            piper_voice: "en_US-lessac-medium".into(),
            piper_timeout: Duration::from_secs(30),
            onnx_model: PathBuf::from("voices/en_US-lessac-medium.onnx"),
            onnx_config: PathBuf::from("voices/en_US-lessac-medium.onnx.json"),
            onnx_load_timeout: Duration::from_secs(30),
        }
    }
}

/// Construct the configured backend.
///
/// A voice model that fails to load is reported here, at startup, and the
/// deployment continues with synthesis disabled.
pub fn load_backend(settings: &TtsSettings) -> Arc<dyn TtsBackend> {
    match settings.backend {
        BackendKind::Piper => Arc::new(PiperProcess::new(
            settings.piper_bin.clone(),
            settings.piper_voice.clone(),
            settings.piper_timeout,
        )),
        BackendKind::Disabled => Arc::new(DisabledTts),
        #[cfg(feature = "onnx")]
        BackendKind::Onnx => match OnnxVoice::load(
            &settings.onnx_model,
            &settings.onnx_config,
            settings.onnx_load_timeout,
        ) {
            Ok(voice) => {
                info!(model = %settings.onnx_model.display(), "ONNX voice loaded");
                Arc::new(voice)
            }
            Err(e) => {
                error!(
                    model = %settings.onnx_model.display(),
                    config = %settings.onnx_config.display(),
                    error = %e,
                    "failed to load ONNX voice; speech synthesis disabled"
                );
                Arc::new(DisabledTts)
            }
        },
        #[cfg(not(feature = "onnx"))]
        BackendKind::Onnx => {
            error!("built without the `onnx` feature; speech synthesis disabled");
            Arc::new(DisabledTts)
        }
    }
}

/// Best-effort reply-to-audio conversion shared by all backends.
#[derive(Debug, Clone)]
pub struct SpeechService {
    backend: Arc<dyn TtsBackend>,
    audio_dir: PathBuf,
}

impl SpeechService {
    pub fn new(backend: Arc<dyn TtsBackend>, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            audio_dir: audio_dir.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Run the backend's availability check and log the outcome.
    pub async fn check(&self) -> bool {
        match self.backend.check().await {
            Ok(detail) => {
                info!(backend = self.backend.name(), detail = %detail, "speech synthesis available");
                true
            }
            Err(TtsError::EngineMissing(program)) => {
                warn!(backend = self.backend.name(), program = %program, "speech engine not installed; replies will have no audio");
                false
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "speech synthesis unavailable");
                false
            }
        }
    }

    /// Synthesize `text` for `session_id`, returning the audio URL on success.
    ///
    /// The file name uses the length of `text` as given, before cleaning, so
    /// two replies of equal length in one session share a file and the later
    /// one overwrites the earlier.
    pub async fn speak(&self, text: &str, session_id: &str) -> Option<String> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            debug!(session_id = %session_id, "nothing to synthesize");
            return None;
        }

        let file_name = audio_file_name(session_id, text);
        let output = self.audio_dir.join(&file_name);

        let result = match self.backend.synthesize(&cleaned, &output).await {
            Ok(()) => validate_wav(&output).await,
            Err(e) => Err(e),
        };
        if let Err(TtsError::InvalidOutput(path)) = &result {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(file = %path.display(), error = %e, "could not remove invalid audio file");
                }
            }
        }

        match result {
            Ok(()) => {
                debug!(session_id = %session_id, file = %file_name, "speech synthesized");
                Some(format!("{AUDIO_URL_PREFIX}/{file_name}"))
            }
            Err(TtsError::Disabled) => None,
            Err(TtsError::EngineMissing(program)) => {
                info!(program = %program, "speech engine not found; TTS skipped");
                None
            }
            Err(e) => {
                warn!(backend = self.backend.name(), session_id = %session_id, error = %e, "speech synthesis failed");
                None
            }
        }
    }
}

/// Flatten text to a single line with no double quotes.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '"' => '\'',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

/// `speech_{session}_{chars}.wav`, with the session id escaped so it is a
/// safe single path component.
///
/// ASCII letters, digits and `_` are kept; every other byte, `-` included,
/// becomes `-XX` in upper-case hex. `-` only ever starts an escape, so
/// distinct session ids never share a name.
pub fn audio_file_name(session_id: &str, text: &str) -> String {
    let mut session = String::with_capacity(session_id.len());
    for b in session_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            session.push(char::from(b));
        } else {
            let _ = write!(session, "-{b:02X}");
        }
    }
    format!("speech_{session}_{}.wav", text.chars().count())
}

/// Require a RIFF/WAVE header rather than trusting the engine's exit status.
async fn validate_wav(path: &Path) -> Result<(), TtsError> {
    let invalid = || TtsError::InvalidOutput(path.to_path_buf());

    let mut file = tokio::fs::File::open(path).await.map_err(|_| invalid())?;
    let mut header = [0u8; 12];
    file.read_exact(&mut header).await.map_err(|_| invalid())?;

    if &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE" {
        Ok(())
    } else {
        Err(invalid())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
