//! In-process Piper voices through ONNX Runtime.
//!
//! A voice is two files: the VITS model (`*.onnx`) and its JSON config
//! (`*.onnx.json`) carrying the sample rate, inference scales and the
//! symbol-to-id table. Inference is CPU-bound and runs on tokio's blocking
//! pool.
//!
//! Text is mapped to ids symbol by symbol through `phoneme_id_map`. Voices
//! trained on raw text work directly; for espeak-phoneme voices only the
//! characters present in the table are spoken.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use ort::session::{Session, SessionInputValue};
use ort::value::Tensor;
use serde::Deserialize;
use tracing::debug;

use super::{TtsBackend, TtsError, wav};

const BOS: &str = "^";
const EOS: &str = "$";
const PAD: &str = "_";

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default = "one")]
    pub num_speakers: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

fn one() -> u32 {
    1
}
fn default_noise_scale() -> f32 {
    0.667
}
fn default_length_scale() -> f32 {
    1.0
}
fn default_noise_w() -> f32 {
    0.8
}

impl VoiceConfig {
    pub fn from_json(raw: &str) -> Result<Self, TtsError> {
        serde_json::from_str(raw).map_err(|e| TtsError::Model(format!("invalid voice config: {e}")))
    }

    /// `^ s1 _ s2 _ … sN _ $`, lower-cased, skipping unknown symbols.
    pub fn phoneme_ids(&self, text: &str) -> Vec<i64> {
        let lookup = |symbol: &str| self.phoneme_id_map.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
        let pad = lookup(PAD);

        let mut ids = lookup(BOS).to_vec();
        ids.extend_from_slice(pad);

        let mut buf = [0u8; 4];
        for c in text.chars().flat_map(char::to_lowercase) {
            let symbol = lookup(&*c.encode_utf8(&mut buf));
            if symbol.is_empty() {
                continue;
            }
            ids.extend_from_slice(symbol);
            ids.extend_from_slice(pad);
        }

        ids.extend_from_slice(lookup(EOS));
        ids
    }
}

struct Voice {
    session: Mutex<Session>,
    config: VoiceConfig,
    model_path: PathBuf,
}

/// Piper voice loaded once at startup and shared by all requests.
#[derive(Clone)]
pub struct OnnxVoice {
    inner: Arc<Voice>,
}

impl fmt::Debug for OnnxVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxVoice")
            .field("model", &self.inner.model_path)
            .field("sample_rate", &self.inner.config.audio.sample_rate)
            .finish()
    }
}

fn model_err(e: impl fmt::Display) -> TtsError {
    TtsError::Model(e.to_string())
}

impl OnnxVoice {
    /// Load the voice config and model.
    ///
    /// ONNX Runtime is loaded dynamically the first time a session is built.
    /// A missing or broken runtime library can block or panic inside `ort`,
    /// so the session is built on its own thread and abandoned after
    /// `timeout`; either way the caller gets a [`TtsError::Model`].
    pub fn load(model: &Path, config: &Path, timeout: Duration) -> Result<Self, TtsError> {
        let raw = std::fs::read_to_string(config)?;
        let config = VoiceConfig::from_json(&raw)?;
        if !std::fs::metadata(model)?.is_file() {
            return Err(TtsError::Model(format!("{} is not a file", model.display())));
        }

        let session = build_session(model.to_path_buf(), timeout)?;

        Ok(Self {
            inner: Arc::new(Voice {
                session: Mutex::new(session),
                config,
                model_path: model.to_path_buf(),
            }),
        })
    }
}

fn build_session(model: PathBuf, timeout: Duration) -> Result<Session, TtsError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("onnx-voice-load".into())
        .spawn(move || {
            let result = Session::builder()
                .and_then(|mut builder| builder.commit_from_file(&model))
                .map_err(model_err);
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(TtsError::Model(format!(
            "ONNX Runtime did not load the voice within {timeout:?}"
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(TtsError::Model(
            "ONNX Runtime failed while loading the voice".into(),
        )),
    }
}

impl Voice {
    fn render(&self, text: &str, output: &Path) -> Result<(), TtsError> {
        let ids = self.config.phoneme_ids(text);
        // BOS + PAD + EOS alone carry nothing to say.
        if ids.len() <= 3 {
            return Err(TtsError::Model("no speakable symbols in text".into()));
        }
        let samples = self.infer(ids)?;
        debug!(samples = samples.len(), "voice inference finished");
        wav::write_pcm16(output, &samples, self.config.audio.sample_rate)
    }

    fn infer(&self, ids: Vec<i64>) -> Result<Vec<f32>, TtsError> {
        let len = ids.len();
        let scales = &self.config.inference;

        let mut inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![
            ("input".into(), Tensor::from_array(([1usize, len], ids)).map_err(model_err)?.into()),
            (
                "input_lengths".into(),
                Tensor::from_array(([1usize], vec![len as i64])).map_err(model_err)?.into(),
            ),
            (
                "scales".into(),
                Tensor::from_array((
                    [3usize],
                    vec![scales.noise_scale, scales.length_scale, scales.noise_w],
                ))
                .map_err(model_err)?
                .into(),
            ),
        ];
        if self.config.num_speakers > 1 {
            inputs.push(("sid".into(), Tensor::from_array(([1usize], vec![0_i64])).map_err(model_err)?.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| TtsError::Model("voice session lock poisoned".into()))?;
        let outputs = session.run(inputs).map_err(model_err)?;
        let (_, samples) = outputs[0].try_extract_tensor::<f32>().map_err(model_err)?;
        Ok(samples.to_vec())
    }
}

#[async_trait]
impl TtsBackend for OnnxVoice {
    fn name(&self) -> &'static str {
        "onnx"
    }

    async fn check(&self) -> Result<String, TtsError> {
        Ok(format!(
            "{} ({} Hz)",
            self.inner.model_path.display(),
            self.inner.config.audio.sample_rate
        ))
    }

    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), TtsError> {
        let voice = Arc::clone(&self.inner);
        let text = text.to_owned();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || voice.render(&text, &output))
            .await
            .map_err(|e| TtsError::Model(format!("synthesis worker failed: {e}")))?
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CONFIG: &str = r#"{
        "audio": { "sample_rate": 22050 },
        "inference": { "noise_scale": 0.5 },
        "phoneme_id_map": {
            "_": [0], "^": [1], "$": [2], " ": [3],
            "h": [20], "i": [21], "!": [4]
        }
    }"#;

    #[test]
    fn config_fills_inference_defaults() {
        let cfg = VoiceConfig::from_json(CONFIG).unwrap();
        assert_eq!(cfg.audio.sample_rate, 22_050);
        assert_eq!(cfg.inference.noise_scale, 0.5);
        assert_eq!(cfg.inference.length_scale, 1.0);
        assert_eq!(cfg.inference.noise_w, 0.8);
        assert_eq!(cfg.num_speakers, 1);
    }

    #[test]
    fn phoneme_ids_are_framed_and_padded() {
        let cfg = VoiceConfig::from_json(CONFIG).unwrap();
        assert_eq!(cfg.phoneme_ids("Hi!"), vec![1, 0, 20, 0, 21, 0, 4, 0, 2]);
    }

    #[test]
    fn unknown_symbols_are_skipped() {
        let cfg = VoiceConfig::from_json(CONFIG).unwrap();
        assert_eq!(cfg.phoneme_ids("h?i"), vec![1, 0, 20, 0, 21, 0, 2]);
        assert_eq!(cfg.phoneme_ids("???"), vec![1, 0, 2]);
    }

    #[test]
    fn malformed_config_is_model_error() {
        let err = VoiceConfig::from_json(r#"{ "audio": {} }"#).unwrap_err();
        assert!(matches!(err, TtsError::Model(_)));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = OnnxVoice::load(
            Path::new("/nonexistent/v.onnx"),
            Path::new("/nonexistent/v.onnx.json"),
            Duration::from_secs(2),
        )
        .unwrap_err();
        assert!(matches!(err, TtsError::Io(_)));
    }

    #[test]
    fn missing_model_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("v.onnx.json");
        std::fs::write(&config, CONFIG).unwrap();

        let err = OnnxVoice::load(&dir.path().join("v.onnx"), &config, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, TtsError::Io(_)), "got {err:?}");
    }

    #[test]
    fn garbage_model_fails_within_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let (model, config) = (dir.path().join("v.onnx"), dir.path().join("v.onnx.json"));
        std::fs::write(&model, b"not a model").unwrap();
        std::fs::write(&config, CONFIG).unwrap();

        let started = std::time::Instant::now();
        let err = OnnxVoice::load(&model, &config, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, TtsError::Model(_)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
