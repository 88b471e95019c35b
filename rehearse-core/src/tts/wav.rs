use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::TtsError;

/// Write mono f32 samples as 16-bit PCM, peak-normalised to full scale.
pub(crate) fn write_pcm16(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), TtsError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // Floor keeps near-silent output from being amplified into noise.
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs())).max(0.01);
    let gain = i16::MAX as f32 / peak;

    let wav_err = |e: hound::Error| TtsError::Model(format!("failed to write WAV: {e}"));
    let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;
    for &sample in samples {
        let scaled = (sample * gain).clamp(i16::MIN as f32, i16::MAX as f32);
        writer.write_sample(scaled as i16).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;
    Ok(())
}
