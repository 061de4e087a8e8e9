//! Audio duration probing with symphonia.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported or corrupt audio: {0}")]
    Unsupported(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Audio track reports no sample rate")]
    ZeroSampleRate,
}

/// Whole seconds of audio in `path`, rounded down.
///
/// Decodes container headers and, when the container does not state the
/// frame count, walks the packets of the first audio track to total their
/// durations. Blocking; call it from `spawn_blocking`.
pub fn probe_duration(path: &Path) -> Result<i64, ProbeError> {
    let file = File::open(path).map_err(|source| ProbeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ProbeError::Unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(ProbeError::NoAudioTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = match params.sample_rate {
        Some(rate) if rate > 0 => u64::from(rate),
        _ => return Err(ProbeError::ZeroSampleRate),
    };

    // Rejects codecs we cannot decode even when the container parsed fine
    symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| ProbeError::Unsupported(e.to_string()))?;

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            loop {
                match format.next_packet() {
                    Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
                    Ok(_) => {}
                    Err(SymphoniaError::IoError(ref e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    Err(e) => return Err(ProbeError::Unsupported(e.to_string())),
                }
            }
            total
        }
    };

    tracing::debug!(
        path = %path.display(),
        frames,
        sample_rate,
        "Probed audio"
    );
    i64::try_from(frames / sample_rate)
        .map_err(|_| ProbeError::Unsupported("duration out of range".to_string()))
}

/// Async wrapper running [`probe_duration`] on the blocking pool.
pub async fn probe(path: PathBuf) -> Result<i64, ProbeError> {
    tokio::task::spawn_blocking(move || probe_duration(&path))
        .await
        .map_err(|e| ProbeError::Unsupported(format!("probe task failed: {e}")))?
}
