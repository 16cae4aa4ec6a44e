use crate::db::MediaKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::debug;

/// How long a duration probe may take before the import gives up on it
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Unrecognised media: {0}")]
    Unrecognised(String),
    #[error("No duration information")]
    NoDuration,
    #[error("Probe task failed: {0}")]
    Task(String),
}

/// Media handed to a probe
#[derive(Clone)]
pub struct ProbeInput {
    pub data: Arc<[u8]>,
    pub kind: MediaKind,
    /// Lowercased file extension, used as a format hint
    pub extension: Option<String>,
}

/// Something that can read the playback duration of media bytes
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration in seconds
    async fn probe_duration(&self, input: &ProbeInput) -> Result<f64, ProbeError>;
}

/// Probes containers with symphonia on the blocking pool
#[derive(Debug, Clone, Default)]
pub struct SymphoniaProbe;

#[async_trait]
impl MediaProbe for SymphoniaProbe {
    async fn probe_duration(&self, input: &ProbeInput) -> Result<f64, ProbeError> {
        let data = input.data.clone();
        let extension = input.extension.clone();
        tokio::task::spawn_blocking(move || probe_blocking(data, extension.as_deref()))
            .await
            .map_err(|e| ProbeError::Task(e.to_string()))?
    }
}

fn probe_blocking(data: Arc<[u8]>, extension: Option<&str>) -> Result<f64, ProbeError> {
    let cursor = std::io::Cursor::new(data);
    let source = MediaSourceStream::new(Box::new(cursor), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ProbeError::Unrecognised(e.to_string()))?;

    // Longest track wins; video containers may expose several streams
    probed
        .format
        .tracks()
        .iter()
        .filter_map(|track| {
            let params = &track.codec_params;
            let frames = params.n_frames?;
            if let Some(time_base) = params.time_base {
                let time = time_base.calc_time(frames);
                Some(time.seconds as f64 + time.frac)
            } else {
                params.sample_rate.map(|rate| frames as f64 / rate as f64)
            }
        })
        .fold(None, |longest: Option<f64>, d| Some(longest.map_or(d, |l| l.max(d))))
        .ok_or(ProbeError::NoDuration)
}

/// Read a duration, giving up after `timeout`
///
/// Never fails: unreadable media, a probe error and a timeout all yield 0.
pub async fn extract_duration(
    probe: &dyn MediaProbe,
    input: &ProbeInput,
    timeout: Duration,
) -> f64 {
    match tokio::time::timeout(timeout, probe.probe_duration(input)).await {
        Ok(Ok(duration)) if duration.is_finite() && duration >= 0.0 => duration,
        Ok(Ok(duration)) => {
            debug!("Ignoring invalid duration {}", duration);
            0.0
        }
        Ok(Err(e)) => {
            debug!("Duration probe failed: {}", e);
            0.0
        }
        Err(_) => {
            debug!("Duration probe timed out after {:?}", timeout);
            0.0
        }
    }
}
