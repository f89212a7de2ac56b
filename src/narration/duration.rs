//! Spoken-duration measurement of produced clips.
//!
//! Reads container metadata with symphonia. Mp3 streams rarely carry a
//! frame count, so packet durations are summed when it is absent.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("cannot open audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode audio: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("no audio track")]
    NoTrack,

    #[error("audio has no time base")]
    UnknownTimeBase,

    #[error("measurement task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub trait DurationProbe: Send + Sync {
    /// Length of the audio file in seconds.
    fn duration(&self, path: &Path) -> Result<f64, MeasureError>;
}

pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration(&self, path: &Path) -> Result<f64, MeasureError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(MeasureError::NoTrack)?;
        let track_id = track.id;
        let n_frames = track.codec_params.n_frames;
        let time_base = track
            .codec_params
            .time_base
            .or_else(|| track.codec_params.sample_rate.map(|sr| TimeBase::new(1, sr)))
            .ok_or(MeasureError::UnknownTimeBase)?;

        if let Some(frames) = n_frames {
            return Ok(seconds(time_base.calc_time(frames)));
        }

        let mut ticks = 0u64;
        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == track_id {
                        ticks += packet.dur;
                    }
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(seconds(time_base.calc_time(ticks)))
    }
}

fn seconds(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit mono PCM wav of silence.
    fn wav_bytes(sample_rate: u32, frames: u32) -> Vec<u8> {
        let data_len = frames * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(44 + data_len as usize, 0);
        out
    }

    #[test]
    fn measures_pcm_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, wav_bytes(8000, 12_000)).unwrap();

        let secs = SymphoniaProbe.duration(&path).unwrap();
        assert!((secs - 1.5).abs() < 1e-6, "got {secs}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SymphoniaProbe.duration(&dir.path().join("0.mp3")).unwrap_err();
        assert!(matches!(err, MeasureError::Io(_)));
    }

    #[test]
    fn garbage_is_not_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.mp3");
        std::fs::write(&path, b"{\"error\": \"not audio\"}").unwrap();
        assert!(SymphoniaProbe.duration(&path).is_err());
    }
}
