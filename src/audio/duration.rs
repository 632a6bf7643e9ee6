//! Playback length of uploaded audio, computed by walking its frames

use std::{io::Read, time::Duration};

use symphonia::core::{
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, ReadOnlySource},
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;

use crate::{
    cancel::{Cancellation, Cancelled},
    domain::{format::SupportedFormat, track::PlaybackDuration},
};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to decode audio frames: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("stream contains no audio track")]
    NoAudioTrack,

    #[error("audio track does not declare a sample rate")]
    UnknownSampleRate,

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Computes the playback duration of an audio byte stream.
///
/// The stream is consumed. Callers own the underlying handle and release it afterwards.
pub trait DurationProbe: Send + Sync {
    fn probe<R>(
        &self,
        format: SupportedFormat,
        source: R,
        cancel: &Cancellation,
    ) -> Result<PlaybackDuration, ExtractionError>
    where
        R: Read + Send + Sync + 'static;
}

/// Decodes every frame of the stream and sums their lengths
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDurationProbe;

impl DurationProbe for FrameDurationProbe {
    fn probe<R>(
        &self,
        format: SupportedFormat,
        source: R,
        cancel: &Cancellation,
    ) -> Result<PlaybackDuration, ExtractionError>
    where
        R: Read + Send + Sync + 'static,
    {
        let duration = match format {
            SupportedFormat::Mp3 => mpeg_frames_duration(source, cancel)?,
        };
        Ok(PlaybackDuration::from(duration))
    }
}

/// Reads the stream as a sequence of MPEG audio frames.
///
/// A clean end of stream (including a trailing partial frame) ends the walk,
/// any other read or decode error aborts it.
fn mpeg_frames_duration<R>(source: R, cancel: &Cancellation) -> Result<Duration, ExtractionError>
where
    R: Read + Send + Sync + 'static,
{
    cancel.check()?;

    let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(source)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(SupportedFormat::Mp3.extension());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader.default_track().ok_or(ExtractionError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|rate| *rate > 0)
        .ok_or(ExtractionError::UnknownSampleRate)?;

    let mut samples: u64 = 0;
    let mut frames: u64 = 0;

    loop {
        cancel.check()?;

        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(ExtractionError::Decode(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        samples += packet.dur();
        frames += 1;
    }

    log::debug!("decoded {frames} frames, {samples} samples at {sample_rate} Hz");

    Ok(samples_to_duration(samples, sample_rate))
}

fn samples_to_duration(samples: u64, sample_rate: u32) -> Duration {
    let rate = u64::from(sample_rate);
    let secs = samples / rate;
    let nanos = (samples % rate) * 1_000_000_000 / rate;
    // nanos < 1e9 because the remainder is below rate
    Duration::new(secs, nanos as u32)
}

/// Synthetic MPEG-1 Layer III stream: mono, 48 kHz, 128 kbit/s.
///
/// Every frame is 384 bytes and holds 1152 samples, i.e. 24 ms of audio.
#[cfg(test)]
pub(crate) fn synthetic_mp3(frames: usize) -> Vec<u8> {
    const FRAME_LEN: usize = 384;
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x94, 0xC4];

    let mut bytes = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        bytes.extend_from_slice(&HEADER);
        bytes.resize(bytes.len() + FRAME_LEN - HEADER.len(), 0);
    }
    bytes
}
