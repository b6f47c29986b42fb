use std::io::ErrorKind;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ProbeError;

use super::source::SourceBytes;

/// Determine the duration (seconds) of encoded audio held in memory.
///
/// Uses the frame count from the container header when present and falls back
/// to summing packet durations otherwise (VBR mp3 without a Xing header, some
/// webm files).
pub fn probe_duration(source: &SourceBytes, extension: Option<&str>) -> Result<f64, ProbeError> {
    let mss = MediaSourceStream::new(Box::new(source.reader()), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(ProbeError::Format)?;
    let mut format = probed.format;

    // Find the first audio track with a known (decodable) codec
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(ProbeError::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(n_frames), Some(time_base)) = (params.n_frames, params.time_base) {
        let time = time_base.calc_time(n_frames);
        return Ok(time.seconds as f64 + time.frac);
    }

    let sample_rate = params.sample_rate.ok_or(ProbeError::UnknownSampleRate)?;
    if let Some(n_frames) = params.n_frames {
        return Ok(n_frames as f64 / f64::from(sample_rate));
    }

    let mut total: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(ProbeError::Format(err)),
        }
    }

    let seconds = match params.time_base {
        Some(time_base) => {
            let time = time_base.calc_time(total);
            time.seconds as f64 + time.frac
        }
        None => total as f64 / f64::from(sample_rate),
    };
    tracing::debug!("Probed duration by packet scan: {:.3}s", seconds);
    Ok(seconds)
}
