//! # Microphone Capture Module
//!
//! This module handles real-time vocal capture using CPAL (Cross-Platform
//! Audio Library). It selects an input device, opens a mono float stream,
//! and forwards fixed-size frames to the detection worker over a channel.
//!
//! ## Features
//! - Automatic input device selection
//! - Mono f32 configuration closest to the preferred rate
//! - Fixed-size framing independent of the device's callback granularity
//! - Non-fatal failure: a missing device disables pitch tracking only

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Number of samples per detection frame.
///
/// Larger frames see more signal periods but add latency; 2048 samples is
/// roughly 46 ms at 44.1 kHz, short enough that the score tracks the singer
/// in real time.
pub const FRAME_SIZE: usize = 2048;

/// Capture rate the engine prefers when the device supports it.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Starts vocal capture from the default input device.
///
/// The stream callback accumulates incoming samples and sends complete
/// [`FRAME_SIZE`] frames down `sender`. The actual sample rate is returned
/// alongside the stream handle so the detector can interpret lags correctly;
/// it equals [`TARGET_SAMPLE_RATE`] clamped into the device's supported
/// range.
///
/// # Arguments
/// * `sender` - Channel sender for streaming frames to the detection worker
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Live stream handle and its sample rate
/// * `Err(e)` - No device, no usable mono f32 config, or stream start failed
pub fn start_capture(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;

    log::info!("using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("no suitable mono f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported.min_sample_rate().0,
        supported.max_sample_rate().0,
    );
    let config = supported.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    log::info!("capture sample rate: {} Hz", sample_rate);

    let err_fn = |err| log::error!("audio stream error: {}", err);

    // Accumulates callback data until a full frame is available.
    let mut pending = Vec::with_capacity(FRAME_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);

            while pending.len() >= FRAME_SIZE {
                let frame = pending[..FRAME_SIZE].to_vec();

                // Ignore send errors; the worker side may already be gone.
                let _ = sender.try_send(frame);

                pending.drain(..FRAME_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Finds the supported input configuration closest to the target rate among
/// mono f32 configs.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires audio hardware
    fn capture_starts_on_default_device() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let result = start_capture(tx);
        assert!(result.is_ok());
    }
}
