//! Microphone sound level as a stand-in for the micro:bit `s` channel
//!
//! The capture callback computes the RMS of each buffer and stores it, scaled
//! onto the micro:bit's 0-255 sound range, in an atomic the frame loop reads.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Top of the micro:bit `sound_level()` range
pub const MAX_LEVEL: f32 = 255.0;

/// Redirects stderr to /dev/null while ALSA enumerates devices, restoring it
/// on drop. ALSA prints straight to fd 2 and would corrupt the screen.
struct StderrSuppressor {
    saved_fd: i32,
    _dev_null: File,
}

impl StderrSuppressor {
    fn new() -> Option<Self> {
        let dev_null = File::open("/dev/null").ok()?;
        let saved_fd = unsafe { libc::dup(2) };
        if saved_fd < 0 {
            return None;
        }
        if unsafe { libc::dup2(dev_null.as_raw_fd(), 2) } < 0 {
            unsafe {
                libc::close(saved_fd);
            }
            return None;
        }
        Some(Self { saved_fd, _dev_null: dev_null })
    }
}

impl Drop for StderrSuppressor {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved_fd, 2);
            libc::close(self.saved_fd);
        }
    }
}

/// Map a buffer of samples to a 0-255 level
pub fn level_from_samples(samples: &[f32], gain: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    (mean_sq.sqrt() * gain).clamp(0.0, MAX_LEVEL)
}

pub struct MicProxy {
    level: Arc<AtomicU32>,
    _stream: cpal::Stream,
}

impl MicProxy {
    /// Open the default input device and start capturing
    pub fn start(gain: f32) -> Result<Self> {
        let stderr_guard = StderrSuppressor::new();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| Error::Audio(format!("no supported config: {e}")))?;

        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let level = Arc::new(AtomicU32::new(0));
        let callback_level = Arc::clone(&level);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let l = level_from_samples(data, gain);
                    callback_level.store(l.to_bits(), Ordering::Relaxed);
                },
                |err| tracing::warn!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| Error::Audio(format!("build stream: {e}")))?;
        stream
            .play()
            .map_err(|e| Error::Audio(format!("start stream: {e}")))?;

        drop(stderr_guard);
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            "microphone capture started"
        );
        Ok(Self { level, _stream: stream })
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }
}
