//! Audio output using cpal
//!
//! Opens an output device and renders the shared [`Mixer`] from the device
//! callback. The mixer is created at the device's native rate and channel
//! count, so the mixer clock *is* the device clock.

use crate::audio::mixer::{CompletionDispatcher, Mixer};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    device_name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    mixer: Arc<Mutex<Mixer>>,
    /// Stream error flag - set by the error callback
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `buffer_size`: Optional buffer size in frames (None = device default)
    ///
    /// If the requested device is not found, falls back to the default device.
    pub fn open(device_name: Option<&str>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device config: {}", e)))?;
        let sample_format = supported.sample_format();
        let mut config: StreamConfig = supported.config();

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
        }

        info!(
            "Using audio device '{}': sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            device_name, config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        let mixer = Arc::new(Mutex::new(Mixer::new(config.sample_rate.0, config.channels)));

        Ok(Self {
            device,
            device_name,
            config,
            sample_format,
            stream: None,
            mixer,
            error_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Mixer rendered by this output
    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// True once the device reported a stream error
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::Relaxed)
    }

    /// Begin the audio stream
    ///
    /// Must be called from within a tokio runtime: completion callbacks are
    /// delivered by a task spawned here.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let dispatcher = CompletionDispatcher::spawn();

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(dispatcher)?,
            SampleFormat::I16 => self.build_stream::<i16>(dispatcher)?,
            SampleFormat::U16 => self.build_stream::<u16>(dispatcher)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        info!("Audio stream started on '{}'", self.device_name);
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop and release the audio stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause stream: {}", e);
            }
            info!("Audio stream stopped");
        }
    }

    fn build_stream<T>(&self, dispatcher: CompletionDispatcher) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mixer = Arc::clone(&self.mixer);
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch: Vec<f32> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    let completed = mixer.lock().render(&mut scratch);

                    for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample_(sample.clamp(-1.0, 1.0));
                    }

                    if !completed.is_empty() {
                        dispatcher.dispatch(completed);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build output stream: {}", e)))
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
