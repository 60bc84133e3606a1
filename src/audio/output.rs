use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::mixer::Mixer;
use crate::error::{AudioError, AudioResult};

/// Default output device driving a `Mixer` from the cpal callback.
pub struct AudioOutput {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioOutput {
    /// `build` receives the device sample rate and returns the mixer to move
    /// into the callback.
    pub fn open<F>(build: F) -> AudioResult<Self>
    where
        F: FnOnce(u32) -> Mixer,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        info!("Audio Output Device: {}", device.name().unwrap_or_default());

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        info!("Audio Config Selected: Rate={}Hz, Channels={}", sample_rate, channels);

        let mut mixer = build(sample_rate);
        let err_fn = |err| error!("an error occurred on output stream: {}", err);
        let ch = channels as usize;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &_| mixer.render(data, ch),
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config.into(),
                    move |data: &mut [i16], _: &_| {
                        scratch.resize(data.len(), 0.0);
                        mixer.render(&mut scratch, ch);
                        write_output_i16(&scratch, data);
                    },
                    err_fn,
                    None,
                )
            }
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream.play().map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }
}

fn write_output_i16(input: &[f32], output: &mut [i16]) {
    for (o, &s) in output.iter_mut().zip(input) {
        *o = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    }
}
