use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureConfig;
use crate::stt::SttConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_samples: usize,
    pub silence_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let defaults = CaptureConfig::default();
        Self {
            sample_rate: defaults.target_sample_rate,
            frame_samples: defaults.frame_samples,
            silence_threshold: defaults.silence_threshold,
        }
    }
}

impl Config {
    /// Load a TOML profile; the API key may come from the environment
    /// instead so credentials stay out of config files.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        if let Ok(key) = std::env::var("VOXSTREAM_API_KEY") {
            cfg.stt.api_key = key;
        }
        Ok(cfg)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            target_sample_rate: self.audio.sample_rate,
            frame_samples: self.audio.frame_samples,
            silence_threshold: self.audio.silence_threshold,
        }
    }
}
