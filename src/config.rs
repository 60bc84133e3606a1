//! Engine configuration, loaded once at startup from JSON.
//!
//! Every section falls back to its defaults, so a config file only needs the
//! keys it wants to change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kernel::technique::TechniqueSpec;
use crate::kernel::time::TICK_MS;

pub const CONFIG_ENV: &str = "BREATHWORK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_ms: u64,
    pub session: SessionConfig,
    pub audio: AudioConfig,
    pub cues: CueConfig,
    pub guide: GuideConfig,
    pub guided_track: PathBuf,
    pub techniques: Vec<TechniqueSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            cues: CueConfig::default(),
            guide: GuideConfig::default(),
            guided_track: PathBuf::from("assets/audio/guided-meditation.wav"),
            techniques: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Explicit path, then `BREATHWORK_CONFIG`, then defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(p) => Self::load(Path::new(&p)),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions at or under this many seconds produce no summary.
    pub min_summary_secs: f64,
    pub milestone_every: u64,
    pub milestone_display_secs: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_summary_secs: 10.0,
            milestone_every: 5,
            milestone_display_secs: 3.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Fade applied when a voice is stopped before its natural end.
    pub voice_fade_secs: f64,
    pub drone_hz: f64,
    pub drone_detune_hz: f64,
    pub drone_gain: f32,
    pub drone_ramp_secs: f64,
    pub noise_gain: f32,
    pub noise_ramp_secs: f64,
    pub noise_cutoff_hz: f64,
    pub command_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice_fade_secs: 0.3,
            drone_hz: 432.0,
            drone_detune_hz: 0.7,
            drone_gain: 0.030,
            drone_ramp_secs: 4.0,
            noise_gain: 0.012,
            noise_ramp_secs: 3.0,
            noise_cutoff_hz: 400.0,
            command_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    pub display_secs: f64,
    pub idle_secs: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            display_secs: 4.0,
            idle_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    /// Past this cycle only even cycles get a phrase.
    pub every_other_after: u32,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub preferred_voices: Vec<String>,
    pub speech_program: String,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            timeout_ms: 4000,
            max_tokens: 60,
            every_other_after: 3,
            rate: 0.82,
            pitch: 0.95,
            volume: 0.88,
            preferred_voices: ["Samantha", "Karen", "Moira", "Tessa", "Victoria", "Fiona"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            speech_program: "say".to_string(),
        }
    }
}
