// config.rs

use config::{Environment, File};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File name (without extension) picked up from the working directory.
pub const CONFIG_BASENAME: &str = "acidseq";
/// Prefix for environment overrides, e.g. `ACIDSEQ_PLAYBACK__BPM=133`.
pub const ENV_PREFIX: &str = "ACIDSEQ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub bpm: f64,
    pub channel: u8,
    pub repetitions: u32,
    pub send_clock: bool,
    pub output: Option<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            channel: 1,
            repetitions: 4,
            send_clock: false,
            output: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub ppq: u16,
    pub group: u8,
    pub pattern: u8,
    pub triplet: bool,
    pub directory: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            ppq: 480,
            group: 0,
            pattern: 0,
            triplet: false,
            directory: "exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Added to every scale degree to land in a bass register.
    pub octave_shift: u8,
    /// `"name version"` strings longer than this become ties.
    pub tie_threshold: usize,
    pub accent_keywords: Vec<String>,
    pub default_scale: String,
    /// Scale name to semitone offsets.
    pub scales: BTreeMap<String, Vec<u8>>,
}

impl Default for MappingSettings {
    fn default() -> Self {
        let scales = [
            ("minor", vec![0, 2, 3, 5, 7, 8, 10]),
            ("major", vec![0, 2, 4, 5, 7, 9, 11]),
            ("dorian", vec![0, 2, 3, 5, 7, 9, 10]),
            ("phrygian", vec![0, 1, 3, 5, 7, 8, 10]),
            ("minor_pentatonic", vec![0, 3, 5, 7, 10]),
            ("blues", vec![0, 3, 5, 6, 7, 10]),
        ]
        .into_iter()
        .map(|(name, notes)| (name.to_string(), notes))
        .collect();

        let accent_keywords = ["admin", "debug", "telnet", "ftp", "smb", "rpc", "vnc", "test"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            octave_shift: 36,
            tie_threshold: 30,
            accent_keywords,
            default_scale: "minor".to_string(),
            scales,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub export: ExportSettings,
    pub mapping: MappingSettings,
}

impl Settings {
    /// Defaults, then the config file, then `ACIDSEQ_*` environment variables.
    ///
    /// An explicit `path` must exist; otherwise `acidseq.{toml,json,yaml,...}`
    /// in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                File::from(path).required(true)
            }
            None => File::with_name(CONFIG_BASENAME).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    pub fn scale_notes(&self, name: &str) -> Option<&[u8]> {
        self.mapping.scales.get(name).map(Vec::as_slice)
    }
}
