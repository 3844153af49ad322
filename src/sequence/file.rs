use super::{Octave, Sequence, SequenceError, StepKind};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequenceFileError {
    #[error("failed to read sequence file: {0}")]
    Config(#[from] config::ConfigError),
    #[error("failed to write sequence file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode sequence: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid sequence: {0}")]
    Invalid(#[from] SequenceError),
}

/// On-disk form of a single sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceFile {
    pub name: String,
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub kind: StepKind,
    pub pitch: u8,
    #[serde(default)]
    pub octave: Octave,
    #[serde(default)]
    pub accent: bool,
    #[serde(default)]
    pub source: String,
}

impl From<&Sequence> for SequenceFile {
    fn from(sequence: &Sequence) -> Self {
        Self {
            name: sequence.name().to_string(),
            steps: sequence
                .steps()
                .iter()
                .map(|step| StepRecord {
                    kind: step.kind,
                    pitch: step.pitch,
                    octave: step.octave,
                    accent: step.accent,
                    source: step.source.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<SequenceFile> for Sequence {
    type Error = SequenceError;

    fn try_from(file: SequenceFile) -> Result<Self, Self::Error> {
        let mut sequence = Sequence::new(file.name, file.steps.len());
        for (index, record) in file.steps.into_iter().enumerate() {
            sequence.set(index, record.pitch, record.octave, record.kind, record.accent)?;
            sequence.set_source(index, record.source)?;
        }
        Ok(sequence)
    }
}

/// Loads a sequence from any file format the `config` crate understands.
pub fn load_sequence(path: &Path) -> Result<Sequence, SequenceFileError> {
    debug!("Loading sequence from {}", path.display());
    let file: SequenceFile = config::Config::builder()
        .add_source(config::File::from(path))
        .build()?
        .try_deserialize()?;
    let sequence = Sequence::try_from(file)?;
    info!(
        "Loaded sequence '{}' ({} steps) from {}",
        sequence.name(),
        sequence.len(),
        path.display()
    );
    Ok(sequence)
}

/// Saves a sequence as pretty-printed JSON.
pub fn save_sequence(sequence: &Sequence, path: &Path) -> Result<(), SequenceFileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&SequenceFile::from(sequence))?;
    fs::write(path, json)?;
    info!("Saved sequence '{}' to {}", sequence.name(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("acidseq-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_save_then_load_keeps_steps() {
        let mut sequence = Sequence::demo();
        sequence.set_source(3, "80:http").unwrap();
        let path = temp_path("demo.json");

        save_sequence(&sequence, &path).unwrap();
        let loaded = load_sequence(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, sequence);
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let path = temp_path("short.toml");
        fs::write(
            &path,
            "name = \"Short\"\n\n[[steps]]\npitch = 36\n\n[[steps]]\nkind = \"tie\"\npitch = 38\noctave = -1\naccent = true\n",
        )
        .unwrap();

        let loaded = load_sequence(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.name(), "Short");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(0).unwrap().kind, StepKind::Active);
        assert_eq!(loaded.get(1).unwrap().octave, Octave::Down);
        assert!(loaded.get(1).unwrap().accent);
    }

    #[test]
    fn test_load_rejects_out_of_range_pitch() {
        let file = SequenceFile {
            name: "Bad".to_string(),
            steps: vec![StepRecord {
                kind: StepKind::Active,
                pitch: 200,
                octave: Octave::Zero,
                accent: false,
                source: String::new(),
            }],
        };
        assert!(Sequence::try_from(file).is_err());
    }
}
