//! Step sequence model
//!
//! A [`Sequence`] is a fixed-length row of [`Step`]s. The length is chosen at
//! construction and never changes; steps are edited in place through
//! bounds-checked setters.

mod file;
mod step;

pub use file::{load_sequence, save_sequence, SequenceFile, SequenceFileError, StepRecord};
pub use step::{
    clamp_note, Octave, Step, StepKind, ACCENT_VELOCITY, DEFAULT_PITCH, NORMAL_VELOCITY,
};

use std::fmt;
use thiserror::Error;

/// Number of steps in a hardware pattern slot.
pub const PATTERN_STEPS: usize = 16;

/// Validation failures for sequence data and renderer arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("step {index} does not exist in a sequence of {length} steps")]
    IndexOutOfRange { index: usize, length: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown step type: {0}")]
    UnknownStepKind(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    steps: Vec<Step>,
}

impl Sequence {
    /// Tempo the demo pattern is played at from the command line.
    pub const DEMO_BPM: f64 = 111.0;

    /// Creates a sequence of `length` default steps.
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            steps: vec![Step::default(); length],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Overwrites the musical content of the step at `index`.
    pub fn set(
        &mut self,
        index: usize,
        pitch: u8,
        octave: Octave,
        kind: StepKind,
        accent: bool,
    ) -> Result<(), SequenceError> {
        if pitch > 127 {
            return Err(SequenceError::InvalidArgument(format!(
                "pitch must be between 0 and 127 (got {})",
                pitch
            )));
        }
        let step = self.step_mut(index)?;
        step.pitch = pitch;
        step.octave = octave;
        step.kind = kind;
        step.accent = accent;
        Ok(())
    }

    /// Records where the step at `index` came from.
    pub fn set_source(&mut self, index: usize, source: impl Into<String>) -> Result<(), SequenceError> {
        self.step_mut(index)?.source = source.into();
        Ok(())
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut Step, SequenceError> {
        let length = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or(SequenceError::IndexOutOfRange { index, length })
    }

    /// The built-in 16-step demo pattern.
    pub fn demo() -> Self {
        use Octave::{Down, Up, Zero};
        use StepKind::{Active, Tie};

        let pattern = [
            (43, Zero, Active, false),
            (46, Zero, Active, false),
            (43, Zero, Tie, false),
            (41, Zero, Active, false),
            (27, Zero, Tie, true),
            (24, Zero, Active, false),
            (36, Down, Tie, true),
            (24, Up, Active, true),
            (39, Up, Tie, false),
            (39, Zero, Active, false),
            (41, Up, Tie, false),
            (43, Up, Tie, true),
            (46, Zero, Active, true),
            (43, Zero, Tie, false),
            (36, Zero, Tie, false),
            (43, Up, Active, false),
        ];

        let steps = pattern
            .iter()
            .map(|&(pitch, octave, kind, accent)| Step::new(kind, pitch, octave, accent))
            .collect();
        Self {
            name: "Daft Punk - Da Funk".to_string(),
            steps,
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - {} steps:", self.name, self.len())?;
        write!(f, "|")?;
        for step in &self.steps {
            write!(f, " {} |", step.kind.glyph())?;
        }
        Ok(())
    }
}
