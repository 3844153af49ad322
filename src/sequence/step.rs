use super::SequenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pitch of a freshly constructed step.
pub const DEFAULT_PITCH: u8 = 30;

/// Velocity used for accented notes.
pub const ACCENT_VELOCITY: u8 = 120;

/// Velocity used for everything else.
pub const NORMAL_VELOCITY: u8 = 90;

/// What a step does when it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Plays its own note for one step.
    #[default]
    Active,
    /// Silence.
    Rest,
    /// Extends (or slides into) a sustained note.
    Tie,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Active => "active",
            StepKind::Rest => "rest",
            StepKind::Tie => "tie",
        }
    }

    /// Single-character glyph used by the compact sequence display.
    pub fn glyph(&self) -> char {
        match self {
            StepKind::Active => 'X',
            StepKind::Rest => '-',
            StepKind::Tie => '>',
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StepKind::Active),
            "rest" => Ok(StepKind::Rest),
            "tie" => Ok(StepKind::Tie),
            _ => Err(SequenceError::UnknownStepKind(s.to_string())),
        }
    }
}

/// Octave transposition applied on top of the base pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Octave {
    Down,
    #[default]
    Zero,
    Up,
}

impl Octave {
    pub fn semitones(&self) -> i16 {
        match self {
            Octave::Down => -12,
            Octave::Zero => 0,
            Octave::Up => 12,
        }
    }
}

impl TryFrom<i8> for Octave {
    type Error = SequenceError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Octave::Down),
            0 => Ok(Octave::Zero),
            1 => Ok(Octave::Up),
            other => Err(SequenceError::InvalidArgument(format!(
                "octave shift must be -1, 0 or 1 (got {})",
                other
            ))),
        }
    }
}

impl From<Octave> for i8 {
    fn from(octave: Octave) -> Self {
        match octave {
            Octave::Down => -1,
            Octave::Zero => 0,
            Octave::Up => 1,
        }
    }
}

impl fmt::Display for Octave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i8::from(*self))
    }
}

/// One slot of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub pitch: u8,
    pub accent: bool,
    pub octave: Octave,
    pub source: String,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            kind: StepKind::Active,
            pitch: DEFAULT_PITCH,
            accent: false,
            octave: Octave::Zero,
            source: String::new(),
        }
    }
}

impl Step {
    pub fn new(kind: StepKind, pitch: u8, octave: Octave, accent: bool) -> Self {
        Self {
            kind,
            pitch,
            accent,
            octave,
            source: String::new(),
        }
    }

    /// Base pitch shifted by the octave, unclamped.
    pub fn sounding_pitch(&self) -> i16 {
        i16::from(self.pitch) + self.octave.semitones()
    }

    /// Sounding pitch clamped into the MIDI note range.
    pub fn midi_note(&self) -> u8 {
        clamp_note(self.sounding_pitch())
    }

    pub fn velocity(&self) -> u8 {
        if self.accent {
            ACCENT_VELOCITY
        } else {
            NORMAL_VELOCITY
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[STEP] -> (note={}, accent={}, type={}, octave_mod={})",
            self.pitch, self.accent, self.kind, self.octave
        )
    }
}

pub fn clamp_note(value: i16) -> u8 {
    value.clamp(0, 127) as u8
}
