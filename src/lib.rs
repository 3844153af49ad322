pub mod cli;
pub mod config;
pub mod logging;
pub mod midi;
pub mod playback;
pub mod render;
pub mod report;
pub mod sequence;
pub mod services;
pub mod ui;
pub mod voice;

pub use cli::Args;
pub use playback::{PlaybackError, PlaybackOptions, PlaybackReport, Player};
pub use sequence::{Octave, Sequence, SequenceError, Step, StepKind};
