//! MIDI output for acidseq
//!
//! This module provides the output side of live playback:
//! - Core MIDI message types and error handling
//! - Step timing and MIDI clock pulse generation
//! - Real MIDI device communication via midir
//! - A recording mock for tests
//!
//! The main components are:
//! - [`MidiEngine`] trait for sending MIDI messages to a sink
//! - [`MidirEngine`] for real MIDI device communication
//! - [`MockMidiEngine`] for testing
//! - [`StepClock`] and [`Pacer`] for timing
//!
pub mod clock;
mod engine;
pub mod midir_engine;
pub mod mock_engine;

// Re-export main types from engine
pub use engine::{MidiEngine, MidiError, MidiMessage, Result, ALL_NOTES_OFF};

// Re-export concrete implementations
pub use midir_engine::MidirEngine;
pub use mock_engine::MockMidiEngine;

// Re-export clock functionality
pub use clock::{
    step_duration_for, Advance, CancelToken, Pacer, SleepPacer, StepClock, PULSES_PER_STEP,
};

// Set default engine type
pub type DefaultMidiEngine = MidirEngine;
