//! Offline renderers
//!
//! Both renderers are pure functions of a sequence and their options. They
//! either fail validation up front or produce the whole artifact.

pub mod smf;
pub mod sysex;

pub use smf::{render_midi_file, save_midi_file, MidiFileOptions, DEFAULT_PPQ};
pub use sysex::{encode_pattern, save_pattern, PatternSlot, FRAME_LEN, REST_PITCH};
