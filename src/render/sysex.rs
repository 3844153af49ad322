//! TD-3 pattern dump encoding
//!
//! Produces the SysEx frame the bass synthesizer accepts for one 16-step
//! pattern slot. Sequences shorter than 16 steps are padded with rests; the
//! real length travels in the step-count field.

use crate::sequence::{clamp_note, Sequence, SequenceError, Step, StepKind, PATTERN_STEPS};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;

/// Manufacturer id and model/command bytes that open every pattern frame.
const HEADER: [u8; 8] = [0xF0, 0x00, 0x20, 0x32, 0x00, 0x01, 0x0A, 0x78];
const END_OF_EXCLUSIVE: u8 = 0xF7;
/// Pitch written for rest steps.
pub const REST_PITCH: u8 = 0x18;
/// Size of an encoded pattern frame in bytes.
pub const FRAME_LEN: usize = 123;

pub const MAX_GROUP: u8 = 3;
pub const MAX_PATTERN: u8 = 15;

/// Where the pattern goes in the hardware's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternSlot {
    pub group: u8,
    pub pattern: u8,
    pub triplet: bool,
}

impl PatternSlot {
    fn validate(&self) -> Result<(), SequenceError> {
        if self.group > MAX_GROUP {
            return Err(SequenceError::InvalidArgument(format!(
                "group must be between 0 and {} (got {})",
                MAX_GROUP, self.group
            )));
        }
        if self.pattern > MAX_PATTERN {
            return Err(SequenceError::InvalidArgument(format!(
                "pattern must be between 0 and {} (got {})",
                MAX_PATTERN, self.pattern
            )));
        }
        Ok(())
    }
}

/// High and low nibble of a value clamped to 0-127.
fn nibbles(value: i16) -> [u8; 2] {
    let value = clamp_note(value);
    [(value >> 4) & 0x0F, value & 0x0F]
}

/// Four bytes holding one bit per step, four steps per byte.
fn step_mask(flag: impl Fn(usize) -> bool) -> [u8; 4] {
    let mut mask = [0u8; 4];
    for index in (0..PATTERN_STEPS).filter(|&i| flag(i)) {
        mask[index / 4] |= 1 << (index % 4);
    }
    mask
}

/// Encodes `sequence` as a pattern dump for `slot`.
pub fn encode_pattern(sequence: &Sequence, slot: &PatternSlot) -> Result<Vec<u8>, SequenceError> {
    slot.validate()?;
    let length = sequence.len();
    if length < 1 {
        return Err(SequenceError::InvalidArgument(
            "sequence must contain at least one step".to_string(),
        ));
    }
    if length > PATTERN_STEPS {
        return Err(SequenceError::InvalidArgument(format!(
            "patterns hold at most {} steps (got {})",
            PATTERN_STEPS, length
        )));
    }

    let steps: Vec<Option<&Step>> = (0..PATTERN_STEPS).map(|i| sequence.get(i)).collect();
    let kind_at = |i: usize| steps.get(i).copied().flatten().map(|s| s.kind);

    let mut pitches = Vec::with_capacity(PATTERN_STEPS * 2);
    let mut accents = Vec::with_capacity(PATTERN_STEPS * 2);
    let mut slides = Vec::with_capacity(PATTERN_STEPS * 2);

    for (index, step) in steps.iter().enumerate() {
        match step {
            Some(step) if step.kind != StepKind::Rest => {
                pitches.extend(nibbles(step.sounding_pitch()));
                accents.extend([0x00, u8::from(step.accent)]);
                let slide =
                    step.kind == StepKind::Tie || kind_at(index + 1) == Some(StepKind::Tie);
                slides.extend([0x00, u8::from(slide)]);
            }
            _ => {
                pitches.extend(nibbles(i16::from(REST_PITCH)));
                accents.extend([0x00, 0x00]);
                slides.extend([0x00, 0x00]);
            }
        }
    }

    let tie_mask = step_mask(|i| kind_at(i) == Some(StepKind::Tie));
    let rest_mask = step_mask(|i| matches!(kind_at(i), None | Some(StepKind::Rest)));
    let count = [((length >> 4) & 0x0F) as u8, (length & 0x0F) as u8];

    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.extend(HEADER);
    frame.extend([slot.group & 0x0F, slot.pattern & 0x1F, 0x00, 0x00]);
    frame.extend(pitches);
    frame.extend(accents);
    frame.extend(slides);
    frame.extend([0x00, u8::from(slot.triplet)]);
    frame.extend(count);
    frame.extend([0x00, 0x00]);
    frame.extend(tie_mask);
    frame.extend(rest_mask);
    frame.push(END_OF_EXCLUSIVE);

    debug!(
        "Encoded '{}' for group {} pattern {}: tie mask {:02X?}, rest mask {:02X?}",
        sequence.name(),
        slot.group,
        slot.pattern,
        tie_mask,
        rest_mask
    );
    Ok(frame)
}

/// Writes a raw SysEx dump to `path`, creating parent directories.
pub fn save_pattern(frame: &[u8], path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, frame)?;
    info!("Saved SysEx pattern to {}", path.display());
    Ok(())
}
