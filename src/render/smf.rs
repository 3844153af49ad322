//! Standard MIDI File rendering
//!
//! One pass over the sequence per repetition, written as a single format 0
//! track. Same-pitch Tie runs merge into one sustained note.

use crate::sequence::{Sequence, SequenceError, StepKind};
use log::{debug, info};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_PPQ: u16 = 480;
const MAX_PPQ: u16 = 0x7FFF;
const MAX_TEMPO: u32 = 0x00FF_FFFF;
const MAX_DELTA: u64 = 0x0FFF_FFFF;

#[derive(Debug, Clone, PartialEq)]
pub struct MidiFileOptions {
    pub bpm: f64,
    /// MIDI channel, 1-indexed. Out-of-range values are clamped.
    pub channel: u8,
    /// Ticks per quarter note.
    pub ppq: u16,
    pub repetitions: u32,
}

impl Default for MidiFileOptions {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            channel: 1,
            ppq: DEFAULT_PPQ,
            repetitions: 1,
        }
    }
}

impl MidiFileOptions {
    /// Ticks in one sixteenth-note step, never less than one.
    pub fn ticks_per_step(&self) -> u32 {
        ((f64::from(self.ppq) / 4.0).round() as u32).max(1)
    }

    /// Zero-based channel clamped to 0-15.
    pub fn midi_channel(&self) -> u8 {
        self.channel.saturating_sub(1).min(15)
    }

    /// Microseconds per quarter note.
    pub fn tempo(&self) -> Result<u32, SequenceError> {
        let tempo = (60_000_000.0 / self.bpm).round();
        if !self.bpm.is_finite() || self.bpm <= 0.0 || tempo < 1.0 || tempo > f64::from(MAX_TEMPO) {
            return Err(SequenceError::InvalidArgument(format!(
                "bpm {} cannot be written as a MIDI tempo",
                self.bpm
            )));
        }
        Ok(tempo as u32)
    }
}

/// Builds the track events while tracking the running delta and the note
/// currently sounding.
struct TrackWriter {
    channel: u4,
    events: Vec<TrackEvent<'static>>,
    running_delta: u32,
    active_note: Option<u8>,
}

impl TrackWriter {
    fn new(channel: u8) -> Self {
        Self {
            channel: u4::new(channel),
            events: Vec::new(),
            running_delta: 0,
            active_note: None,
        }
    }

    fn push(&mut self, kind: TrackEventKind<'static>) {
        self.events.push(TrackEvent {
            delta: u28::new(self.running_delta),
            kind,
        });
        self.running_delta = 0;
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.push(TrackEventKind::Midi {
            channel: self.channel,
            message: MidiMessage::NoteOn {
                key: u7::new(note),
                vel: u7::new(velocity),
            },
        });
        self.active_note = Some(note);
    }

    fn close_active(&mut self) {
        if let Some(note) = self.active_note.take() {
            self.push(TrackEventKind::Midi {
                channel: self.channel,
                message: MidiMessage::NoteOff {
                    key: u7::new(note),
                    vel: u7::new(0),
                },
            });
        }
    }

    fn wait(&mut self, ticks: u32) {
        self.running_delta += ticks;
    }
}

/// Renders `sequence` into a single-track MIDI file.
pub fn render_midi_file(
    sequence: &Sequence,
    options: &MidiFileOptions,
) -> Result<Smf<'static>, SequenceError> {
    if options.repetitions < 1 {
        return Err(SequenceError::InvalidArgument(
            "repetitions must be at least 1".to_string(),
        ));
    }
    if options.ppq == 0 || options.ppq > MAX_PPQ {
        return Err(SequenceError::InvalidArgument(format!(
            "ppq must be between 1 and {} (got {})",
            MAX_PPQ, options.ppq
        )));
    }
    let tempo = options.tempo()?;
    let ticks_per_step = options.ticks_per_step();
    let total_ticks =
        u64::from(options.repetitions) * sequence.len() as u64 * u64::from(ticks_per_step);
    if total_ticks > MAX_DELTA {
        return Err(SequenceError::InvalidArgument(format!(
            "{} ticks do not fit in a MIDI track",
            total_ticks
        )));
    }

    let mut track = TrackWriter::new(options.midi_channel());
    track.push(TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo))));

    for _ in 0..options.repetitions {
        for step in sequence.steps() {
            let note = step.midi_note();
            match step.kind {
                StepKind::Rest => {
                    track.close_active();
                }
                StepKind::Active => {
                    track.close_active();
                    track.note_on(note, step.velocity());
                }
                StepKind::Tie => match track.active_note {
                    None => track.note_on(note, step.velocity()),
                    Some(active) if active != note => {
                        track.close_active();
                        track.note_on(note, step.velocity());
                    }
                    Some(_) => {}
                },
            }
            track.wait(ticks_per_step);
        }
    }

    track.close_active();
    track.push(TrackEventKind::Meta(MetaMessage::EndOfTrack));

    debug!(
        "Rendered '{}' into {} track events ({} ticks per step)",
        sequence.name(),
        track.events.len(),
        ticks_per_step
    );

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(options.ppq)),
    ));
    smf.tracks.push(track.events);
    Ok(smf)
}

/// Writes a rendered file to `path`, creating parent directories.
pub fn save_midi_file(smf: &Smf<'_>, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    smf.save(path)?;
    info!("Saved MIDI file to {}", path.display());
    Ok(())
}
