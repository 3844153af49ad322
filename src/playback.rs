//! Realtime playback
//!
//! Plays a [`Sequence`] on a [`MidiEngine`], one sixteenth note per step.
//! The loop runs on the calling thread and blocks in the [`Pacer`] between
//! messages. Whatever way the loop ends, cleanup silences the pending voice,
//! sends all-notes-off, stops the clock if it was started and closes the
//! engine.
//!
//! Ties retrigger here: every Tie step sends its own NoteOn, and the voice it
//! opens stays pending until a Rest, an Active step, a Tie on another pitch,
//! or the end of playback closes it. The file and SysEx renderers merge
//! same-pitch ties instead.
//!
//! Sounding pitches outside 0-127 (a base pitch pushed past the range by its
//! octave shift) are clamped to the nearest valid note, as in the renderers.

use crate::midi::{
    step_duration_for, Advance, CancelToken, MidiEngine, MidiError, MidiMessage, Pacer,
    SleepPacer, StepClock,
};
use crate::sequence::{Sequence, SequenceError, Step, StepKind};
use log::{debug, error, info, trace, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Validation(#[from] SequenceError),
    #[error(transparent)]
    Sink(#[from] MidiError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    pub bpm: f64,
    /// MIDI channel, 1-16.
    pub channel: u8,
    /// Number of passes over the sequence; 0 repeats until cancelled.
    pub repetitions: u32,
    pub send_clock: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            channel: 1,
            repetitions: 4,
            send_clock: false,
        }
    }
}

impl PlaybackOptions {
    fn validate(&self) -> Result<(), SequenceError> {
        if step_duration_for(self.bpm).is_none() {
            return Err(SequenceError::InvalidArgument(format!(
                "bpm must be a positive number with a representable step length (got {})",
                self.bpm
            )));
        }
        if !(1..=16).contains(&self.channel) {
            return Err(SequenceError::InvalidArgument(format!(
                "channel must be between 1 and 16 (got {})",
                self.channel
            )));
        }
        Ok(())
    }
}

/// What happened during a playback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    /// Passes that ran to the end.
    pub iterations: u32,
    pub steps_played: u64,
    pub cancelled: bool,
}

/// Progress callbacks. All methods default to doing nothing.
pub trait PlaybackObserver {
    fn iteration_started(&mut self, _iteration: u32) {}
    fn step_started(&mut self, _index: usize, _step: &Step) {}
    fn finished(&mut self, _report: &PlaybackReport) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl PlaybackObserver for NoopObserver {}

/// A voice left sounding by a Tie step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SustainedVoice {
    note: u8,
}

/// Mutable state threaded through the step loop.
#[derive(Debug, Default)]
struct VoiceState {
    pending: Option<SustainedVoice>,
}

/// Owns an output for the duration of one playback.
pub struct Player<E: MidiEngine, P: Pacer = SleepPacer> {
    engine: E,
    pacer: P,
    options: PlaybackOptions,
    observer: Box<dyn PlaybackObserver>,
}

impl<E: MidiEngine> Player<E, SleepPacer> {
    pub fn new(engine: E, options: PlaybackOptions) -> Self {
        Self {
            engine,
            pacer: SleepPacer::new(),
            options,
            observer: Box::new(NoopObserver),
        }
    }
}

impl<E: MidiEngine, P: Pacer> Player<E, P> {
    pub fn with_pacer<Q: Pacer>(self, pacer: Q) -> Player<E, Q> {
        Player {
            engine: self.engine,
            pacer,
            options: self.options,
            observer: self.observer,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn PlaybackObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Plays `sequence` until the requested repetitions are done or `cancel`
    /// fires. The engine is closed before this returns, on every path.
    pub fn play(
        mut self,
        sequence: &Sequence,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        if let Err(e) = self.validate(sequence) {
            self.engine.close();
            return Err(e.into());
        }

        let channel = self.options.channel - 1;
        let clock = StepClock::new(self.options.bpm, self.options.send_clock);
        info!(
            "Now playing: {} ({} steps, {} BPM, channel {}, repetitions {}, clock {})",
            sequence.name(),
            sequence.len(),
            self.options.bpm,
            self.options.channel,
            self.options.repetitions,
            if clock.sends_clock() { "on" } else { "off" }
        );

        let mut voices = VoiceState::default();
        let mut report = PlaybackReport::default();
        let outcome = self.run(sequence, &clock, channel, cancel, &mut voices, &mut report);
        if let Err(e) = &outcome {
            error!("Playback aborted: {}", e);
        }

        let cleanup = self.cleanup(channel, &clock, &mut voices);
        self.engine.close();

        self.observer.finished(&report);
        info!(
            "Playback finished: {} iterations, {} steps{}",
            report.iterations,
            report.steps_played,
            if report.cancelled { " (cancelled)" } else { "" }
        );

        outcome?;
        cleanup?;
        Ok(report)
    }

    fn validate(&self, sequence: &Sequence) -> Result<(), SequenceError> {
        self.options.validate()?;
        if sequence.is_empty() {
            return Err(SequenceError::InvalidArgument(
                "cannot play an empty sequence".to_string(),
            ));
        }
        Ok(())
    }

    fn run(
        &mut self,
        sequence: &Sequence,
        clock: &StepClock,
        channel: u8,
        cancel: &CancelToken,
        voices: &mut VoiceState,
        report: &mut PlaybackReport,
    ) -> Result<(), MidiError> {
        if clock.sends_clock() {
            self.engine.send(MidiMessage::Start)?;
        }

        let repetitions = self.options.repetitions;
        let mut iteration = 0;
        while repetitions == 0 || iteration < repetitions {
            debug!("Iteration {} started", iteration);
            self.observer.iteration_started(iteration);

            for (index, step) in sequence.steps().iter().enumerate() {
                if cancel.is_cancelled() {
                    info!("Playback interrupted before step {}", index);
                    report.cancelled = true;
                    return Ok(());
                }
                self.observer.step_started(index, step);
                trace!("Step {}: {}", index, step);

                let advance = self.play_step(step, clock, channel, cancel, voices)?;
                report.steps_played += 1;
                if advance == Advance::Cancelled {
                    info!("Playback interrupted during step {}", index);
                    report.cancelled = true;
                    return Ok(());
                }
            }

            iteration += 1;
            report.iterations = iteration;
        }
        Ok(())
    }

    /// Sends one step's messages. The messages after the wait are sent even
    /// if the wait was cancelled, so every NoteOn of an Active step gets its
    /// NoteOff.
    fn play_step(
        &mut self,
        step: &Step,
        clock: &StepClock,
        channel: u8,
        cancel: &CancelToken,
        voices: &mut VoiceState,
    ) -> Result<Advance, MidiError> {
        // Clamped to 0-127 after the octave shift.
        let note = step.midi_note();
        match step.kind {
            StepKind::Active => {
                self.send(MidiMessage::note_on(channel, note, step.velocity()))?;
                let advance = clock.advance(&mut self.engine, &mut self.pacer, cancel)?;
                self.send(MidiMessage::note_off(channel, note))?;
                if let Some(voice) = voices.pending.take() {
                    debug!("Closing tied note {} after active step", voice.note);
                    self.send(MidiMessage::note_off(channel, voice.note))?;
                }
                Ok(advance)
            }
            StepKind::Rest => {
                if let Some(voice) = voices.pending.take() {
                    debug!("Closing tied note {} on rest", voice.note);
                    self.send(MidiMessage::note_off(channel, voice.note))?;
                }
                clock.advance(&mut self.engine, &mut self.pacer, cancel)
            }
            StepKind::Tie => {
                self.send(MidiMessage::note_on(channel, note, step.velocity()))?;
                let advance = clock.advance(&mut self.engine, &mut self.pacer, cancel)?;
                if let Some(voice) = voices.pending.filter(|v| v.note != note) {
                    debug!("Closing tied note {} before tie to {}", voice.note, note);
                    self.send(MidiMessage::note_off(channel, voice.note))?;
                }
                voices.pending = Some(SustainedVoice { note });
                Ok(advance)
            }
        }
    }

    fn send(&mut self, msg: MidiMessage) -> Result<(), MidiError> {
        trace!("Sending {:?}", msg);
        self.engine.send(msg)
    }

    /// Runs on every exit path. Every message is attempted even when an
    /// earlier one fails; the first failure is returned.
    fn cleanup(
        &mut self,
        channel: u8,
        clock: &StepClock,
        voices: &mut VoiceState,
    ) -> Result<(), MidiError> {
        let mut first_error = None;
        let mut record = |result: Result<(), MidiError>| {
            if let Err(e) = result {
                warn!("Cleanup send failed: {}", e);
                first_error.get_or_insert(e);
            }
        };

        if let Some(voice) = voices.pending.take() {
            debug!("Cleanup: closing tied note {}", voice.note);
            record(self.engine.send(MidiMessage::note_off(channel, voice.note)));
        }
        debug!("Cleanup: all notes off on channel {}", channel + 1);
        record(self.engine.send(MidiMessage::all_notes_off(channel)));
        if clock.sends_clock() {
            debug!("Cleanup: clock stop");
            record(self.engine.send(MidiMessage::Stop));
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
