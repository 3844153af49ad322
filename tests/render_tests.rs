use acidseq::render::{
    encode_pattern, render_midi_file, save_midi_file, save_pattern, MidiFileOptions, PatternSlot,
    FRAME_LEN,
};
use acidseq::report::save_html;
use acidseq::sequence::{load_sequence, save_sequence};
use acidseq::voice::voiced_intervals;
use acidseq::{Octave, Sequence, StepKind};
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("acidseq-render-{}", std::process::id()))
        .join(name)
}

#[derive(Debug, PartialEq)]
enum Ev {
    On(u8, u8, u32),
    Off(u8, u32),
    End(u32),
}

fn events(smf: &Smf<'_>) -> Vec<Ev> {
    smf.tracks[0]
        .iter()
        .filter_map(|e| {
            let delta = e.delta.as_int();
            match e.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } => Some(Ev::On(key.as_int(), vel.as_int(), delta)),
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { key, .. },
                    ..
                } => Some(Ev::Off(key.as_int(), delta)),
                TrackEventKind::Meta(MetaMessage::EndOfTrack) => Some(Ev::End(delta)),
                _ => None,
            }
        })
        .collect()
}

fn scenario() -> Sequence {
    let mut seq = Sequence::new("scenario", 4);
    seq.set(0, 60, Octave::Zero, StepKind::Active, false).unwrap();
    seq.set(1, 0, Octave::Zero, StepKind::Rest, false).unwrap();
    seq.set(2, 64, Octave::Zero, StepKind::Tie, true).unwrap();
    seq.set(3, 67, Octave::Zero, StepKind::Active, false).unwrap();
    seq
}

#[test]
fn test_saved_midi_file_reads_back() {
    let smf = render_midi_file(&scenario(), &MidiFileOptions::default()).unwrap();
    let path = temp_path("scenario.mid");
    save_midi_file(&smf, &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::remove_file(&path).ok();
    let parsed = Smf::parse(&bytes).unwrap();

    assert_eq!(
        events(&parsed),
        vec![
            Ev::On(60, 90, 0),
            Ev::Off(60, 120),
            Ev::On(64, 120, 120),
            Ev::Off(64, 120),
            Ev::On(67, 90, 0),
            Ev::Off(67, 120),
            Ev::End(0),
        ]
    );
}

#[test]
fn test_trailing_rest_is_carried_by_end_of_track() {
    let mut seq = Sequence::new("tail", 3);
    seq.set(0, 60, Octave::Zero, StepKind::Tie, false).unwrap();
    seq.set(1, 0, Octave::Zero, StepKind::Rest, false).unwrap();
    seq.set(2, 0, Octave::Zero, StepKind::Rest, false).unwrap();
    let smf = render_midi_file(&seq, &MidiFileOptions::default()).unwrap();
    assert_eq!(
        events(&smf),
        vec![Ev::On(60, 90, 0), Ev::Off(60, 120), Ev::End(240)]
    );
}

#[test]
fn test_all_active_note_count_and_length() {
    for (length, ppq) in [(1usize, 480u16), (8, 96), (16, 480), (5, 24)] {
        let seq = Sequence::new("active", length);
        let options = MidiFileOptions {
            ppq,
            ..MidiFileOptions::default()
        };
        let smf = render_midi_file(&seq, &options).unwrap();
        let evs = events(&smf);
        let notes = evs.iter().filter(|e| !matches!(e, Ev::End(_))).count();
        assert_eq!(notes, 2 * length);

        let total: u32 = smf.tracks[0].iter().map(|e| e.delta.as_int()).sum();
        assert_eq!(total, length as u32 * options.ticks_per_step());
    }
}

#[test]
fn test_file_notes_match_voiced_intervals() {
    // Every tie keeps the pitch of the step it extends.
    let steps = [
        (StepKind::Active, 40),
        (StepKind::Tie, 40),
        (StepKind::Rest, 0),
        (StepKind::Tie, 45),
        (StepKind::Tie, 45),
        (StepKind::Active, 50),
        (StepKind::Active, 50),
        (StepKind::Tie, 50),
    ];
    let mut seq = Sequence::new("voices", steps.len());
    for (i, (kind, pitch)) in steps.into_iter().enumerate() {
        seq.set(i, pitch, Octave::Zero, kind, false).unwrap();
    }

    let smf = render_midi_file(&seq, &MidiFileOptions::default()).unwrap();
    let durations: Vec<u32> = events(&smf)
        .iter()
        .filter_map(|e| match e {
            Ev::Off(_, delta) => Some(*delta),
            _ => None,
        })
        .collect();
    let intervals = voiced_intervals(&seq);
    assert_eq!(intervals.len(), 4);
    assert_eq!(
        durations,
        intervals
            .iter()
            .map(|i| i.steps as u32 * 120)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_repetitions_repeat_the_pattern() {
    let seq = scenario();
    let once = render_midi_file(&seq, &MidiFileOptions::default()).unwrap();
    let twice = render_midi_file(
        &seq,
        &MidiFileOptions {
            repetitions: 2,
            ..MidiFileOptions::default()
        },
    )
    .unwrap();
    let count = |smf: &Smf<'_>| events(smf).iter().filter(|e| matches!(e, Ev::On(..))).count();
    assert_eq!(count(&twice), 2 * count(&once));
}

#[test]
fn test_sysex_dump_written_to_disk() {
    let frame = encode_pattern(
        &Sequence::demo(),
        &PatternSlot {
            group: 1,
            pattern: 7,
            triplet: false,
        },
    )
    .unwrap();
    let path = temp_path("demo.syx");
    save_pattern(&frame, &path).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(bytes.len(), FRAME_LEN);
    assert_eq!(bytes[0], 0xF0);
    assert_eq!(bytes[8], 1);
    assert_eq!(bytes[9], 7);
    assert_eq!(*bytes.last().unwrap(), 0xF7);
    assert!(bytes[1..bytes.len() - 1].iter().all(|b| *b < 0x80));
}

#[test]
fn test_sequence_file_feeds_every_renderer() {
    let path = temp_path("imported.json");
    save_sequence(&scenario(), &path).unwrap();
    let loaded = load_sequence(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(loaded, scenario());
    assert!(render_midi_file(&loaded, &MidiFileOptions::default()).is_ok());
    assert!(encode_pattern(&loaded, &PatternSlot::default()).is_ok());

    let html = temp_path("scenario.html");
    save_html(&loaded, None, &html).unwrap();
    let contents = fs::read_to_string(&html).unwrap();
    fs::remove_file(&html).ok();
    assert!(contents.contains("<h1>scenario</h1>"));
}
