use crate::config::{ExportSettings, PlaybackSettings};
use crate::playback::PlaybackOptions;
use crate::render::{MidiFileOptions, PatternSlot};
use crate::sequence::{load_sequence, Sequence, SequenceFileError};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ./acidseq.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print debug output on the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available MIDI output ports
    Ports,
    /// Print a sequence and its step table
    Show {
        /// Sequence file, or `demo`
        sequence: SequenceSource,
    },
    /// Play a sequence on a MIDI output
    Play(PlayArgs),
    /// Render a sequence to a Standard MIDI File
    ExportMidi(MidiExportArgs),
    /// Encode a sequence as a TD-3 SysEx pattern dump
    ExportSysex(SysexExportArgs),
    /// Write the step table as an HTML page
    ExportHtml {
        sequence: SequenceSource,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Build a sequence from an nmap XML report (`nmap -sV -oX`)
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Sequence file, or `demo`
    pub sequence: SequenceSource,

    /// MIDI output port (exact name or substring)
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(short, long)]
    pub bpm: Option<f64>,

    /// MIDI channel, 1-16
    #[arg(short, long)]
    pub channel: Option<u8>,

    /// Passes over the sequence, 0 loops until stopped
    #[arg(short, long)]
    pub repetitions: Option<u32>,

    /// Send MIDI clock, start and stop
    #[arg(long)]
    pub clock: bool,

    /// Never send MIDI clock, even for the demo or when configured
    #[arg(long, conflicts_with = "clock")]
    pub no_clock: bool,
}

impl PlayArgs {
    /// Command line flags win, then the demo's own tempo and clock, then the settings.
    pub fn options(&self, settings: &PlaybackSettings) -> PlaybackOptions {
        let demo = self.sequence == SequenceSource::Demo;
        let bpm = match self.bpm {
            Some(bpm) => bpm,
            None if demo => Sequence::DEMO_BPM,
            None => settings.bpm,
        };
        let send_clock = if self.no_clock {
            false
        } else {
            self.clock || demo || settings.send_clock
        };
        PlaybackOptions {
            bpm,
            channel: self.channel.unwrap_or(settings.channel),
            repetitions: self.repetitions.unwrap_or(settings.repetitions),
            send_clock,
        }
    }

    /// Port named on the command line, else the configured one.
    pub fn output<'a>(&'a self, settings: &'a PlaybackSettings) -> Option<&'a str> {
        self.output.as_deref().or(settings.output.as_deref())
    }
}

#[derive(clap::Args, Debug)]
pub struct MidiExportArgs {
    pub sequence: SequenceSource,

    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[arg(short, long)]
    pub bpm: Option<f64>,

    #[arg(short, long)]
    pub channel: Option<u8>,

    /// Ticks per quarter note
    #[arg(long)]
    pub ppq: Option<u16>,

    #[arg(short, long, default_value_t = 1)]
    pub repetitions: u32,
}

impl MidiExportArgs {
    pub fn options(&self, playback: &PlaybackSettings, export: &ExportSettings) -> MidiFileOptions {
        MidiFileOptions {
            bpm: self.bpm.unwrap_or(playback.bpm),
            channel: self.channel.unwrap_or(playback.channel),
            ppq: self.ppq.unwrap_or(export.ppq),
            repetitions: self.repetitions,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct SysexExportArgs {
    pub sequence: SequenceSource,

    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Pattern group, 0-3
    #[arg(short, long)]
    pub group: Option<u8>,

    /// Pattern number within the group, 0-15
    #[arg(short, long)]
    pub pattern: Option<u8>,

    #[arg(long)]
    pub triplet: bool,
}

impl SysexExportArgs {
    pub fn slot(&self, export: &ExportSettings) -> PatternSlot {
        PatternSlot {
            group: self.group.unwrap_or(export.group),
            pattern: self.pattern.unwrap_or(export.pattern),
            triplet: self.triplet || export.triplet,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// nmap XML report
    pub xml: PathBuf,

    /// Name for the new sequence
    #[arg(short, long)]
    pub name: Option<String>,

    /// Scale used to map ports to notes
    #[arg(short, long)]
    pub scale: Option<String>,

    /// Seed for rest placement and octaves
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to save the sequence file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Where a sequence comes from on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSource {
    Demo,
    File(PathBuf),
}

impl FromStr for SequenceSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("demo") {
            Ok(SequenceSource::Demo)
        } else {
            Ok(SequenceSource::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for SequenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceSource::Demo => write!(f, "demo"),
            SequenceSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl SequenceSource {
    pub fn load(&self) -> Result<Sequence, SequenceFileError> {
        match self {
            SequenceSource::Demo => Ok(Sequence::demo()),
            SequenceSource::File(path) => load_sequence(path),
        }
    }
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    let slug = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "sequence".to_string()
    } else {
        slug
    }
}

/// `<dir>/<slug>-<YYYYmmdd-HHMMSS>.<ext>`
pub fn default_output_path(dir: &Path, name: &str, extension: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        slugify(name),
        now.format("%Y%m%d-%H%M%S"),
        extension
    ))
}
