use thiserror::Error;

/// Custom error type for MIDI operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MidiError {
    /// Error when sending a MIDI message
    #[error("MIDI send error: {0}")]
    SendError(String),
    /// Error when connecting to a MIDI device
    #[error("MIDI connection error: {0}")]
    ConnectionError(String),
    /// No output port matched the requested name
    #[error("MIDI output '{0}' not found")]
    PortNotFound(String),
}

/// Represents a MIDI message that can be sent to an output.
///
/// Channels are zero-based (0-15) at this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On message with note number and velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off message with note number and release velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change message with controller number and value
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// MIDI Clock timing message
    Clock,
    /// MIDI Start message
    Start,
    /// MIDI Stop message
    Stop,
}

/// Controller number of the channel-mode "all notes off" message.
pub const ALL_NOTES_OFF: u8 = 123;

impl MidiMessage {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        }
    }

    pub fn note_off(channel: u8, note: u8) -> Self {
        MidiMessage::NoteOff {
            channel,
            note,
            velocity: 0,
        }
    }

    pub fn all_notes_off(channel: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            controller: ALL_NOTES_OFF,
            value: 0,
        }
    }

    /// Raw wire bytes of the message.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            MidiMessage::Clock => vec![0xF8],
            MidiMessage::Start => vec![0xFA],
            MidiMessage::Stop => vec![0xFC],
        }
    }
}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// An output sink for MIDI messages.
pub trait MidiEngine: Send {
    /// Sends a MIDI message to the device
    fn send(&mut self, msg: MidiMessage) -> Result<()>;

    /// Releases the underlying device. Further sends fail.
    fn close(&mut self);
}

impl<E: MidiEngine + ?Sized> MidiEngine for Box<E> {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        (**self).send(msg)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
