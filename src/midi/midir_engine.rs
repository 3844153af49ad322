use crate::midi::{MidiEngine, MidiError, MidiMessage, Result};
use log::{debug, info};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};

const CLIENT_NAME: &str = "acidseq-out";

/// Hardware output through midir.
pub struct MidirEngine {
    port_name: String,
    output: Option<MidiOutputConnection>,
}

impl MidirEngine {
    /// Names of all MIDI output ports currently visible.
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("acidseq-port-lister")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        let names = midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect();
        Ok(names)
    }

    /// Opens the output whose name equals `name`, or failing that the first
    /// one whose name contains it.
    pub fn open(name: &str) -> Result<Self> {
        let midi_out =
            MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        let ports: Vec<(MidiOutputPort, String)> = midi_out
            .ports()
            .into_iter()
            .filter_map(|p| midi_out.port_name(&p).ok().map(|n| (p, n)))
            .collect();
        debug!(
            "Available MIDI output ports: {:?}",
            ports.iter().map(|(_, n)| n).collect::<Vec<_>>()
        );

        let (port, port_name) = ports
            .iter()
            .find(|(_, n)| n == name)
            .or_else(|| ports.iter().find(|(_, n)| n.contains(name)))
            .cloned()
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;

        info!("Connecting to MIDI output port: {}", port_name);
        let output = midi_out
            .connect(&port, "acidseq-output")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        Ok(MidirEngine {
            port_name,
            output: Some(output),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiEngine for MidirEngine {
    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| MidiError::SendError(format!("{} is closed", self.port_name)))?;
        output
            .send(&msg.to_bytes())
            .map_err(|e| MidiError::SendError(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(output) = self.output.take() {
            output.close();
            info!("Closed MIDI output port: {}", self.port_name);
        }
    }
}

impl Drop for MidirEngine {
    fn drop(&mut self) {
        self.close();
    }
}
