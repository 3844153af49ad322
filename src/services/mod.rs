//! Network services as a source of step data
//!
//! Open ports from an nmap report are turned into [`PortService`]s, which the
//! [`mapping`] module folds into a playable sequence.

pub mod mapping;
pub mod nmap;

pub use mapping::{services_to_sequence, Rng, Scale};

use crate::sequence::SequenceError;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read scan report: {0}")]
    Io(#[from] io::Error),
    #[error("malformed scan report: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Validation(#[from] SequenceError),
}

impl From<quick_xml::events::attributes::AttrError> for ImportError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ImportError::Xml(e.into())
    }
}

/// Service names for well-known ports, used when a report does not name one.
const SERVICE_NAME_HINTS: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (110, "pop3"),
    (135, "rpc"),
    (139, "netbios"),
    (143, "imap"),
    (443, "https"),
    (445, "smb"),
    (993, "imaps"),
    (3306, "mysql"),
    (3389, "rdp"),
    (8080, "http-alt"),
];

pub fn service_name_hint(port: u16) -> Option<&'static str> {
    SERVICE_NAME_HINTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

pub const UNKNOWN: &str = "unknown";

/// A network service exposed on a TCP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortService {
    pub port: u16,
    pub service_name: String,
    pub version: String,
    pub banner: String,
}

impl PortService {
    pub fn new(port: u16, service_name: &str, version: &str) -> Self {
        Self {
            port,
            service_name: non_empty_or_unknown(service_name),
            version: non_empty_or_unknown(version),
            banner: String::new(),
        }
    }

    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = banner.trim().to_string();
        self
    }

    /// `"name version"`, the text the mapping inspects.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.service_name, self.version)
    }
}

fn non_empty_or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

impl fmt::Display for PortService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.port, self.service_name)?;
        if !self.version.eq_ignore_ascii_case(UNKNOWN) {
            write!(f, " {}", self.version)?;
        }
        Ok(())
    }
}
