//! nmap XML report parsing
//!
//! Only open ports are kept. Produce a report with
//! `nmap -sV --open --top-ports 16 -oX scan.xml <target>`.

use super::{service_name_hint, ImportError, PortService, UNKNOWN};
use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// Service attributes copied into the banner, in this order.
const BANNER_KEYS: [&str; 6] = ["product", "version", "extrainfo", "hostname", "tunnel", "ostype"];

#[derive(Debug, Default)]
struct ServiceAttrs {
    name: Option<String>,
    product: Option<String>,
    version: Option<String>,
    extrainfo: Option<String>,
    hostname: Option<String>,
    tunnel: Option<String>,
    ostype: Option<String>,
}

impl ServiceAttrs {
    fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "name" => &self.name,
            "product" => &self.product,
            "version" => &self.version,
            "extrainfo" => &self.extrainfo,
            "hostname" => &self.hostname,
            "tunnel" => &self.tunnel,
            "ostype" => &self.ostype,
            _ => &None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    fn set(&mut self, key: &[u8], value: String) {
        let slot = match key {
            b"name" => &mut self.name,
            b"product" => &mut self.product,
            b"version" => &mut self.version,
            b"extrainfo" => &mut self.extrainfo,
            b"hostname" => &mut self.hostname,
            b"tunnel" => &mut self.tunnel,
            b"ostype" => &mut self.ostype,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// A `<port>` element being read.
#[derive(Debug, Default)]
struct PortEntry {
    port: Option<u16>,
    open: bool,
    service: Option<ServiceAttrs>,
    cpes: Vec<String>,
}

impl PortEntry {
    fn from_element(element: &BytesStart<'_>) -> Result<Self, ImportError> {
        let port = match element.try_get_attribute("portid")? {
            Some(attr) => {
                let raw = attr.unescape_value()?;
                match raw.trim().parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("Skipping port with invalid id '{}'", raw);
                        None
                    }
                }
            }
            None => None,
        };
        Ok(Self {
            port,
            ..Self::default()
        })
    }

    fn finish(self) -> Option<PortService> {
        let port = self.port?;
        if !self.open {
            debug!("Skipping port {}: not open", port);
            return None;
        }

        let hint = service_name_hint(port).unwrap_or(UNKNOWN);
        let Some(service) = self.service else {
            return Some(PortService::new(port, hint, UNKNOWN));
        };

        let service_name = service
            .get("name")
            .or_else(|| service.get("product"))
            .unwrap_or(hint);

        let mut version_parts: Vec<&str> = Vec::new();
        for part in ["product", "version", "extrainfo"]
            .iter()
            .filter_map(|key| service.get(key))
        {
            if !version_parts.contains(&part) {
                version_parts.push(part);
            }
        }
        let version = if version_parts.is_empty() {
            UNKNOWN.to_string()
        } else {
            version_parts.join(" ")
        };

        let mut banner_bits: Vec<String> = BANNER_KEYS
            .iter()
            .filter_map(|key| service.get(key).map(|value| format!("{}={}", key, value)))
            .collect();
        if !self.cpes.is_empty() {
            banner_bits.push(format!("cpe={}", self.cpes.join(",")));
        }

        let service_name = if service_name == UNKNOWN { hint } else { service_name };
        Some(PortService::new(port, service_name, &version).with_banner(&banner_bits.join("; ")))
    }
}

fn read_service(element: &BytesStart<'_>) -> Result<ServiceAttrs, ImportError> {
    let mut attrs = ServiceAttrs::default();
    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        attrs.set(attr.key.as_ref(), value);
    }
    Ok(attrs)
}

fn is_open(element: &BytesStart<'_>) -> Result<bool, ImportError> {
    Ok(match element.try_get_attribute("state")? {
        Some(attr) => attr.unescape_value()? == "open",
        None => false,
    })
}

/// Parses the open services out of an nmap XML report.
pub fn parse_str(xml: &str) -> Result<Vec<PortService>, ImportError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut services = Vec::new();
    let mut in_ports = false;
    let mut current: Option<PortEntry> = None;
    let mut in_cpe = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"ports" => in_ports = true,
                b"port" if in_ports => current = Some(PortEntry::from_element(&e)?),
                b"state" => {
                    if let Some(entry) = current.as_mut() {
                        entry.open = is_open(&e)?;
                    }
                }
                b"service" => {
                    if let Some(entry) = current.as_mut() {
                        entry.service = Some(read_service(&e)?);
                    }
                }
                b"cpe" => in_cpe = current.is_some(),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"port" if in_ports => {
                    services.extend(PortEntry::from_element(&e)?.finish());
                }
                b"state" => {
                    if let Some(entry) = current.as_mut() {
                        entry.open = is_open(&e)?;
                    }
                }
                b"service" => {
                    if let Some(entry) = current.as_mut() {
                        entry.service = Some(read_service(&e)?);
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_cpe => {
                let cpe = text.unescape()?.trim().to_string();
                if let Some(entry) = current.as_mut().filter(|_| !cpe.is_empty()) {
                    entry.cpes.push(cpe);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"ports" => in_ports = false,
                b"port" => {
                    if let Some(entry) = current.take() {
                        services.extend(entry.finish());
                    }
                }
                b"cpe" => in_cpe = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    info!("Parsed {} open services from scan report", services.len());
    Ok(services)
}

pub fn parse_file(path: &Path) -> Result<Vec<PortService>, ImportError> {
    debug!("Reading scan report {}", path.display());
    let xml = fs::read_to_string(path)?;
    parse_str(&xml)
}
