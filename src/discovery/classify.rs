//! Device-type heuristics and confidence scoring for probed hosts.

use std::collections::BTreeSet;

use crate::models::DeviceType;

/// TCP ports probed on every responsive host.
pub const PROBE_PORTS: [u16; 5] = [161, 80, 443, 9100, 515];

/// Hostname substrings that identify printer vendors.
pub const VENDOR_TOKENS: [&str; 14] = [
    "hp", "canon", "epson", "brother", "lexmark", "xerox", "ricoh", "kyocera", "sharp", "konica",
    "minolta", "oki", "dell", "samsung",
];

const PORT_RAW_PRINT: u16 = 9100;
const PORT_LPD: u16 = 515;
const PORT_SNMP: u16 = 161;
const PORT_HTTP: u16 = 80;
const PORT_HTTPS: u16 = 443;

/// Estimates the device type from open ports and the hostname.
pub fn classify(open_ports: &BTreeSet<u16>, hostname: Option<&str>) -> DeviceType {
    if open_ports.contains(&PORT_RAW_PRINT) || open_ports.contains(&PORT_LPD) {
        return DeviceType::Printer;
    }

    let has_web = open_ports.contains(&PORT_HTTP) || open_ports.contains(&PORT_HTTPS);
    if open_ports.contains(&PORT_SNMP) && has_web {
        return DeviceType::MultiFunctionDevice;
    }

    if let Some(hostname) = hostname {
        let lower = hostname.to_lowercase();
        if lower.contains("printer") || VENDOR_TOKENS.iter().any(|token| lower.contains(token)) {
            return DeviceType::Printer;
        }
    }

    DeviceType::Unknown
}

/// Computes the confidence score for a probed host, capped at 1.0.
pub fn confidence(open_ports: &BTreeSet<u16>, hostname: Option<&str>) -> f64 {
    let mut score: f64 = 0.0;

    if open_ports.contains(&PORT_RAW_PRINT) {
        score += 0.4;
    }
    if open_ports.contains(&PORT_LPD) {
        score += 0.3;
    }
    if open_ports.contains(&PORT_SNMP) {
        score += 0.2;
    }
    if open_ports.contains(&PORT_HTTP) || open_ports.contains(&PORT_HTTPS) {
        score += 0.1;
    }

    if let Some(hostname) = hostname {
        let lower = hostname.to_lowercase();
        if lower.contains("printer") {
            score += 0.3;
        }
        if VENDOR_TOKENS.iter().any(|token| lower.contains(token)) {
            score += 0.2;
        }
    }

    score.min(1.0)
}
