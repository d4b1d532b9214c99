//! IP-range specification parsing and expansion.
//!
//! A specification is a comma-separated list of tokens. Each token is a CIDR
//! block (`192.168.1.0/24`), a dash range over the last octet
//! (`192.168.1.10-50`), a full dash range (`192.168.1.10-192.168.2.50`) or a
//! single address. Expansion happens before any scanning so malformed input
//! fails fast.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;

use super::DiscoveryError;

/// Expands a range specification into a deduplicated, ordered address set.
///
/// CIDR expansion excludes the network and broadcast addresses: a `/30`
/// yields exactly 2 usable hosts.
pub fn expand_range(spec: &str) -> Result<BTreeSet<Ipv4Addr>, DiscoveryError> {
    let mut addresses = BTreeSet::new();

    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.contains('/') {
            expand_cidr(token, &mut addresses)?;
        } else if token.contains('-') {
            expand_dash(token, &mut addresses)?;
        } else {
            let address = Ipv4Addr::from_str(token).map_err(|_| {
                DiscoveryError::InvalidRange(format!("Invalid IP address '{}'", token))
            })?;
            addresses.insert(address);
        }
    }

    if addresses.is_empty() {
        return Err(DiscoveryError::InvalidRange(format!(
            "Range specification '{}' expands to no addresses",
            spec
        )));
    }

    Ok(addresses)
}

fn expand_cidr(token: &str, addresses: &mut BTreeSet<Ipv4Addr>) -> Result<(), DiscoveryError> {
    let net = Ipv4Net::from_str(token)
        .map_err(|e| DiscoveryError::InvalidRange(format!("Invalid CIDR '{}': {}", token, e)))?;

    // `hosts()` skips network and broadcast addresses for prefixes shorter
    // than /31.
    addresses.extend(net.hosts());
    Ok(())
}

fn expand_dash(token: &str, addresses: &mut BTreeSet<Ipv4Addr>) -> Result<(), DiscoveryError> {
    let (start_str, end_str) = token.split_once('-').ok_or_else(|| {
        DiscoveryError::InvalidRange(format!("Invalid dash range '{}'", token))
    })?;

    let start = Ipv4Addr::from_str(start_str.trim()).map_err(|_| {
        DiscoveryError::InvalidRange(format!("Invalid range start '{}'", start_str))
    })?;

    let end_str = end_str.trim();
    let end = if let Ok(full) = Ipv4Addr::from_str(end_str) {
        full
    } else {
        // Shorthand form: the right side replaces the last octet.
        let last_octet: u8 = end_str.parse().map_err(|_| {
            DiscoveryError::InvalidRange(format!("Invalid range end '{}'", end_str))
        })?;
        let octets = start.octets();
        Ipv4Addr::new(octets[0], octets[1], octets[2], last_octet)
    };

    let start_num = u32::from(start);
    let end_num = u32::from(end);
    if start_num > end_num {
        return Err(DiscoveryError::InvalidRange(format!(
            "Range '{}' runs backwards",
            token
        )));
    }

    addresses.extend((start_num..=end_num).map(Ipv4Addr::from));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_slash_30_excludes_network_and_broadcast() {
        let addresses = expand_range("192.168.1.0/30").unwrap();
        let expected: BTreeSet<Ipv4Addr> = [
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
        ]
        .into();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn cidr_slash_24_yields_254_hosts() {
        let addresses = expand_range("10.0.0.0/24").unwrap();
        assert_eq!(addresses.len(), 254);
        assert!(!addresses.contains(&Ipv4Addr::new(10, 0, 0, 0)));
        assert!(!addresses.contains(&Ipv4Addr::new(10, 0, 0, 255)));
    }

    #[test]
    fn dash_range_shorthand_over_last_octet() {
        let addresses = expand_range("192.168.1.1-3").unwrap();
        let expected: BTreeSet<Ipv4Addr> = [
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
            Ipv4Addr::new(192, 168, 1, 3),
        ]
        .into();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn dash_range_full_form() {
        let addresses = expand_range("10.0.0.254-10.0.1.1").unwrap();
        assert_eq!(addresses.len(), 4);
        assert!(addresses.contains(&Ipv4Addr::new(10, 0, 1, 0)));
    }

    #[test]
    fn comma_separated_tokens_union_and_dedup() {
        let addresses = expand_range("192.168.1.1-3, 192.168.1.2, 192.168.1.10").unwrap();
        assert_eq!(addresses.len(), 4);
    }

    #[test]
    fn invalid_prefix_length_fails_fast() {
        let result = expand_range("192.168.1.0/33");
        assert!(matches!(result, Err(DiscoveryError::InvalidRange(_))));
    }

    #[test]
    fn malformed_address_fails_fast() {
        let result = expand_range("192.168.1.300");
        assert!(matches!(result, Err(DiscoveryError::InvalidRange(_))));
    }

    #[test]
    fn backwards_range_is_rejected() {
        let result = expand_range("192.168.1.50-10");
        assert!(matches!(result, Err(DiscoveryError::InvalidRange(_))));
    }

    #[test]
    fn empty_specification_is_rejected() {
        let result = expand_range("  ");
        assert!(matches!(result, Err(DiscoveryError::InvalidRange(_))));
    }
}
