//! Vendor tag decoder
//!
//! Classifies raw scan text into a [`ParsedEquipment`] record. Rules are
//! tried in a fixed order and the first match wins; decoding never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ParsedEquipment, ScanEvent, TagFormat};

/// Mikrotik labels carry a colon-delimited MAC next to the serial
static MIKROTIK_MAC_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bMAC:\s*((?:[0-9A-F]{2}:){5}[0-9A-F]{2})\b")
        .expect("valid Mikrotik MAC pattern")
});

static MODEL_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bModel:\s*([A-Z0-9-]+)").expect("valid model pattern"));

static SN_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSN:\s*([A-Z0-9]+)").expect("valid serial pattern"));

static PID_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPID:\s*([A-Z0-9-]+)").expect("valid PID pattern"));

/// TP-Link prints the MAC with colons, dashes or no separator at all
static TPLINK_MAC_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bMAC:\s*([0-9A-F]{2}(?:[:-]?[0-9A-F]{2}){5})\b")
        .expect("valid TP-Link MAC pattern")
});

/// Bare MAC with one consistent delimiter, plus the label in front of it if any
static BARE_MAC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\bMAC:\s*)?\b((?:[0-9A-F]{2}:){5}[0-9A-F]{2}|(?:[0-9A-F]{2}-){5}[0-9A-F]{2})\b",
    )
    .expect("valid MAC pattern")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

pub const MIKROTIK_NAME: &str = "Mikrotik RouterBOARD";
pub const FALLBACK_NAME: &str = "Network Device";

/// Decode a scan event
pub fn decode_event(event: &ScanEvent) -> ParsedEquipment {
    decode(&event.raw_text, event.received_at_ms)
}

/// Decode raw scan text.
///
/// Pure: the same text and timestamp always give the same record. The
/// timestamp only feeds the placeholder serial used when nothing else is left.
pub fn decode(raw_text: &str, received_at_ms: i64) -> ParsedEquipment {
    let text = raw_text.trim();

    decode_mikrotik(raw_text, text)
        .or_else(|| decode_tplink(raw_text, text))
        .or_else(|| decode_cisco(raw_text, text))
        .or_else(|| decode_bare_mac(raw_text, text, received_at_ms))
        .unwrap_or_else(|| ParsedEquipment {
            raw_text: raw_text.to_string(),
            manufacturer: None,
            model: None,
            serial_number: non_empty_or_placeholder(text, received_at_ms),
            mac_address: None,
            suggested_name: FALLBACK_NAME.to_string(),
            format: TagFormat::Raw,
        })
}

fn decode_mikrotik(raw_text: &str, text: &str) -> Option<ParsedEquipment> {
    let serial = capture(&SN_FIELD, text)?;
    let mac = capture(&MIKROTIK_MAC_FIELD, text)?;
    Some(ParsedEquipment {
        raw_text: raw_text.to_string(),
        manufacturer: Some("Mikrotik".to_string()),
        model: None,
        serial_number: serial.to_string(),
        mac_address: Some(mac.to_uppercase()),
        suggested_name: MIKROTIK_NAME.to_string(),
        format: TagFormat::Mikrotik,
    })
}

fn decode_tplink(raw_text: &str, text: &str) -> Option<ParsedEquipment> {
    let model = capture(&MODEL_FIELD, text)?;
    let serial = capture(&SN_FIELD, text)?;
    let mac = capture(&TPLINK_MAC_FIELD, text)?;
    Some(ParsedEquipment {
        raw_text: raw_text.to_string(),
        manufacturer: Some("TP-Link".to_string()),
        suggested_name: format!("TP-Link {model}"),
        model: Some(model.to_string()),
        serial_number: serial.to_string(),
        mac_address: Some(mac.to_uppercase()),
        format: TagFormat::TpLink,
    })
}

fn decode_cisco(raw_text: &str, text: &str) -> Option<ParsedEquipment> {
    let pid = capture(&PID_FIELD, text)?;
    let serial = capture(&SN_FIELD, text)?;
    let format = if serial.to_ascii_uppercase().starts_with("FOC") {
        TagFormat::CiscoHardware
    } else {
        TagFormat::Cisco
    };
    Some(ParsedEquipment {
        raw_text: raw_text.to_string(),
        manufacturer: Some("Cisco".to_string()),
        suggested_name: format!("Cisco {pid}"),
        model: Some(pid.to_string()),
        serial_number: serial.to_string(),
        mac_address: None,
        format,
    })
}

fn decode_bare_mac(raw_text: &str, text: &str, received_at_ms: i64) -> Option<ParsedEquipment> {
    let caps = BARE_MAC.captures(text)?;
    let mac = caps[1].to_uppercase();

    let remainder = BARE_MAC.replace_all(text, " ");
    let remainder = WHITESPACE.replace_all(remainder.trim(), " ");

    Some(ParsedEquipment {
        raw_text: raw_text.to_string(),
        manufacturer: None,
        model: None,
        serial_number: non_empty_or_placeholder(&remainder, received_at_ms),
        mac_address: Some(mac),
        suggested_name: FALLBACK_NAME.to_string(),
        format: TagFormat::MacAddress,
    })
}

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn non_empty_or_placeholder(candidate: &str, received_at_ms: i64) -> String {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        placeholder_serial(received_at_ms)
    } else {
        candidate.to_string()
    }
}

/// `SN-<epoch millis in base 36, uppercase>`
pub fn placeholder_serial(received_at_ms: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut value = received_at_ms.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    format!("SN-{}", String::from_utf8_lossy(&digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanSource;

    const AT: i64 = 1_700_000_000_000;

    #[test]
    fn test_mikrotik_tag() {
        let parsed = decode("SN:ABC123456 MAC:AA:BB:CC:DD:EE:FF", AT);

        assert_eq!(parsed.manufacturer.as_deref(), Some("Mikrotik"));
        assert_eq!(parsed.serial_number, "ABC123456");
        assert_eq!(parsed.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(parsed.suggested_name, MIKROTIK_NAME);
        assert_eq!(parsed.model, None);
        assert_eq!(parsed.format, TagFormat::Mikrotik);
    }

    #[test]
    fn test_mikrotik_is_case_and_whitespace_insensitive() {
        let parsed = decode("  sn:abc123456   mac:aa:bb:cc:dd:ee:ff \n", AT);

        assert_eq!(parsed.format, TagFormat::Mikrotik);
        assert_eq!(parsed.serial_number, "abc123456");
        assert_eq!(parsed.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_mikrotik_fields_anywhere_in_label() {
        let parsed = decode("RB750Gr3 SN:ABC123456 MAC:AA:BB:CC:DD:EE:FF", AT);

        assert_eq!(parsed.format, TagFormat::Mikrotik);
        assert_eq!(parsed.manufacturer.as_deref(), Some("Mikrotik"));
        assert_eq!(parsed.serial_number, "ABC123456");
        assert_eq!(parsed.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));

        let parsed = decode("MAC:aa:bb:cc:dd:ee:ff SN:XYZ9", AT);
        assert_eq!(parsed.format, TagFormat::Mikrotik);
        assert_eq!(parsed.serial_number, "XYZ9");
        assert_eq!(parsed.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_tplink_tag() {
        let parsed = decode("Model:TL-R480 SN:123456 MAC:AABBCCDDEEFF", AT);

        assert_eq!(parsed.manufacturer.as_deref(), Some("TP-Link"));
        assert_eq!(parsed.model.as_deref(), Some("TL-R480"));
        assert_eq!(parsed.serial_number, "123456");
        assert_eq!(parsed.mac_address.as_deref(), Some("AABBCCDDEEFF"));
        assert_eq!(parsed.suggested_name, "TP-Link TL-R480");
        assert_eq!(parsed.format, TagFormat::TpLink);
    }

    #[test]
    fn test_tplink_with_delimited_mac() {
        let parsed = decode("MODEL:Archer-C6 SN:2231 MAC:a0-b1-c2-d3-e4-f5", AT);

        assert_eq!(parsed.format, TagFormat::TpLink);
        assert_eq!(parsed.model.as_deref(), Some("Archer-C6"));
        assert_eq!(parsed.mac_address.as_deref(), Some("A0-B1-C2-D3-E4-F5"));
    }

    #[test]
    fn test_cisco_variants() {
        let plain = decode("PID:WS-C2960-24 SN:ABC1234", AT);
        assert_eq!(plain.manufacturer.as_deref(), Some("Cisco"));
        assert_eq!(plain.model.as_deref(), Some("WS-C2960-24"));
        assert_eq!(plain.suggested_name, "Cisco WS-C2960-24");
        assert_eq!(plain.format, TagFormat::Cisco);

        let hardware = decode("pid:C9200L-24T sn:foc2233X0AB", AT);
        assert_eq!(hardware.format, TagFormat::CiscoHardware);
        assert_eq!(hardware.serial_number, "foc2233X0AB");
    }

    #[test]
    fn test_bare_mac_with_remainder() {
        let parsed = decode("RACK-7 00:1a:2b:3c:4d:5e", AT);

        assert_eq!(parsed.mac_address.as_deref(), Some("00:1A:2B:3C:4D:5E"));
        assert_eq!(parsed.serial_number, "RACK-7");
        assert_eq!(parsed.manufacturer, None);
        assert_eq!(parsed.format, TagFormat::MacAddress);
    }

    #[test]
    fn test_bare_mac_strips_dangling_label() {
        let parsed = decode("MAC: 00-1A-2B-3C-4D-5E", AT);

        assert_eq!(parsed.mac_address.as_deref(), Some("00-1A-2B-3C-4D-5E"));
        assert_eq!(parsed.serial_number, placeholder_serial(AT));
    }

    #[test]
    fn test_fallback_keeps_raw_text() {
        let parsed = decode("random-label-007", AT);

        assert_eq!(parsed.serial_number, "random-label-007");
        assert_eq!(parsed.manufacturer, None);
        assert_eq!(parsed.mac_address, None);
        assert_eq!(parsed.suggested_name, FALLBACK_NAME);
        assert_eq!(parsed.format, TagFormat::Raw);
    }

    #[test]
    fn test_blank_input_gets_placeholder() {
        let parsed = decode("   ", AT);
        assert_eq!(parsed.serial_number, placeholder_serial(AT));
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(placeholder_serial(0), "SN-0");
        assert_eq!(placeholder_serial(35), "SN-Z");
        assert_eq!(placeholder_serial(36), "SN-10");
        assert_eq!(placeholder_serial(AT), "SN-LOYW3V28");
    }

    #[test]
    fn test_incomplete_vendor_tags_fall_through() {
        // Model and serial without a MAC is not a TP-Link tag
        let parsed = decode("Model:TL-R480 SN:123456", AT);
        assert_eq!(parsed.format, TagFormat::Raw);

        // Serial with a dash-delimited MAC is not a Mikrotik tag
        let parsed = decode("SN:ABC MAC:AA-BB-CC-DD-EE-FF", AT);
        assert_eq!(parsed.format, TagFormat::MacAddress);
        assert_eq!(parsed.serial_number, "SN:ABC");

        // Colon MAC without a serial is just a MAC
        let parsed = decode("MAC:AA:BB:CC:DD:EE:FF", AT);
        assert_eq!(parsed.format, TagFormat::MacAddress);
    }

    #[test]
    fn test_decode_event_uses_event_timestamp() {
        let event = ScanEvent::new("", ScanSource::Camera, 36);
        assert_eq!(decode_event(&event).serial_number, "SN-10");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn mac_strategy() -> impl Strategy<Value = String> {
        (prop::array::uniform6(any::<u8>()), prop::bool::ANY).prop_map(|(bytes, colon)| {
            let sep = if colon { ":" } else { "-" };
            bytes
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(sep)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_decode_is_deterministic(raw in ".{0,60}", at in 0i64..4_000_000_000_000) {
            prop_assert_eq!(decode(&raw, at), decode(&raw, at));
        }

        #[test]
        fn prop_serial_never_empty(raw in ".{0,60}", at in 0i64..4_000_000_000_000) {
            prop_assert!(!decode(&raw, at).serial_number.is_empty());
        }

        #[test]
        fn prop_bare_mac_is_captured(
            prefix in "[A-Z]{0,8}",
            mac in mac_strategy(),
            at in 0i64..4_000_000_000_000,
        ) {
            let raw = format!("{prefix} {mac}");
            let parsed = decode(&raw, at);

            prop_assert_eq!(parsed.mac_address, Some(mac.to_uppercase()));
            prop_assert!(!parsed.serial_number.is_empty());
            if prefix.is_empty() {
                prop_assert_eq!(parsed.serial_number, placeholder_serial(at));
            } else {
                prop_assert_eq!(parsed.serial_number, prefix);
            }
        }

        #[test]
        fn prop_mikrotik_fields_survive_padding_and_case(
            serial in "[A-Z0-9]{4,12}",
            mac in mac_strategy(),
            pad in "[ \t]{0,3}",
            lower in prop::bool::ANY,
        ) {
            let mac = mac.replace('-', ":");
            let mut raw = format!("{pad}SN:{serial} MAC:{mac}{pad}");
            if lower {
                raw = raw.to_lowercase();
            }
            let parsed = decode(&raw, 0);

            prop_assert_eq!(parsed.format, TagFormat::Mikrotik);
            prop_assert_eq!(parsed.serial_number.to_uppercase(), serial);
            prop_assert_eq!(parsed.mac_address, Some(mac.to_uppercase()));
        }
    }
}
