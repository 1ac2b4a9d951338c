//! Header candidate parsing.
//!
//! Two header shapes are understood, both comma-separated, one entry per hop:
//!
//! ```text
//! X-Forwarded-For: 203.0.113.7, 10.0.0.2
//! Forwarded: for="[2001:db8::1]"; by=proxy, for=198.51.100.4:8080
//! ```
//!
//! Each segment is first scanned for a `for=` attribute (optionally quoted,
//! IPv6 bracketed, optional port). Segments without one are parsed as bare IP
//! literals. Anything else is skipped: a single misbehaving hop must not cost
//! us the rest of the chain.

use std::net::IpAddr;

const FOR_ATTRIBUTE: &str = "for=";

/// Extract candidate addresses from a proxy header value, left to right.
///
/// The value is trimmed and lower-cased first, so `FOR=` and `For=` are
/// accepted. Returns an empty list when nothing parses.
pub fn parse_candidates(value: &str) -> Vec<IpAddr> {
    let value = value.trim().to_lowercase();
    value
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<IpAddr> {
    match find_for_attribute(segment) {
        Some(raw) => raw.parse().ok(),
        None => segment.parse().ok(),
    }
}

/// Locate the first `for=` attribute whose value looks like an address and
/// return that address with brackets, quotes and port removed.
fn find_for_attribute(segment: &str) -> Option<&str> {
    let bytes = segment.as_bytes();
    let mut from = 0;

    while let Some(pos) = segment[from..].find(FOR_ATTRIBUTE) {
        let start = from + pos;
        from = start + FOR_ATTRIBUTE.len();

        // `for` must start a word: "xfor=1.2.3.4" is not an attribute
        if start > 0 && is_word_byte(bytes[start - 1]) {
            continue;
        }

        let rest = &segment[from..];
        let rest = rest.strip_prefix('"').unwrap_or(rest);
        if let Some(addr) = bracketed_ipv6(rest).or_else(|| dotted_ipv4(rest)) {
            return Some(addr);
        }
    }

    None
}

/// `[` hex-and-colons `]`, returning the inside of the brackets.
fn bracketed_ipv6(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('[')?;
    let end = inner.find(']')?;
    let inner = &inner[..end];
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_hexdigit() || b == b':') {
        return None;
    }
    Some(inner)
}

/// Four dot-separated groups of one to three digits at the start of `s`.
fn dotted_ipv4(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut end = 0;

    for group in 0..4 {
        if group > 0 {
            if bytes.get(end) != Some(&b'.') {
                return None;
            }
            end += 1;
        }
        let digits = bytes[end..]
            .iter()
            .take(3)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        end += digits;
    }

    Some(&s[..end])
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
