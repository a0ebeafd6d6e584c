/// Literal validators.
///
/// Each validator checks one decoded literal and either accepts it or
/// returns the reason it was rejected. Case folding is ASCII-only.
use regex::RegexBuilder;

use crate::model::enums::{Comparator, RelationalOp};
use crate::sieve::error::LiteralError;

/// Header fields that may appear in an `address` test in strict mode.
const ADDRESS_HEADERS: &[&str] = &[
    // RFC 2822 originator fields
    "from",
    "sender",
    "reply-to",
    // RFC 2822 destination fields
    "to",
    "cc",
    "bcc",
    // RFC 2822 resent fields
    "resent-from",
    "resent-sender",
    "resent-to",
    "resent-cc",
    "resent-bcc",
    // RFC 2822 trace fields
    "return-path",
    // RFC 2298 MDN request fields
    "disposition-notification-to",
    // non-standard, used for loop detection
    "delivered-to",
    // RFC 1036 moderator fields
    "approved",
];

const ENVELOPE_PARTS: &[&str] = &["from", "to", "auth"];

const SYSTEM_FLAGS: &[&str] = &["\\seen", "\\answered", "\\flagged", "\\draft", "\\deleted"];

const MAX_KEYWORD_LEN: usize = 1024;

/// RFC 822 field-name: one or more printable ASCII characters other than
/// space and `:`.
pub fn header_name(name: &str) -> Result<(), LiteralError> {
    let ftext = |b: u8| matches!(b, 33..=57 | 59..=126);
    if name.bytes().all(ftext) {
        Ok(())
    } else {
        Err(LiteralError::InvalidHeader(name.to_string()))
    }
}

pub fn address_header(name: &str, strict: bool) -> Result<(), LiteralError> {
    if !strict {
        return header_name(name);
    }
    let folded = name.to_ascii_lowercase();
    if ADDRESS_HEADERS.contains(&folded.as_str()) {
        Ok(())
    } else {
        Err(LiteralError::InvalidAddressHeader(name.to_string()))
    }
}

pub fn envelope_part(part: &str, strict: bool) -> Result<(), LiteralError> {
    if !strict || ENVELOPE_PARTS.contains(&part.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(LiteralError::InvalidEnvelopePart(part.to_string()))
    }
}

/// IMAP flag: either a system flag (`\Seen`, ...) or a keyword atom.
pub fn flag(flag: &str) -> Result<(), LiteralError> {
    if flag.starts_with('\\') {
        let folded = flag.to_ascii_lowercase();
        return if SYSTEM_FLAGS.contains(&folded.as_str()) {
            Ok(())
        } else {
            Err(LiteralError::NotSystemFlag(flag.to_string()))
        };
    }
    if is_atom(flag) {
        Ok(())
    } else {
        Err(LiteralError::InvalidKeyword(flag.to_string()))
    }
}

fn is_atom(s: &str) -> bool {
    let atom_char = |b: u8| {
        !(b >= 0x80
            || b < 0x20
            || b == 0x7f
            || matches!(b, b' ' | b'{' | b'(' | b')' | b'"' | b'%' | b'*' | b'\\'))
    };
    !s.is_empty() && s.len() < MAX_KEYWORD_LEN && s.bytes().all(atom_char)
}

pub fn relational(op: &str) -> Result<RelationalOp, LiteralError> {
    RelationalOp::from_sieve(op).ok_or_else(|| LiteralError::InvalidRelation(op.to_string()))
}

/// Compiles `pattern` the way the interpreter will, case-insensitively when
/// the comparator folds case.
pub fn regex(pattern: &str, case_insensitive: bool) -> Result<(), LiteralError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map(|_| ())
        .map_err(|e| LiteralError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Checks every pattern of a key list, stopping at the first bad one.
/// Matching is case-insensitive under `i;ascii-casemap`.
pub fn regex_list(patterns: &[String], comparator: &str) -> Result<(), LiteralError> {
    let case_insensitive = comparator == Comparator::AsciiCasemap.as_sieve();
    string_list(patterns, |p| regex(p, case_insensitive))
}

/// Applies `check` to every element, short-circuiting on the first failure.
pub fn string_list<F>(items: &[String], check: F) -> Result<(), LiteralError>
where
    F: Fn(&str) -> Result<(), LiteralError>,
{
    items.iter().try_for_each(|item| check(item.as_str()))
}

/// Byte-oriented UTF-8 check.
///
/// Accepts the original (RFC 2279) 1 to 6 byte forms and rejects overlong
/// encodings, stray continuation bytes and truncated sequences.
pub fn utf8(bytes: &[u8]) -> bool {
    let mut trailing = 0u8;
    let mut second_byte_mask = 0u8;

    for &c in bytes {
        if trailing > 0 {
            if c & 0xC0 != 0x80 {
                return false;
            }
            if second_byte_mask != 0 {
                // Lead byte had no payload bits; the first continuation byte
                // must carry at least one in its protected range.
                if c & second_byte_mask == 0 {
                    return false;
                }
                second_byte_mask = 0;
            }
            trailing -= 1;
            continue;
        }

        let (count, payload, mask) = match c {
            _ if c & 0x80 == 0x00 => continue,
            _ if c & 0xE0 == 0xC0 => (1, c & 0x1E, 0),
            _ if c & 0xF0 == 0xE0 => (2, c & 0x0F, 0x20),
            _ if c & 0xF8 == 0xF0 => (3, c & 0x07, 0x30),
            _ if c & 0xFC == 0xF8 => (4, c & 0x03, 0x38),
            _ if c & 0xFE == 0xFC => (5, c & 0x01, 0x3C),
            _ => return false,
        };
        if payload == 0 {
            if count == 1 {
                // 0xC0 and 0xC1 only ever encode ASCII.
                return false;
            }
            second_byte_mask = mask;
        }
        trailing = count;
    }

    trailing == 0
}

/// Converts a string literal that has to be UTF-8.
pub fn utf8_string(bytes: Vec<u8>) -> Result<String, LiteralError> {
    if !utf8(&bytes) {
        return Err(LiteralError::NotUtf8(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
    }
    // The 5 and 6 byte forms pass the check above but have no `str` form.
    String::from_utf8(bytes)
        .map_err(|e| LiteralError::NotUtf8(String::from_utf8_lossy(e.as_bytes()).into_owned()))
}
