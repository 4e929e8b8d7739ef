//! Tolerant score extraction from the final result payload.
//!
//! The payload is XML-like text, but nothing here depends on it being
//! well-formed.  A value is recognised in either of two shapes:
//!
//! ```text
//! <overall_score>87</overall_score>      element form
//! <read_sentence total_score="87" ...>   attribute form
//! ```
//!
//! Each [`Dimension`] is looked up under its tag names in order; the first
//! numeric hit wins.  A dimension with no hit is [`Score::NotFound`], never a
//! silent zero.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::result::{Dimension, PhoneDetail, PhoneError, Score, ScoreResult, WordScore};
use crate::protocol::ServerEnvelope;

/// Positions in the payload are reported in 10 ms frames.
const MS_PER_FRAME: u32 = 10;

// `<name>body` / `<name attrs>body`; group 2 ends with `/` on self-closing tags
static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z_]\w*)(\s[^>]*)?>([^<]*)").unwrap());
// ` name="v"` / ` name='v'`
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s([A-Za-z_]\w*)=(?:"([^"]*)"|'([^']*)')"#).unwrap());
// any `*score` element or attribute, in document order
static GENERIC_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(\w*score)>([^<]*)|\s(\w*score)=(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<word(\s[^>]*)>").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<phone(\s[^>]*)>").unwrap());

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("final envelope carries no result payload")]
    MissingPayload,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Decode the envelope's `data.data` and parse it.
pub fn parse_envelope(envelope: &ServerEnvelope) -> Result<ScoreResult, ParseError> {
    let encoded = envelope.payload().ok_or(ParseError::MissingPayload)?;
    Ok(parse_payload(&decode_payload(encoded)))
}

/// Base64-decode a result payload.  Text that is not valid base64 is taken
/// to be already decoded.
pub fn decode_payload(data: &str) -> String {
    let trimmed = data.trim();
    if trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    match BASE64.decode(trimmed) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => decode_non_utf8(e.as_bytes()),
        },
        Err(_) => trimmed.to_string(),
    }
}

/// GBK first; lossy UTF-8 when that fails too.
fn decode_non_utf8(bytes: &[u8]) -> String {
    match encoding_rs::GBK.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => {
            log::debug!("parser: payload decoded as GBK");
            text.into_owned()
        }
        None => {
            log::warn!("parser: payload is neither UTF-8 nor GBK; decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Extract every dimension, word detail and rejection flag from `payload`.
///
/// ```
/// use twister_eval::scoring::{parse_payload, Score};
///
/// let r = parse_payload("<overall>54</overall>");
/// assert_eq!(r.overall, Score::Found(54.0));
/// assert!(!r.fluency.is_found());
/// ```
pub fn parse_payload(payload: &str) -> ScoreResult {
    let mut result = ScoreResult {
        raw_payload: payload.to_string(),
        ..Default::default()
    };

    for dim in Dimension::ALL {
        match dim.tag_names().iter().find_map(|name| find_number(payload, name)) {
            Some(v) => result.set(dim, Score::Found(v)),
            None => log::debug!(
                "parser: {} not found (tried {:?})",
                dim.label(),
                dim.tag_names()
            ),
        }
    }

    if result.found_count() == 0 {
        if let Some((name, v)) = generic_scores(payload).into_iter().next() {
            log::debug!("parser: using generic `{name}` as overall");
            result.overall = Score::Found(v);
        }
    }

    result.word_details = parse_words(payload);

    result.rejected = find_raw(payload, "is_rejected").is_some_and(|v| v.trim() == "true");
    result.reject_reason = find_raw(payload, "except_info")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "0");

    result
}

// ---------------------------------------------------------------------------
// Tag scanning
// ---------------------------------------------------------------------------

fn find_number(payload: &str, name: &str) -> Option<f64> {
    element_values(payload, name)
        .chain(attribute_values(payload, name))
        .find_map(|raw| raw.trim().parse::<f64>().ok())
}

fn find_raw<'a>(payload: &'a str, name: &'a str) -> Option<&'a str> {
    attribute_values(payload, name)
        .next()
        .or_else(|| element_values(payload, name).next())
}

/// Text content of every `<name>` / `<name attrs>` element, in order.
fn element_values<'a>(payload: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    ELEMENT_RE
        .captures_iter(payload)
        .filter(move |c| &c[1] == name)
        .filter(|c| !c.get(2).is_some_and(|attrs| attrs.as_str().ends_with('/')))
        .filter_map(|c| c.get(3).map(|body| body.as_str()))
}

/// Value of every ` name="v"` / ` name='v'` attribute, in order.
fn attribute_values<'a>(payload: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    ATTRIBUTE_RE
        .captures_iter(payload)
        .filter(move |c| &c[1] == name)
        .filter_map(|c| c.get(2).or_else(|| c.get(3)).map(|v| v.as_str()))
}

/// Every `*score` tag (element or attribute) with a numeric value, in
/// document order.
fn generic_scores(payload: &str) -> Vec<(String, f64)> {
    GENERIC_SCORE_RE
        .captures_iter(payload)
        .filter_map(|c| {
            let name = c.get(1).or_else(|| c.get(3))?;
            let raw = c.get(2).or_else(|| c.get(4)).or_else(|| c.get(5))?;
            let value = raw.as_str().trim().parse::<f64>().ok()?;
            Some((name.as_str().to_string(), value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

fn parse_words(payload: &str) -> Vec<WordScore> {
    WORD_RE
        .captures_iter(payload)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let tag = c.get(1)?.as_str();
            let text = |name: &'static str| attribute_values(tag, name).next().unwrap_or_default();
            let number = |name: &'static str| text(name).trim().parse::<u32>().unwrap_or(0);

            let start_offset = number("beg_pos");
            let end_offset = number("end_pos");
            let frames = match number("time_len") {
                0 => end_offset.saturating_sub(start_offset),
                n => n,
            };

            // children run up to `</word>`; a self-closing tag has none
            let body = if tag.ends_with('/') {
                ""
            } else {
                let rest = &payload[whole.end()..];
                let end = [rest.find("</word>"), WORD_RE.find(rest).map(|m| m.start())]
                    .into_iter()
                    .flatten()
                    .min()
                    .unwrap_or(rest.len());
                &rest[..end]
            };

            Some(WordScore {
                content: text("content").to_string(),
                symbol: text("symbol").to_string(),
                start_offset,
                end_offset,
                duration_ms: frames.saturating_mul(MS_PER_FRAME),
                phone_errors: parse_phones(body),
            })
        })
        .collect()
}

fn parse_phones(body: &str) -> PhoneDetail {
    let mut phones = PHONE_RE.captures_iter(body).filter_map(|c| c.get(1)).peekable();
    if phones.peek().is_none() {
        return PhoneDetail::Unavailable;
    }

    let errors = phones
        .filter_map(|tag| {
            let tag = tag.as_str();
            let text = |name: &'static str| attribute_values(tag, name).next().unwrap_or_default();
            let raw = text("perr_msg").trim();
            let level = match raw.parse::<u8>() {
                Ok(0) => return None,
                Ok(level) => level,
                Err(_) if raw.is_empty() => return None,
                Err(_) => {
                    log::debug!("parser: unreadable perr_msg {raw:?}");
                    return None;
                }
            };
            Some(PhoneError {
                content: text("content").to_string(),
                level,
                is_yun: text("is_yun").trim() == "1",
                tone: text("mono_tone").to_string(),
            })
        })
        .collect();

    PhoneDetail::Errors(errors)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
