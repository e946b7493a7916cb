use thiserror::Error;

/// Minute/second separator used by a document family.
///
/// Body-language observations write `MM:SS`; outline and script
/// observations write `MM.SS`. Both mean minutes and seconds, so one
/// parser handles both. `.02` is two seconds, not a fraction of a minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Colon,
    Dot,
}

impl Separator {
    fn as_char(self) -> char {
        match self {
            Separator::Colon => ':',
            Separator::Dot => '.',
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp {0:?} is not in MM{1}SS form")]
    Malformed(String, char),
    #[error("timestamp {0:?} has a non-numeric part")]
    NotNumeric(String),
    #[error("timestamp {0:?} exceeds the representable offset")]
    OutOfRange(String),
}

/// Parse a single trimmed token like `"1:02"` or `"1.02"` into total seconds.
/// A missing minutes part (`".02"`) reads as minute zero.
pub fn parse_token(raw: &str, sep: Separator) -> Result<u32, TimestampError> {
    let token = raw.trim();
    let (minutes, seconds) = token
        .split_once(sep.as_char())
        .ok_or_else(|| TimestampError::Malformed(token.to_string(), sep.as_char()))?;

    let minutes = parse_part(minutes, token)?;
    let seconds = parse_part(seconds, token)?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| TimestampError::OutOfRange(token.to_string()))
}

fn parse_part(part: &str, token: &str) -> Result<u32, TimestampError> {
    let part = part.trim();
    if part.is_empty() {
        return Ok(0);
    }
    part.parse()
        .map_err(|_| TimestampError::NotNumeric(token.to_string()))
}

/// Split a possibly comma-separated timestamp string (`"1:02, 1:15"`) and
/// normalize each token independently. Each element pairs the trimmed label
/// with its parse result so a malformed token yields an inert control
/// instead of dropping the whole observation.
pub fn parse_list(raw: &str, sep: Separator) -> Vec<(String, Result<u32, TimestampError>)> {
    raw.split(',')
        .map(|token| {
            let label = token.trim().to_string();
            let parsed = parse_token(&label, sep);
            (label, parsed)
        })
        .collect()
}
