//! Human-readable duration strings
//!
//! Jump distances are stored as short strings such as `"2m"` or `"01h02m03s"`.
//! A bare integer is read as minutes. Anything that does not match the grammar
//! parses to 0, which callers treat as "no valid distance".

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;

/// Parse a duration string into seconds.
///
/// Accepts either a bare integer (minutes) or optional `<n>h`, `<n>m`, `<n>s`
/// groups in that order. Returns 0 for empty, malformed or overflowing input.
pub fn parse(text: &str) -> u64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<u64>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(SECS_PER_MINUTE))
            .unwrap_or(0);
    }

    parse_groups(text).unwrap_or(0)
}

fn parse_groups(text: &str) -> Option<u64> {
    // Units must appear in this order, each at most once.
    const UNITS: [(u8, u64); 3] = [(b'h', SECS_PER_HOUR), (b'm', SECS_PER_MINUTE), (b's', 1)];

    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut next_unit = 0;
    let mut total: u64 = 0;

    while pos < bytes.len() {
        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start || pos == bytes.len() {
            return None;
        }

        let value: u64 = text[digits_start..pos].parse().ok()?;
        let unit = bytes[pos].to_ascii_lowercase();
        pos += 1;

        let offset = UNITS[next_unit..].iter().position(|&(u, _)| u == unit)?;
        let (_, scale) = UNITS[next_unit + offset];
        next_unit += offset + 1;

        total = total.checked_add(value.checked_mul(scale)?)?;
    }

    Some(total)
}

/// Format seconds as a duration string.
///
/// Only nonzero components are rendered, each zero-padded to two digits.
/// `format(0)` is the empty string.
pub fn format(seconds: u64) -> String {
    let hours = seconds / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{:02}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{:02}m", minutes));
    }
    if secs > 0 {
        out.push_str(&format!("{:02}s", secs));
    }
    out
}

/// Format a signed delta as `+<duration>` or `-<duration>`.
pub fn format_signed(delta: i64) -> String {
    let sign = if delta < 0 { '-' } else { '+' };
    format!("{}{}", sign, format(delta.unsigned_abs()))
}
