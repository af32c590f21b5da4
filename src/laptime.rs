/// Digits in a fully keyed-in time: 2 minutes, 2 seconds, 3 milliseconds.
pub const TIME_DIGITS: usize = 7;

/// Largest value accepted for the minutes and seconds groups while typing.
const MAX_TIME_GROUP: u64 = 60;

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_digits_max(s: &str, max_len: usize) -> bool {
    is_digits(s) && s.len() <= max_len
}

// Millisecond groups are written left-aligned: "5" means 500ms, not 5ms.
fn pad_ms(raw: &str) -> Option<u64> {
    let mut digits = raw.to_string();
    while digits.len() < 3 {
        digits.push('0');
    }
    digits[..3].parse().ok()
}

fn combine(minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Parses a lap/sector time into integer milliseconds.
///
/// Accepted shapes, tried in order:
/// - "0130000"   exactly 7 digits, mm ss mmm
/// - "1 30 000"  m ss mmm, whitespace separated
/// - "1:30:000"  m:ss:mmm (preferred)
/// - "1:30.000"  legacy m:ss(.mmm)
/// - "84.567"    plain seconds
///
/// Commas count as decimal points. Anything else yields None.
pub fn parse_ms(input: &str) -> Option<u64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', ".");

    if s.len() == TIME_DIGITS && is_digits(&s) {
        let minutes = s[0..2].parse().ok()?;
        let seconds = s[2..4].parse().ok()?;
        let millis = s[4..7].parse().ok()?;
        return combine(minutes, seconds, millis);
    }

    let spaced: Vec<&str> = s.split_whitespace().collect();
    if spaced.len() == 3
        && is_digits(spaced[0])
        && is_digits_max(spaced[1], 2)
        && is_digits_max(spaced[2], 3)
    {
        let minutes = spaced[0].parse().ok()?;
        let seconds = spaced[1].parse().ok()?;
        return combine(minutes, seconds, pad_ms(spaced[2])?);
    }

    let colons: Vec<&str> = s.split(':').collect();
    if colons.len() == 3
        && is_digits(colons[0])
        && is_digits_max(colons[1], 2)
        && is_digits_max(colons[2], 3)
    {
        let minutes = colons[0].parse().ok()?;
        let seconds = colons[1].parse().ok()?;
        return combine(minutes, seconds, pad_ms(colons[2])?);
    }
    if colons.len() == 2 && is_digits(colons[0]) {
        let (sec_part, ms_part) = match colons[1].split_once('.') {
            Some((sec, ms)) => (sec, ms),
            None => (colons[1], "0"),
        };
        if is_digits_max(sec_part, 2) && is_digits_max(ms_part, 3) {
            let minutes = colons[0].parse().ok()?;
            let seconds = sec_part.parse().ok()?;
            return combine(minutes, seconds, pad_ms(ms_part)?);
        }
        return None;
    }

    let (sec_part, ms_part) = match s.split_once('.') {
        Some((sec, ms)) => (sec, ms),
        None => (s.as_str(), "0"),
    };
    if is_digits(sec_part) && is_digits_max(ms_part, 3) {
        let seconds: u64 = sec_part.parse().ok()?;
        return seconds.checked_mul(1000)?.checked_add(pad_ms(ms_part)?);
    }

    None
}

/// Formats milliseconds as "mm:ss:mmm", with a leading "-" when negative.
pub fn format_ms(ms: i64) -> String {
    let value = ms.unsigned_abs();
    let total_sec = value / 1000;
    let minutes = total_sec / 60;
    let seconds = total_sec % 60;
    let millis = value % 1000;
    let out = format!("{minutes:02}:{seconds:02}:{millis:03}");
    if ms < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// Formats an optional cell value; absent values render as empty text.
pub fn format_opt(ms: Option<u64>) -> String {
    match ms {
        Some(value) => format_ms(value as i64),
        None => String::new(),
    }
}

/// Keeps only digits and whitespace from raw cell input, collapsing
/// whitespace runs to single spaces so "1  30   000" stays typeable.
pub fn sanitize_time_input(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            out.push(c);
            pending_space = false;
        } else if c.is_whitespace() && !out.is_empty() {
            pending_space = true;
        }
    }
    if pending_space {
        out.push(' ');
    }
    out
}

/// Expands a partial digit run into the full 7-digit "mmssmmm" form.
///
/// 1-2 digits are minutes, 3 digits are mm + one-digit seconds, 4 digits are
/// mm + ss, 5-7 digits fill milliseconds left-aligned. Returns None when the
/// run is empty, longer than 7 digits, or the minutes/seconds groups exceed
/// 60 — the caller must then keep the previous text untouched.
pub fn normalize_digits(digits: &str) -> Option<String> {
    let raw: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    if raw.is_empty() || raw.len() > TIME_DIGITS {
        return None;
    }

    let padded = match raw.len() {
        1 | 2 => format!("{raw:0>2}00000"),
        3 => format!("{}0{}000", &raw[..2], &raw[2..3]),
        4 => format!("{}{}000", &raw[..2], &raw[2..4]),
        _ => {
            let mut p = raw.clone();
            while p.len() < TIME_DIGITS {
                p.push('0');
            }
            p
        }
    };

    let minutes: u64 = padded[0..2].parse().ok()?;
    let seconds: u64 = padded[2..4].parse().ok()?;
    if minutes > MAX_TIME_GROUP || seconds > MAX_TIME_GROUP {
        return None;
    }
    Some(padded)
}

/// Renders a normalized 7-digit run as "mm:ss:mmm"; anything else is empty.
pub fn digits_to_time_text(digits: &str) -> String {
    if digits.len() != TIME_DIGITS || !is_digits(digits) {
        return String::new();
    }
    format!("{}:{}:{}", &digits[0..2], &digits[2..4], &digits[4..7])
}
