use anyhow::{anyhow, bail};

/// Extracts the altitude from a record's text: the number after the last comma, or the whole
///  line if there is no comma. Anything before the last comma (typically the sender's index) is
///  ignored.
///
/// Number parsing is prefix based: leading whitespace is skipped, and the longest valid
///  floating point literal at the start of the candidate is used, ignoring trailing characters.
///  Only decimal literals (plus `inf`/`infinity`/`nan`) are recognized, so `0x10` reads as `0`.
///  It fails if there is no such literal, or if the literal is out of the range of normal `f64`
///  values, i.e. it overflows to infinity or underflows to zero or a subnormal.
pub fn parse_altitude(line: &str) -> anyhow::Result<f64> {
    let candidate = match line.rfind(',') {
        Some(pos) => &line[pos + 1..],
        None => line,
    };
    parse_float_prefix(candidate)
}

fn parse_float_prefix(s: &str) -> anyhow::Result<f64> {
    let s = s.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b');
    let bytes = s.as_bytes();

    let mut end = 0;
    let mut negative = false;
    if let Some(&sign) = bytes.first() {
        if sign == b'+' || sign == b'-' {
            negative = sign == b'-';
            end = 1;
        }
    }

    if let Some(special) = parse_special(&bytes[end..]) {
        return Ok(if negative { -special } else { special });
    }

    let mantissa_start = end;
    end = skip_digits(bytes, end);
    let mut num_digits = end - mantissa_start;
    if bytes.get(end) == Some(&b'.') {
        let after_fraction = skip_digits(bytes, end + 1);
        let num_fraction_digits = after_fraction - (end + 1);
        if num_digits + num_fraction_digits > 0 {
            num_digits += num_fraction_digits;
            end = after_fraction;
        }
    }
    if num_digits == 0 {
        bail!("no numeric value");
    }
    let mantissa_end = end;

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let after_exp = skip_digits(bytes, exp);
        if after_exp > exp {
            end = after_exp;
        }
    }

    let literal = &s[..end];
    let value: f64 = literal.parse()
        .map_err(|e| anyhow!("invalid number {:?}: {}", literal, e))?;

    if value.is_infinite() {
        bail!("{} is out of range", literal);
    }
    if value == 0.0 && bytes[mantissa_start..mantissa_end].iter().any(|b| (b'1'..=b'9').contains(b)) {
        bail!("{} underflows to zero", literal);
    }
    if value != 0.0 && !value.is_normal() {
        bail!("{} is too small for a normal value", literal);
    }
    Ok(value)
}

fn skip_digits(bytes: &[u8], from: usize) -> usize {
    from + bytes[from.min(bytes.len())..].iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
}

fn parse_special(bytes: &[u8]) -> Option<f64> {
    for (word, value) in [(&b"infinity"[..], f64::INFINITY), (&b"inf"[..], f64::INFINITY), (&b"nan"[..], f64::NAN)] {
        if bytes.len() >= word.len() && bytes[..word.len()].eq_ignore_ascii_case(word) {
            return Some(value);
        }
    }
    None
}
