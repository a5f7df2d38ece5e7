//! Textual numbers as they appear in CellML and SED-ML documents
//!
//! Documents written by other SED-ML tools print doubles the way
//! `printf("%.15g")` does: 15 significant digits, scientific notation only for
//! exponents below -4 or from 15 up (`1e-07`, `0.5`, `1000`). [`format_double`] reproduces that format so that serialised
//! documents can be compared textually, and [`parse_double`] only accepts the
//! plain decimal grammar those documents use.

/// Number of significant digits used when formatting doubles.
const SIGNIFICANT_DIGITS: i32 = 15;

/// Relative factor used by [`fuzzy_compare`].
const ONE_TRILLION: f64 = 1_000_000_000_000.0;

/// Returns whether two doubles are equal up to a relative precision of 1e-12.
///
/// Note that, as with any relative comparison, `0.0` only compares equal to
/// `0.0`.
#[must_use]
pub fn fuzzy_compare(a: f64, b: f64) -> bool {
    (a - b).abs() * ONE_TRILLION <= a.abs().min(b.abs())
}

/// Formats a double using 15 significant digits, choosing between fixed and
/// scientific notation the way `printf("%.15g")` does.
#[must_use]
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }

    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // round to the requested number of significant digits first, since the
    // rounding may bump the exponent (e.g. 9.9999999999999999 -> 10)
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1).unsigned_abs() as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map_or((scientific.as_str(), "0"), |(mantissa, exponent)| (mantissa, exponent));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };

        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).unsigned_abs() as usize;
        let fixed = format!("{value:.decimals$}");

        trim_fraction(&fixed).to_string()
    }
}

/// Removes trailing zeros of the fractional part, and the dot if nothing is
/// left after it.
fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Parses a double written as `[+-]digits[.digits][(e|E)[+-]digits]`.
///
/// Returns `None` for anything else, including `nan`, `inf` and hexadecimal
/// forms that [`str::parse`] would otherwise accept.
#[must_use]
pub fn parse_double(text: &str) -> Option<f64> {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (significand, exponent) = match body.find(['e', 'E']) {
        Some(index) => (&body[..index], Some(&body[index + 1..])),
        None => (body, None),
    };

    let (integer, fraction) = significand.split_once('.').unwrap_or((significand, ""));
    let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());

    if !all_digits(integer) || !all_digits(fraction) {
        return None;
    }

    // the fraction must not be empty if there is a dot ("1." is rejected,
    // ".5" is accepted)
    if significand.ends_with('.') || (integer.is_empty() && fraction.is_empty()) {
        return None;
    }

    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);

        if digits.is_empty() || !all_digits(digits) {
            return None;
        }
    }

    text.parse().ok()
}

/// Parses an integer written as `0` or `[+-]<non-zero digit>digits`,
/// optionally followed by a positive exponent (`1e3`).
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(body) => (-1, body),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };

    if body == "0" {
        return Some(0);
    }

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(index) => (&body[..index], Some(&body[index + 1..])),
        None => (body, None),
    };

    if mantissa.is_empty()
        || mantissa.starts_with('0')
        || !mantissa.bytes().all(|byte| byte.is_ascii_digit())
    {
        return None;
    }

    let mut value: i64 = mantissa.parse().ok()?;

    if let Some(exponent) = exponent {
        let exponent = exponent.strip_prefix('+').unwrap_or(exponent);

        if exponent.is_empty() || !exponent.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        let exponent: u32 = exponent.parse().ok()?;

        value = value.checked_mul(10_i64.checked_pow(exponent)?)?;
    }

    value.checked_mul(sign)
}

/// Parses a boolean written as `true` or `false` (case insensitive).
#[must_use]
pub fn parse_boolean(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Formats a boolean as `true` or `false`.
#[must_use]
pub const fn format_boolean(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
