/// Render a float as label text: shortest round-trip digits, a trailing `.0`
/// on integral values, and scientific notation with a signed two-digit
/// exponent outside `1e-4..1e16`.
///
/// Wide column labels and persisted tables both use this form, so the same
/// frequency always produces the same label.
///
/// # Examples
///
/// ```
/// use eis_core::formatting::format_float;
///
/// assert_eq!(format_float(100000.0), "100000.0");
/// assert_eq!(format_float(0.1), "0.1");
/// assert_eq!(format_float(0.00001), "1e-05");
/// assert_eq!(format_float(-3.24), "-3.24");
/// assert_eq!(format_float(1e16), "1e+16");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip mantissa, e.g. "1.2345e-5".
    let sci = format!("{:e}", value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };

    if (-4..16).contains(&exponent) {
        let plain = format!("{}", value);
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use eis_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a tiny epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a frequency in hertz with an SI prefix.
///
/// # Examples
///
/// ```
/// use eis_core::formatting::format_frequency;
///
/// assert_eq!(format_frequency(100000.0), "100 kHz");
/// assert_eq!(format_frequency(12.5), "12.5 Hz");
/// assert_eq!(format_frequency(0.1), "100 mHz");
/// assert_eq!(format_frequency(2.5e6), "2.5 MHz");
/// ```
pub fn format_frequency(hz: f64) -> String {
    let abs = hz.abs();
    let (scaled, unit) = if abs >= 1e6 {
        (hz / 1e6, "MHz")
    } else if abs >= 1e3 {
        (hz / 1e3, "kHz")
    } else if abs >= 1.0 || abs == 0.0 {
        (hz, "Hz")
    } else if abs >= 1e-3 {
        (hz * 1e3, "mHz")
    } else {
        (hz * 1e6, "µHz")
    };
    format!("{} {}", trim_decimal(&format!("{:.2}", scaled)), unit)
}

/// Compact label for a chart axis tick.
///
/// Large magnitudes drop decimals and very small ones switch to scientific
/// notation so labels stay a few columns wide.
pub fn format_axis_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e6 || (abs > 0.0 && abs < 1e-2) {
        format!("{:.1e}", value)
    } else if abs >= 100.0 {
        format_number(value, 0)
    } else if abs >= 10.0 {
        format_number(value, 1)
    } else {
        format_number(value, 2)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Strip trailing zeros (and a dangling point) from a fixed-point string.
fn trim_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
