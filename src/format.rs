//! Display Formatting
//!
//! String renderings used in map tooltips and the statistics block. Missing or
//! non-finite values always render as [`MISSING`].

/// Placeholder for missing data
pub const MISSING: &str = "N/A";

fn displayable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Fixed-point with exactly 3 significant digits
///
/// `0.0456` -> `"0.0456"`, `12.345` -> `"12.3"`, `1234` -> `"1230"`, `0` -> `"0.00"`.
pub fn format_sig3(value: Option<f64>) -> String {
    let Some(v) = displayable(value) else {
        return MISSING.to_string();
    };
    if v == 0.0 {
        return "0.00".to_string();
    }

    let magnitude = v.abs().log10().floor() as i32;

    if v.abs() >= 1.0 {
        let digits_before_decimal = magnitude + 1;
        if digits_before_decimal > 3 {
            return sig3_integer(v);
        }
        let decimals = (3 - digits_before_decimal).max(0) as usize;
        format!("{:.*}", decimals, v)
    } else {
        let decimals = (2 - magnitude) as usize;
        format!("{:.*}", decimals, v)
    }
}

/// Integer rendering of `v` rounded to 3 significant digits (`|v| >= 1000`)
///
/// Digits come from the same `{:.2e}` rendering as [`format_scientific`].
fn sig3_integer(v: f64) -> String {
    let raw = format!("{:.2e}", v);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return MISSING.to_string();
    };
    let Ok(exponent) = exponent.parse::<usize>() else {
        return MISSING.to_string();
    };

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    format!("{}{}", digits, "0".repeat(exponent.saturating_sub(2)))
}

/// Scientific notation with 2 fractional digits and a signed 2-digit exponent
///
/// `12345` -> `"1.23e+04"`, `0.00012` -> `"1.20e-04"`, `0` -> `"0.00e+00"`.
pub fn format_scientific(value: Option<f64>) -> String {
    let Some(v) = displayable(value) else {
        return MISSING.to_string();
    };
    if v == 0.0 {
        return "0.00e+00".to_string();
    }

    // Rust renders "1.23e4" / "1.23e-4"
    let raw = format!("{:.2e}", v);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return MISSING.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return MISSING.to_string();
    };

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

/// Fixed decimals with comma thousands separators (`1234567.891, 2` -> `"1,234,567.89"`)
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0.00" would be misleading
    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
