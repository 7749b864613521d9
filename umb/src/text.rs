//! Human-readable rendering helpers

/// Significant digits used for doubles in text exports
pub const DOUBLE_PRECISION: usize = 14;

/// Render a double with [`DOUBLE_PRECISION`] significant digits
pub fn format_double(value: f64) -> String {
    format_double_with(value, DOUBLE_PRECISION)
}

/// Render a double with `precision` significant digits
///
/// Values with a decimal exponent below -4 or at least `precision` use
/// scientific notation with a signed two-digit exponent (`1.5e+20`). Trailing
/// zeros are dropped but at least one fractional digit is kept.
pub fn format_double_with(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}"))
    }
}

fn trim_zeros(text: &str) -> String {
    if !text.contains('.') {
        return format!("{text}.0");
    }
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_notation() {
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(2.0), "2.0");
        assert_eq!(format_double(-0.25), "-0.25");
        assert_eq!(format_double(0.0), "0.0");
        assert_eq!(format_double(1.0 / 3.0), "0.33333333333333");
        assert_eq!(format_double(0.0001), "0.0001");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(format_double(1e20), "1.0e+20");
        assert_eq!(format_double(1e-5), "1.0e-05");
        assert_eq!(format_double(-2.5e-7), "-2.5e-07");
        assert_eq!(format_double(123456789012345.6), "1.2345678901235e+14");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::INFINITY), "Infinity");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_custom_precision() {
        assert_eq!(format_double_with(3.14159, 3), "3.14");
        assert_eq!(format_double_with(1234.0, 3), "1.23e+03");
    }
}
