//! Lenient parsing of feed values.
//!
//! The feed mixes plain numbers, unit-suffixed ranges (`"30.0~50.0mm"`) and
//! Korean placeholder strings. Nothing here fails: unrecognized input maps
//! to zero or to `None`.

/// Placeholder sent in `PCP` when no precipitation is expected.
pub const NO_PRECIPITATION: &str = "강수없음";
/// Placeholder sent in `SNO` when no snowfall is expected.
pub const NO_SNOWFALL: &str = "적설없음";

/// Hourly precipitation in millimetres.
pub fn parse_precipitation(value: &str) -> f64 {
    parse_amount(value, NO_PRECIPITATION, "mm")
}

/// Hourly new snow in centimetres.
pub fn parse_snow(value: &str) -> f64 {
    parse_amount(value, NO_SNOWFALL, "cm")
}

fn parse_amount(value: &str, none: &str, unit: &str) -> f64 {
    let value = value.trim();
    if value == none || value == "0" {
        return 0.0;
    }
    if value.contains(unit) {
        return parse_number(&value.replace(unit, "")).unwrap_or(0.0);
    }
    0.0
}

/// Leading decimal number of `value`, ignoring whatever trails it.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let bytes = value.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 {
            has_digits = true;
            end = frac;
        } else if has_digits {
            end += 1;
        }
    }

    if !has_digits {
        return None;
    }
    value[..end].parse().ok().filter(|n: &f64| n.is_finite())
}

/// Leading integer part, truncated toward zero.
pub fn parse_int(value: &str) -> Option<i32> {
    parse_number(value).map(|n| n.trunc() as i32)
}

/// Round to the nearest integer, halves toward positive infinity.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precipitation_sentinels() {
        assert_eq!(parse_precipitation("강수없음"), 0.0);
        assert_eq!(parse_precipitation("0"), 0.0);
        assert_eq!(parse_precipitation("3.0mm"), 3.0);
        assert_eq!(parse_precipitation("1mm 미만"), 1.0);
        assert_eq!(parse_precipitation("30.0~50.0mm"), 30.0);
        assert_eq!(parse_precipitation("50.0mm 이상"), 50.0);
    }

    #[test]
    fn precipitation_unrecognized_is_zero() {
        assert_eq!(parse_precipitation("garbage"), 0.0);
        assert_eq!(parse_precipitation(""), 0.0);
        assert_eq!(parse_precipitation("mm"), 0.0);
        // A bare number without unit is not a recognized encoding.
        assert_eq!(parse_precipitation("2.5"), 0.0);
    }

    #[test]
    fn snow_sentinels() {
        assert_eq!(parse_snow("적설없음"), 0.0);
        assert_eq!(parse_snow("0"), 0.0);
        assert_eq!(parse_snow("0.5cm"), 0.5);
        assert_eq!(parse_snow("1cm 미만"), 1.0);
        assert_eq!(parse_snow("5.0cm 이상"), 5.0);
        assert_eq!(parse_snow("3.0mm"), 0.0);
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number(" -3.5"), Some(-3.5));
        assert_eq!(parse_number("4.2m/s"), Some(4.2));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("7."), Some(7.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn integers_truncate() {
        assert_eq!(parse_int("55"), Some(55));
        assert_eq!(parse_int("55.9"), Some(55));
        assert_eq!(parse_int("-3.7"), Some(-3));
        assert_eq!(parse_int("n/a"), None);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.4), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }
}
