//! Track duration display

/// Render a duration as `"<minutes> : <seconds>"`
///
/// Seconds are rounded to the nearest whole second and neither field is
/// zero-padded, so 205.4s renders as `"3 : 25"` and 59.6s as `"1 : 0"`.
/// Negative or non-finite input renders as `"0 : 0"`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{} : {}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(205.4), "3 : 25");
        assert_eq!(format_duration(59.6), "1 : 0");
        assert_eq!(format_duration(7.0), "0 : 7");
        assert_eq!(format_duration(3600.0), "60 : 0");
    }

    #[test]
    fn test_format_duration_degenerate_input() {
        assert_eq!(format_duration(0.0), "0 : 0");
        assert_eq!(format_duration(-3.0), "0 : 0");
        assert_eq!(format_duration(f64::NAN), "0 : 0");
    }
}
