use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum WalltimeError {
    #[error("Walltime value '{0}' is not a number of minutes or a colon-separated duration")]
    InvalidValue(String),
}

/// Convert a walltime to whole seconds.
///
/// Accepted forms:
/// - a number of minutes, e.g. `"12"` or `"1.5"`
/// - a colon-separated duration, e.g. `"1:30"` or `"0:02:13"`, where the last component is
///   seconds and each component to the left is worth 60 times more
/// - an empty value or `"inf"`, both of which count as zero
pub fn walltime_to_seconds(walltime: &str) -> Result<u64, WalltimeError> {
    let value = walltime.trim();
    if value.is_empty() || value == "inf" {
        return Ok(0);
    }

    if value.contains(':') {
        let mut seconds = 0.0;
        for (i, component) in value.rsplit(':').enumerate() {
            let component = parse_non_negative(component.trim())
                .ok_or_else(|| WalltimeError::InvalidValue(walltime.to_string()))?;
            seconds += component * 60f64.powi(i as i32);
        }
        return Ok(seconds.round() as u64);
    }

    let minutes = parse_non_negative(value)
        .ok_or_else(|| WalltimeError::InvalidValue(walltime.to_string()))?;
    minutes_to_seconds(minutes)
}

/// Convert a number of minutes to whole seconds.
///
/// Negative and non-finite values are not durations.
pub fn minutes_to_seconds(minutes: f64) -> Result<u64, WalltimeError> {
    if minutes.is_finite() && minutes >= 0.0 {
        Ok((minutes * 60.0).round() as u64)
    } else {
        Err(WalltimeError::InvalidValue(minutes.to_string()))
    }
}

fn parse_non_negative(value: &str) -> Option<f64> {
    // `f64::from_str` also accepts "inf" and "NaN", which are not durations.
    if !value.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_are_minutes() {
        assert_eq!(walltime_to_seconds("0"), Ok(0));
        assert_eq!(walltime_to_seconds("5"), Ok(300));
        assert_eq!(walltime_to_seconds("1.5"), Ok(90));
        assert_eq!(walltime_to_seconds("0.01"), Ok(1));
        assert_eq!(walltime_to_seconds(" 2 "), Ok(120));
    }

    #[test]
    fn colon_durations() {
        assert_eq!(walltime_to_seconds("1:30"), Ok(90));
        assert_eq!(walltime_to_seconds("1:01:30"), Ok(3690));
        assert_eq!(walltime_to_seconds("0:00:05"), Ok(5));
        assert_eq!(walltime_to_seconds("2:00"), Ok(120));
        assert_eq!(walltime_to_seconds("0:01:02.6"), Ok(63));
    }

    #[test]
    fn empty_and_inf_are_zero() {
        assert_eq!(walltime_to_seconds(""), Ok(0));
        assert_eq!(walltime_to_seconds("   "), Ok(0));
        assert_eq!(walltime_to_seconds("inf"), Ok(0));
    }

    #[test]
    fn malformed_values_name_the_input() {
        let err = walltime_to_seconds("abc").unwrap_err();
        assert_eq!(err, WalltimeError::InvalidValue("abc".to_string()));
        assert!(err.to_string().contains("'abc'"));

        assert!(walltime_to_seconds("1:xx").is_err());
        assert!(walltime_to_seconds("1::").is_err());
        assert!(walltime_to_seconds("-3").is_err());
        assert!(walltime_to_seconds("NaN").is_err());
        assert!(walltime_to_seconds("infinity").is_err());
    }

    #[test]
    fn numeric_minutes() {
        assert_eq!(minutes_to_seconds(3.0), Ok(180));
        assert_eq!(minutes_to_seconds(0.5), Ok(30));
        assert_eq!(minutes_to_seconds(0.0), Ok(0));
        assert_eq!(minutes_to_seconds(0.01), Ok(1));
        assert!(minutes_to_seconds(-1.0).is_err());
        assert!(minutes_to_seconds(f64::NAN).is_err());
        assert!(minutes_to_seconds(f64::INFINITY).is_err());
    }
}
