use crate::errors::AppError;

/// Parse `M:SS` / `MM:SS` into whole seconds.
///
/// Minutes may have any number of digits; seconds must be below 60. Signs,
/// whitespace and fractional parts are rejected.
pub fn parse_time(input: &str) -> Result<f64, AppError> {
    let invalid = || {
        AppError::Parse(format!(
            "Invalid time '{}'. Use format MM:SS (e.g., 1:30)",
            input
        ))
    };

    let (minutes, seconds) = input.split_once(':').ok_or_else(invalid)?;
    if seconds.contains(':') {
        return Err(invalid());
    }

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(minutes) || !all_digits(seconds) || seconds.len() > 2 {
        return Err(invalid());
    }

    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds.parse().map_err(|_| invalid())?;
    if seconds >= 60 {
        return Err(invalid());
    }

    let total = minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(invalid)?;
    Ok(total as f64)
}

/// Render seconds as `M:SS`; `--:--` when the time is unknown.
pub fn format_time(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s.floor() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_short_and_long_minutes() {
        assert_eq!(parse_time("1:30").unwrap(), 90.0);
        assert_eq!(parse_time("01:05").unwrap(), 65.0);
        assert_eq!(parse_time("0:00").unwrap(), 0.0);
        assert_eq!(parse_time("125:59").unwrap(), 7559.0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let inputs = [
            "1:3o", "90", "1:60", "-1:30", "1:-5", "", ":30", "1:", "1:2:3", " 1:30", "1.5:00",
            "1:300",
        ];
        for input in inputs {
            assert!(
                matches!(parse_time(input), Err(AppError::Parse(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Some(0.0)), "0:00");
        assert_eq!(format_time(Some(65.9)), "1:05");
        assert_eq!(format_time(Some(3600.0)), "60:00");
        assert_eq!(format_time(None), "--:--");
        assert_eq!(format_time(Some(-1.0)), "--:--");
    }
}
