//! Timestamp formatting for FFmpeg arguments and ASS subtitle events.

/// Format seconds as `HH:MM:SS.mmm` for FFmpeg arguments.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
}

/// Format seconds as `H:MM:SS.cc` for ASS dialogue events
/// (centisecond precision, single-digit hour).
pub fn seconds_to_ass(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;
    format!("{}:{:02}:{:05.2}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00.000");
        assert_eq!(format_seconds(90.0), "00:01:30.000");
        assert_eq!(format_seconds(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_seconds_to_ass() {
        assert_eq!(seconds_to_ass(0.0), "0:00:00.00");
        assert_eq!(seconds_to_ass(75.25), "0:01:15.25");
        assert_eq!(seconds_to_ass(3600.0), "1:00:00.00");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(seconds_to_ass(-3.0), "0:00:00.00");
        assert_eq!(format_seconds(-3.0), "00:00:00.000");
    }
}
