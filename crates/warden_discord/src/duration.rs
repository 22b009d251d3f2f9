//! Duration parsing and rendering for timeout-style moderation actions.

use regex::Regex;
use std::sync::LazyLock;

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;
const WEEK_MS: u64 = 7 * DAY_MS;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*([smhdw])?$").expect("valid duration pattern"));

/// Parse a user-supplied duration into milliseconds.
///
/// A bare number is seconds; an optional case-insensitive unit suffix
/// selects seconds, minutes, hours, days, or weeks. Anything else, numeric
/// overflow included, parses to zero (fail closed: a zero-length timeout is
/// a no-op, never an accidental week).
pub fn parse_duration(input: &str) -> u64 {
    let Some(captures) = DURATION_RE.captures(input.trim()) else {
        return 0;
    };
    let Ok(amount) = captures[1].parse::<u64>() else {
        return 0;
    };
    let multiplier = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        None => SECOND_MS,
        Some(unit) => match unit.as_str() {
            "s" => SECOND_MS,
            "m" => MINUTE_MS,
            "h" => HOUR_MS,
            "d" => DAY_MS,
            "w" => WEEK_MS,
            _ => return 0,
        },
    };
    amount.saturating_mul(multiplier)
}

/// Render a millisecond duration with the largest whole unit below the day
/// cutoff, floor-rounded. The unit word is always plural.
pub fn format_duration(ms: u64) -> String {
    if ms < MINUTE_MS {
        format!("{} seconds", ms / SECOND_MS)
    } else if ms < HOUR_MS {
        format!("{} minutes", ms / MINUTE_MS)
    } else if ms < DAY_MS {
        format!("{} hours", ms / HOUR_MS)
    } else {
        format!("{} days", ms / DAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_number_is_seconds() {
        assert_eq!(parse_duration("30"), 30_000);
        assert_eq!(parse_duration("0"), 0);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("45s"), 45_000);
        assert_eq!(parse_duration("5m"), 300_000);
        assert_eq!(parse_duration("2h"), 7_200_000);
        assert_eq!(parse_duration("1d"), 86_400_000);
        assert_eq!(parse_duration("1w"), 604_800_000);
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        assert_eq!(parse_duration("10M"), 600_000);
        assert_eq!(parse_duration("  3 H "), 10_800_000);
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("soon"), 0);
        assert_eq!(parse_duration("10x"), 0);
        assert_eq!(parse_duration("-5m"), 0);
        assert_eq!(parse_duration("1.5h"), 0);
        // Overflowing numbers fail closed too.
        assert_eq!(parse_duration("99999999999999999999"), 0);
    }

    #[test]
    fn test_format_pinned_strings() {
        assert_eq!(format_duration(30_000), "30 seconds");
        assert_eq!(format_duration(60_000), "1 minutes");
        assert_eq!(format_duration(3_600_000), "1 hours");
        assert_eq!(format_duration(86_400_000), "1 days");
    }

    #[test]
    fn test_format_floor_rounds() {
        assert_eq!(format_duration(59_999), "59 seconds");
        assert_eq!(format_duration(119_000), "1 minutes");
        assert_eq!(format_duration(7_199_999), "1 hours");
        assert_eq!(format_duration(172_800_000), "2 days");
        assert_eq!(format_duration(0), "0 seconds");
    }
}
