use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IngestError, Result};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9][0-9,]*)").expect("valid regex"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?:(\d+)d\s+)?(?:(\d+)h\s+)?(?:(\d+)m\s+)?base time").expect("valid regex")
});

/// Parses the leading integer of `text`, ignoring thousands separators.
///
/// `"1,234 Silver"` is 1234.
pub fn parse_number(text: &str) -> Result<u64> {
	let invalid = || IngestError::Parse {
		what: "number",
		input: text.to_string(),
	};
	let digits = NUMBER.captures(text.trim()).ok_or_else(invalid)?[1].replace(',', "");
	digits.parse().map_err(|_| invalid())
}

/// Parses `"1d 2h 3m base time"` (every part optional) into seconds.
pub fn parse_duration(text: &str) -> Result<u64> {
	let invalid = || IngestError::Parse {
		what: "duration",
		input: text.to_string(),
	};
	let cap = DURATION.captures(text.trim()).ok_or_else(invalid)?;
	let part = |i: usize| match cap.get(i) {
		Some(m) => m.as_str().parse::<u64>().map_err(|_| invalid()),
		None => Ok(0),
	};
	let (days, hours, minutes) = (part(1)?, part(2)?, part(3)?);
	days.checked_mul(24)
		.and_then(|h| h.checked_add(hours))
		.and_then(|h| h.checked_mul(60))
		.and_then(|m| m.checked_add(minutes))
		.and_then(|m| m.checked_mul(60))
		.ok_or_else(invalid)
}

/// `"Yes"` is true; anything else is false.
pub fn parse_yes(text: &str) -> bool {
	text.trim() == "Yes"
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numbers_drop_every_separator() {
		assert_eq!(parse_number("1,234").unwrap(), 1234);
		assert_eq!(parse_number("1,234,567 Silver").unwrap(), 1_234_567);
		assert_eq!(parse_number(" 15").unwrap(), 15);
		assert!(parse_number("Silver").is_err());
		assert!(parse_number("").is_err());
	}

	#[test]
	fn durations() {
		assert_eq!(parse_duration("1d 2h 3m base time").unwrap(), 93_780);
		assert_eq!(parse_duration("2h base time").unwrap(), 7_200);
		assert_eq!(parse_duration("45m base time").unwrap(), 2_700);
		assert_eq!(parse_duration("base time").unwrap(), 0);
		assert!(parse_duration("2 hours").is_err());
	}

	#[test]
	fn oversized_durations_are_errors() {
		let overflowing = parse_duration("768614336404564651d base time").unwrap_err();
		assert!(matches!(overflowing, IngestError::Parse { what: "duration", .. }));
		let too_many_digits = parse_duration("99999999999999999999999d base time").unwrap_err();
		assert!(matches!(too_many_digits, IngestError::Parse { what: "duration", .. }));
	}
}
