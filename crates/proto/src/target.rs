//! Sidebar click targets.

/// A parsed `<type>:<argument>` click target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
	/// Action kind, e.g. `farm`, `perk`, `log`.
	pub kind: &'a str,
	/// Everything after the first `:`, if present and non-empty.
	pub arg: Option<&'a str>,
}

impl<'a> Target<'a> {
	/// Splits `raw` at the first `:`.
	pub fn parse(raw: &'a str) -> Self {
		match raw.split_once(':') {
			Some((kind, arg)) => Self {
				kind,
				arg: (!arg.is_empty()).then_some(arg),
			},
			None => Self { kind: raw, arg: None },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_only() {
		assert_eq!(Target::parse("farm"), Target { kind: "farm", arg: None });
	}

	#[test]
	fn kind_and_argument() {
		assert_eq!(
			Target::parse("item:Apple"),
			Target {
				kind: "item",
				arg: Some("Apple")
			}
		);
	}

	#[test]
	fn argument_keeps_later_colons() {
		assert_eq!(Target::parse("loc:explore:Forest").arg, Some("explore:Forest"));
	}

	#[test]
	fn empty_argument_is_none() {
		assert_eq!(Target::parse("log:").arg, None);
	}
}
