use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::html::{elements, text_lines};

static ACTIVE_LINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)^(?:current|active)\s+perk\s*set:\s*(.+)$").expect("valid regex"));

/// Perk sets offered on the perks page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Perks {
	/// Set name to remote id.
	pub perksets: BTreeMap<String, String>,
	/// Name of the active set, if the page shows it.
	pub current: Option<String>,
}

/// Reads perk set buttons (`class="activateperksetbtn" data-id="N"`) and the active set.
///
/// The active set is the button also carrying `active`, or else the value of
/// an `Active perkset: Name` line.
pub fn extract_perks(content: &str) -> Perks {
	let mut perks = Perks::default();
	for tag in ["a", "button"] {
		for el in elements(content, tag) {
			if !el.has_classes(&["activateperksetbtn"]) {
				continue;
			}
			let (Some(id), name) = (el.attr("data-id"), el.text()) else {
				continue;
			};
			if name.is_empty() {
				continue;
			}
			if el.has_classes(&["active"]) {
				perks.current = Some(name.clone());
			}
			perks.perksets.insert(name, id);
		}
	}
	if perks.current.is_none() {
		perks.current = text_lines(content)
			.iter()
			.find_map(|line| ACTIVE_LINE.captures(line).map(|cap| cap[1].trim().to_string()));
	}
	perks
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn buttons_and_active_class() {
		let page = r##"
			<a href="#" class="button activateperksetbtn" data-id="11">Farming</a>
			<a href="#" class="button activateperksetbtn active" data-id="12">Crafting</a>
			<a href="#" class="button">Reset</a>
		"##;
		let perks = extract_perks(page);
		assert_eq!(
			perks.perksets,
			BTreeMap::from([("Crafting".to_string(), "12".to_string()), ("Farming".to_string(), "11".to_string())])
		);
		assert_eq!(perks.current.as_deref(), Some("Crafting"));
	}

	#[test]
	fn active_line_fallback() {
		let page = r#"<p>Active Perkset: Farming</p><button class="activateperksetbtn" data-id="11">Farming</button>"#;
		assert_eq!(extract_perks(page).current.as_deref(), Some("Farming"));
	}

	#[test]
	fn page_without_sets() {
		assert_eq!(extract_perks("<p>nothing here</p>"), Perks::default());
	}
}
