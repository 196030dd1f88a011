use std::sync::LazyLock;

use regex::Regex;

static FARM_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"xfarm\.php\?id=(\d+)").expect("valid regex"));

/// Id of the player's own farm, from the first `xfarm.php?id=N` link on the page.
pub fn extract_farm_id(content: &str) -> Option<String> {
	FARM_LINK.captures(content).map(|cap| cap[1].to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_farm_link_wins() {
		let page = r#"<a href="xfarm.php?id=4410" class="item-link">My Farm</a> <a href="xfarm.php?id=9">Other</a>"#;
		assert_eq!(extract_farm_id(page).as_deref(), Some("4410"));
		assert_eq!(extract_farm_id("<a href=\"farm.php\">x</a>"), None);
	}
}
