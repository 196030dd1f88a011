//! Just enough HTML handling for the extractors: tag-delimited elements,
//! attribute lookup, and tag-stripped text lines.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)<\s*(?:br|/?div|/?p|/?li|/?ul|/?h[1-6]|/?tr|/?td|/?a|/?strong|/?span|/?option)\b[^>]*>")
		.expect("valid regex")
});
static ATTR: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));

/// One element found by [`elements`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
	/// Raw attribute text of the opening tag.
	pub attrs: &'a str,
	/// Markup between the opening and closing tag.
	pub inner: &'a str,
}

impl<'a> Element<'a> {
	/// Value of attribute `name`, entity-decoded.
	pub fn attr(&self, name: &str) -> Option<String> {
		ATTR.captures_iter(self.attrs).find_map(|cap| {
			cap[1]
				.eq_ignore_ascii_case(name)
				.then(|| decode_entities(cap.get(2).or_else(|| cap.get(3)).map_or("", |m| m.as_str())))
		})
	}

	/// Returns true if the `class` attribute lists every name in `classes`.
	pub fn has_classes(&self, classes: &[&str]) -> bool {
		let Some(class) = self.attr("class") else {
			return false;
		};
		classes.iter().all(|want| class.split_whitespace().any(|c| c == *want))
	}

	/// Tag-stripped inner text on one line.
	pub fn text(&self) -> String {
		text_lines(self.inner).join(" ")
	}
}

/// Every element named `tag`, including ones nested in another match.
///
/// `inner` runs to the first closing tag of the same name, so for nested
/// elements of one kind it is cut short. Void elements like `img` have an
/// empty `inner`.
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
	let void = matches!(tag, "img" | "input" | "br" | "meta" | "link");
	let Ok(open) = Regex::new(&format!(r"(?i)<{tag}\b([^>]*)>")) else {
		return Vec::new();
	};
	let close = format!("</{tag}");
	open.captures_iter(html)
		.filter_map(|cap| {
			let end = cap.get(0)?.end();
			let inner = if void {
				""
			} else {
				let rest = &html[end..];
				&rest[..rest.find(&close).unwrap_or(rest.len())]
			};
			Some(Element {
				attrs: cap.get(1)?.as_str(),
				inner,
			})
		})
		.collect()
}

/// Visible text split into trimmed, non-empty lines.
///
/// Block-level tags end a line; every other tag is dropped.
pub fn text_lines(html: &str) -> Vec<String> {
	let broken = BLOCK_TAG.replace_all(html, "\n");
	let stripped = TAG.replace_all(&broken, "");
	stripped
		.lines()
		.map(|line| decode_entities(line).split_whitespace().collect::<Vec<_>>().join(" "))
		.filter(|line| !line.is_empty())
		.collect()
}

/// Decodes the handful of entities the remote pages use.
pub fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}
	text.replace("&nbsp;", " ")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&#039;", "'")
		.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lines_follow_block_structure() {
		let html = r#"<div class="item-title">Sell Price</div><div class="item-after">1,234 <img src="/img/silver.png"></div>
			<br>Rarity: <strong>Rare</strong>"#;
		assert_eq!(text_lines(html), ["Sell Price", "1,234", "Rarity:", "Rare"]);
	}

	#[test]
	fn attributes_and_classes() {
		let html = r#"<img class='itemimglg big' src="/img/items/1.png?v=2&amp;x=1"><div class="center sliding">Apple &amp; Pear</div>"#;
		let img = &elements(html, "img")[0];
		assert!(img.has_classes(&["itemimglg"]));
		assert_eq!(img.attr("src").as_deref(), Some("/img/items/1.png?v=2&x=1"));

		let title = &elements(html, "div")[0];
		assert!(title.has_classes(&["sliding", "center"]));
		assert_eq!(title.text(), "Apple & Pear");
	}
}
