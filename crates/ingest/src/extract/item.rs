use std::sync::LazyLock;

use farmlore_store::Record;
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use super::html::{elements, text_lines};
use super::parse::{parse_duration, parse_number, parse_yes};
use crate::error::{IngestError, Result};

static RECIPE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?):?\s+(\d+)x$").expect("valid regex"));
static RECIPE_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)x$").expect("valid regex"));

const DETAILS_HEADING: &str = "Item Details";
const RECIPE_HEADING: &str = "Crafting Recipe";
const MASTERY: &str = "Mastery Progress";

#[derive(Clone, Copy)]
enum Field {
	Number(&'static str),
	Text(&'static str),
	Flag(&'static str),
	Duration(&'static str),
}

const LABELS: &[(&str, Field)] = &[
	("Sell Price", Field::Number("sellPrice")),
	("Buy Price", Field::Number("buyPrice")),
	("XP Value", Field::Number("xp")),
	("Flea Market", Field::Number("fleaMarket")),
	("Rarity", Field::Text("rarity")),
	("Givable", Field::Flag("givable")),
	("Event Item", Field::Flag("event")),
	("Growth Time", Field::Duration("growthTime")),
];

/// Extracts an item record from an `item.php?id=N` page.
///
/// The record always carries `name`; `id` comes from the URL query and the
/// remaining fields from the item details and crafting recipe sections when
/// present.
pub fn extract_item(url: &str, content: &str) -> Result<Record> {
	let parsed = Url::parse(url).map_err(|e| IngestError::extract(url, format!("bad url: {e}")))?;
	let lines = text_lines(content);
	let mut item = Record::new();

	if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "id") {
		item.insert("id", id.into_owned());
	}
	let name = title(content)
		.or_else(|| labelled(&lines, "Name"))
		.ok_or_else(|| IngestError::extract(url, "no item name"))?;
	item.insert("name", name);
	if let Some(image) = elements(content, "img")
		.iter()
		.find(|img| img.has_classes(&["itemimglg"]))
		.and_then(|img| img.attr("src"))
	{
		item.insert("image", image);
	}

	let details = section(&lines, DETAILS_HEADING, &[RECIPE_HEADING]);
	for (i, line) in details.iter().enumerate() {
		if line.starts_with(MASTERY) {
			item.insert("mastery", true);
			continue;
		}
		for &(label, field) in LABELS {
			let Some(value) = label_value(details, i, label) else {
				continue;
			};
			match field {
				Field::Number(key) => item.insert(key, parse_number(&value)?),
				Field::Text(key) => item.insert(key, value),
				Field::Flag(key) => item.insert(key, parse_yes(&value)),
				Field::Duration(key) => item.insert(key, parse_duration(&value)?),
			};
		}
	}

	if lines.iter().any(|l| l == RECIPE_HEADING) {
		item.insert("recipe", recipe(section(&lines, RECIPE_HEADING, &[DETAILS_HEADING])));
	}
	Ok(item)
}

fn title(content: &str) -> Option<String> {
	elements(content, "div")
		.into_iter()
		.chain(elements(content, "h1"))
		.find(|el| el.has_classes(&["center", "sliding"]))
		.map(|el| el.text())
		.filter(|name| !name.is_empty())
}

fn labelled(lines: &[String], label: &str) -> Option<String> {
	(0..lines.len()).find_map(|i| label_value(lines, i, label))
}

/// Value for `label` if line `i` starts it: `Label: value` on the line itself,
/// or `Label` / `Label:` followed by the value on the next line.
fn label_value(lines: &[String], i: usize, label: &str) -> Option<String> {
	let rest = lines[i].strip_prefix(label)?;
	let rest = match rest.strip_prefix(':') {
		Some(after) => after.trim(),
		None if rest.is_empty() => "",
		None => return None,
	};
	if !rest.is_empty() {
		return Some(rest.to_string());
	}
	lines.get(i + 1).cloned()
}

/// Lines after `heading` up to the next of `until`. Without the heading, every line.
fn section<'a>(lines: &'a [String], heading: &str, until: &[&str]) -> &'a [String] {
	let Some(start) = lines.iter().position(|l| l == heading) else {
		return lines;
	};
	let body = &lines[start + 1..];
	let end = body
		.iter()
		.position(|l| until.contains(&l.as_str()))
		.unwrap_or(body.len());
	&body[..end]
}

fn recipe(lines: &[String]) -> Value {
	let mut ingredients = Map::new();
	let mut pending: Option<&str> = None;
	for line in lines {
		if let Some(cap) = RECIPE_ROW.captures(line) {
			if let Ok(n) = cap[2].parse::<u64>() {
				ingredients.insert(cap[1].trim().to_string(), n.into());
			}
			pending = None;
		} else if let (Some(name), Some(cap)) = (pending, RECIPE_COUNT.captures(line)) {
			if let Ok(n) = cap[1].parse::<u64>() {
				ingredients.insert(name.to_string(), n.into());
			}
			pending = None;
		} else if pending.is_none() {
			pending = Some(line);
		} else {
			break;
		}
	}
	Value::Object(ingredients)
}
