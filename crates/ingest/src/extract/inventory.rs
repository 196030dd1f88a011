use std::sync::LazyLock;

use farmlore_store::Record;
use regex::Regex;

use super::html::elements;
use super::parse::parse_number;

static ITEM_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"item\.php\?id=(\d+)").expect("valid regex"));

/// One stack in the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
	/// Remote item id.
	pub id: String,
	/// Item name.
	pub name: String,
	/// Stack size.
	pub quantity: u64,
	/// Item image, when the row shows one.
	pub image: Option<String>,
}

impl InventoryRow {
	/// Item record carrying everything the row knows, `quantity` included.
	pub fn to_record(&self) -> Record {
		let mut rec = Record::new()
			.with("id", self.id.as_str())
			.with("name", self.name.as_str())
			.with("quantity", self.quantity);
		if let Some(image) = &self.image {
			rec.insert("image", image.as_str());
		}
		rec
	}
}

/// Reads every item link row of an inventory page.
///
/// A row is an `<a href="item.php?id=N">` holding an `item-title` and an
/// `item-after` with the quantity. Rows missing either are skipped.
pub fn extract_inventory(content: &str) -> Vec<InventoryRow> {
	elements(content, "a")
		.into_iter()
		.filter_map(|link| {
			let href = link.attr("href")?;
			let id = ITEM_HREF.captures(&href)?[1].to_string();
			let divs = elements(link.inner, "div");
			let name = divs.iter().find(|d| d.has_classes(&["item-title"]))?.text();
			let after = divs.iter().find(|d| d.has_classes(&["item-after"]))?.text();
			let Ok(quantity) = parse_number(&after) else {
				tracing::debug!(%id, %after, "skipping inventory row without a quantity");
				return None;
			};
			let image = elements(link.inner, "img").first().and_then(|img| img.attr("src"));
			(!name.is_empty()).then_some(InventoryRow { id, name, quantity, image })
		})
		.collect()
}
