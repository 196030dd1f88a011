//! Page filters the hub registers on its ingestion pipeline.

use farmlore_ingest::extract::{extract_farm_id, extract_inventory, extract_item, extract_perks};
use farmlore_ingest::{Page, Pipeline, Result};
use serde_json::json;

use crate::config::HubConfig;
use crate::context::HubContext;

/// Builds the default pipeline for the application at `config.origin()`.
///
/// Every handled page is followed by a state broadcast. Only pages that
/// changed anything are appended to the activity log.
pub fn default_pipeline(config: &HubConfig) -> Result<Pipeline<HubContext>> {
	let origin = config.origin();
	let mut pipeline = Pipeline::new();
	pipeline.register_fn(&format!("{origin}/item.php?*"), ingest_item)?;
	pipeline.register_fn(&format!("{origin}/{}*", config.pages.inventory), ingest_inventory)?;
	pipeline.register_fn(&format!("{origin}/{}*", config.pages.perks), ingest_perks)?;
	pipeline.register_fn(&format!("{origin}/{}*", config.pages.home), ingest_home)?;
	pipeline.on_after_ingest(after_ingest);
	Ok(pipeline)
}

fn ingest_item(ctx: &HubContext, page: Page<'_>) -> Result<bool> {
	let item = extract_item(page.url, page.content)?;
	Ok(ctx.items.learn(&item)?)
}

fn ingest_inventory(ctx: &HubContext, page: Page<'_>) -> Result<bool> {
	let rows = extract_inventory(page.content);
	let mut learned = 0usize;
	for row in &rows {
		if ctx.items.learn(&row.to_record())? {
			learned += 1;
		}
	}
	tracing::debug!(rows = rows.len(), learned, "inventory page");
	let replaced = ctx.set_inventory(rows);
	Ok(learned > 0 || replaced)
}

fn ingest_perks(ctx: &HubContext, page: Page<'_>) -> Result<bool> {
	let perks = extract_perks(page.content);
	if perks.perksets.is_empty() && perks.current.is_none() {
		return Ok(false);
	}
	Ok(ctx.update_player(|player| {
		if !perks.perksets.is_empty() {
			player.perksets = perks.perksets;
		}
		if perks.current.is_some() {
			player.current_perkset = perks.current;
		}
	})?)
}

fn ingest_home(ctx: &HubContext, page: Page<'_>) -> Result<bool> {
	let Some(farm_id) = extract_farm_id(page.content) else {
		return Ok(false);
	};
	Ok(ctx.update_player(|player| player.farm_id = Some(farm_id))?)
}

fn after_ingest(ctx: &HubContext, page: Page<'_>, changed: bool) {
	if changed && let Err(error) = ctx.log.append("ingest", Some(page.url), json!({})) {
		tracing::warn!(url = page.url, %error, "cannot log ingested page");
	}
	ctx.broadcast_state_logged();
}
