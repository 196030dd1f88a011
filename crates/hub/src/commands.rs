//! Sidebar click dispatch.
//!
//! A click target `<kind>:<argument>` resolves to a built-in [`Action`] by
//! fixed name first, then to a registered [`CommandHandler`]. Kinds matching
//! neither are ignored. Every action that ran is followed by a full state
//! broadcast, whether it succeeded or not.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use farmlore_proto::{Outbound, Target};
use serde_json::json;

use crate::context::HubContext;
use crate::error::{HubError, Result};

/// Perk sets toggled by the `perk` action.
pub const FARMING_PERKSET: &str = "Farming";
/// See [`FARMING_PERKSET`].
pub const CRAFTING_PERKSET: &str = "Crafting";

/// A resolved click action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	/// Navigate every view to the player's farm.
	Farm,
	/// Toggle between the farming and crafting perk sets.
	Perk,
	/// Export the activity log to a file.
	Log,
	/// Registered handler for this kind.
	Custom(String),
	/// Nothing handles this kind.
	Unknown,
}

/// Handler for a custom click kind.
#[async_trait]
pub trait CommandHandler: Send + Sync {
	/// Runs the command. `arg` is the part of the target after the first `:`.
	async fn run(&self, ctx: &HubContext, arg: Option<&str>) -> Result<()>;
}

/// Routes click targets to actions.
#[derive(Default)]
pub struct Dispatcher {
	handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut kinds: Vec<_> = self.handlers.keys().collect();
		kinds.sort();
		f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
	}
}

impl Dispatcher {
	/// Dispatcher with only the built-in actions.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for click kind `kind`, replacing any previous one.
	///
	/// Built-in kinds always win over registered handlers.
	pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn CommandHandler>) {
		let kind = kind.into();
		tracing::debug!(%kind, "registered click handler");
		self.handlers.insert(kind, handler);
	}

	/// Resolves a click kind.
	pub fn resolve(&self, kind: &str) -> Action {
		match kind {
			"farm" => Action::Farm,
			"perk" => Action::Perk,
			"log" => Action::Log,
			other if self.handlers.contains_key(other) => Action::Custom(other.to_string()),
			_ => Action::Unknown,
		}
	}

	/// Runs the action for `target`, then broadcasts the resulting state.
	///
	/// Returns the resolved action. Unknown kinds do nothing and broadcast nothing.
	pub async fn handle(&self, ctx: &HubContext, target: Target<'_>) -> Result<Action> {
		let action = self.resolve(target.kind);
		tracing::debug!(kind = target.kind, arg = ?target.arg, ?action, "sidebar click");

		let outcome = match &action {
			Action::Farm => farm(ctx),
			Action::Perk => perk(ctx).await,
			Action::Log => export_log(ctx).map(drop),
			Action::Custom(kind) => match self.handlers.get(kind) {
				Some(handler) => handler.run(ctx, target.arg).await,
				None => Ok(()),
			},
			Action::Unknown => {
				tracing::debug!(kind = target.kind, "ignoring unknown click kind");
				return Ok(action);
			}
		};

		let status = if outcome.is_ok() { "ok" } else { "failed" };
		if let Err(error) = ctx.log.append(
			"command",
			None,
			json!({"kind": target.kind, "arg": target.arg, "status": status}),
		) {
			tracing::warn!(%error, "cannot log command");
		}
		ctx.broadcast_state_logged();
		outcome.map(|()| action)
	}
}

fn farm(ctx: &HubContext) -> Result<()> {
	let Some(farm_id) = ctx.player().farm_id else {
		tracing::info!("cannot navigate to farm without a farm id");
		return Ok(());
	};
	ctx.peers.broadcast(&Outbound::ReloadView {
		url: format!("xfarm.php?id={farm_id}"),
	})?;
	Ok(())
}

/// Switches to the other perk set: reset, then activate by id.
///
/// On failure the loading flag is cleared and the player left unchanged. A
/// reset that succeeded before a failed activation is not undone.
async fn perk(ctx: &HubContext) -> Result<()> {
	ctx.set_perkset_loading(true);
	ctx.broadcast_state_logged();

	let result = switch_perkset(ctx).await;
	ctx.set_perkset_loading(false);
	if let Err(error) = &result {
		tracing::warn!(%error, "perk set switch failed");
	}
	result
}

async fn switch_perkset(ctx: &HubContext) -> Result<()> {
	let player = ctx.player();
	let next = match player.current_perkset.as_deref() {
		Some(FARMING_PERKSET) => CRAFTING_PERKSET,
		_ => FARMING_PERKSET,
	};
	let id = player
		.perkset_id(next)
		.ok_or_else(|| HubError::UnknownPerkset(next.to_string()))?
		.to_string();

	ctx.remote.reset_perks().await?;
	ctx.remote.activate_perkset(&id).await?;
	ctx.update_player(|p| p.current_perkset = Some(next.to_string()))?;
	tracing::info!(perkset = next, %id, "perk set switched");
	Ok(())
}

fn export_log(ctx: &HubContext) -> Result<PathBuf> {
	let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
	let path = ctx.config.data_dir().join("exports").join(format!("farmlore-log-{stamp}.json"));
	ctx.log.export(&path)?;
	Ok(path)
}
