//! Periodic triggers feeding the hub loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ScheduleConfig;
use crate::hub::HubEvent;

/// A scheduled trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
	/// Fetch and ingest the inventory page.
	InventoryRefresh,
	/// Fetch and ingest the perks page.
	PerkRefresh,
	/// Re-broadcast the current state.
	Render,
}

impl Tick {
	/// Every trigger with its configured period.
	pub fn all(schedule: &ScheduleConfig) -> [(Tick, Duration); 3] {
		[
			(Tick::InventoryRefresh, schedule.inventory_refresh()),
			(Tick::PerkRefresh, schedule.perk_refresh()),
			(Tick::Render, schedule.render()),
		]
	}

	/// Trigger name used in logs.
	pub fn name(self) -> &'static str {
		match self {
			Tick::InventoryRefresh => "inventory-refresh",
			Tick::PerkRefresh => "perk-refresh",
			Tick::Render => "render",
		}
	}
}

/// Spawns one interval task per trigger.
///
/// Each task sends [`HubEvent::Tick`] once per period, the first one period
/// after start. Ticks missed while the hub is busy are skipped rather than
/// queued. Tasks end on `shutdown` or when the hub loop is gone.
pub fn spawn(
	schedule: &ScheduleConfig,
	events: mpsc::UnboundedSender<HubEvent>,
	shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
	Tick::all(schedule)
		.into_iter()
		.map(|(tick, period)| tokio::spawn(run_trigger(tick, period, events.clone(), shutdown.clone())))
		.collect()
}

async fn run_trigger(
	tick: Tick,
	period: Duration,
	events: mpsc::UnboundedSender<HubEvent>,
	shutdown: CancellationToken,
) {
	let mut interval = tokio::time::interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
	tracing::debug!(trigger = tick.name(), ?period, "trigger started");

	loop {
		tokio::select! {
			_ = shutdown.cancelled() => break,
			_ = interval.tick() => {
				if events.send(HubEvent::Tick(tick)).is_err() {
					break;
				}
			}
		}
	}
	tracing::debug!(trigger = tick.name(), "trigger stopped");
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn triggers_fire_after_their_period() {
		let schedule = ScheduleConfig {
			inventory_refresh_secs: 10,
			perk_refresh_secs: 30,
			render_secs: 5,
		};
		let (tx, mut rx) = mpsc::unbounded_channel();
		let shutdown = CancellationToken::new();
		let tasks = spawn(&schedule, tx, shutdown.clone());

		tokio::time::sleep(Duration::from_secs(11)).await;
		let mut seen = Vec::new();
		while let Ok(HubEvent::Tick(tick)) = rx.try_recv() {
			seen.push(tick);
		}
		assert_eq!(seen.iter().filter(|t| **t == Tick::Render).count(), 2);
		assert_eq!(seen.iter().filter(|t| **t == Tick::InventoryRefresh).count(), 1);
		assert!(!seen.contains(&Tick::PerkRefresh));

		shutdown.cancel();
		for task in tasks {
			task.await.unwrap();
		}
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn trigger_stops_when_hub_is_gone() {
		let schedule = ScheduleConfig {
			inventory_refresh_secs: 1,
			perk_refresh_secs: 1,
			render_secs: 1,
		};
		let (tx, rx) = mpsc::unbounded_channel();
		drop(rx);
		for task in spawn(&schedule, tx, CancellationToken::new()) {
			task.await.unwrap();
		}
	}
}
