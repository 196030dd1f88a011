//! The hub event loop.
//!
//! # Mental model
//!
//! - Connections, inbound peer messages and scheduled ticks all become [`HubEvent`]s on one FIFO queue.
//! - [`Hub::run`] handles one event to completion (ingest, merge, persist, broadcast) before taking the next.
//! - Errors end the event, never the loop.
//!
//! # Invariants
//!
//! 1. A peer MUST receive the current snapshot before any broadcast that follows its connection.
//!    - Enforced in: `Hub::handle_event` (`HubEvent::Connected`)
//!    - Tested by: `tests/hub_flow.rs::connected_peer_gets_snapshot_then_updates`
//!
//! 2. Re-ingesting an identical page MUST NOT write, yet every handled page MUST be followed by one broadcast.
//!    - Enforced in: `MergeEngine::learn`, `filters::after_ingest`
//!    - Tested by: `tests/hub_flow.rs::item_page_learns_once_and_broadcasts_each_time`

use std::sync::Arc;

use farmlore_ingest::{Dispatch, Page, Pipeline};
use farmlore_proto::{Inbound, PeerId, Target};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::commands::{Action, Dispatcher};
use crate::context::HubContext;
use crate::error::Result;
use crate::filters::default_pipeline;
use crate::registry::PeerSink;
use crate::scheduler::Tick;

/// Work items for the hub loop.
#[derive(Debug)]
pub enum HubEvent {
	/// A view connected; `sink` feeds its writer task.
	Connected {
		/// Assigned peer id.
		peer: PeerId,
		/// Outgoing queue of the peer.
		sink: PeerSink,
	},
	/// A view's connection closed.
	Disconnected {
		/// Peer that left.
		peer: PeerId,
	},
	/// A view sent a message.
	Inbound {
		/// Sender.
		peer: PeerId,
		/// Decoded message.
		message: Inbound,
	},
	/// A scheduled trigger fired.
	Tick(Tick),
}

/// What handling one event did, for callers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// Nothing to do.
	Ignored,
	/// A peer joined or left the registry.
	Peers,
	/// A page went through the pipeline.
	Ingested(Dispatch),
	/// A click ran an action.
	Command(Action),
	/// The current state was re-broadcast.
	Rendered,
}

/// Owns the context, pipeline and dispatcher and drives them from events.
#[derive(Debug)]
pub struct Hub {
	ctx: Arc<HubContext>,
	pipeline: Pipeline<HubContext>,
	commands: Dispatcher,
}

impl Hub {
	/// Hub with the default page filters and only the built-in commands.
	pub fn new(ctx: Arc<HubContext>) -> Result<Self> {
		let pipeline = default_pipeline(&ctx.config)?;
		Ok(Self::with_parts(ctx, pipeline, Dispatcher::new()))
	}

	/// Hub over a caller-built pipeline and dispatcher.
	pub fn with_parts(ctx: Arc<HubContext>, pipeline: Pipeline<HubContext>, commands: Dispatcher) -> Self {
		Self {
			ctx,
			pipeline,
			commands,
		}
	}

	/// Shared context.
	pub fn context(&self) -> &Arc<HubContext> {
		&self.ctx
	}

	/// Command dispatcher, for registering custom handlers.
	pub fn commands_mut(&mut self) -> &mut Dispatcher {
		&mut self.commands
	}

	/// Handles a single event to completion.
	pub async fn handle_event(&self, event: HubEvent) -> Result<Outcome> {
		match event {
			HubEvent::Connected { peer, sink } => {
				let snapshot = self.ctx.render_message()?;
				self.ctx.peers.register(peer, sink, snapshot)?;
				Ok(Outcome::Peers)
			}
			HubEvent::Disconnected { peer } => {
				self.ctx.peers.unregister(peer);
				Ok(Outcome::Peers)
			}
			HubEvent::Inbound { peer, message } => self.handle_inbound(peer, message).await,
			HubEvent::Tick(tick) => self.handle_tick(tick).await,
		}
	}

	async fn handle_inbound(&self, peer: PeerId, message: Inbound) -> Result<Outcome> {
		match message {
			Inbound::PageObserved { url, content } => {
				tracing::debug!(%peer, %url, bytes = content.len(), "page observed");
				self.ingest(&url, &content).await
			}
			Inbound::SidebarClick { target } => {
				let Some(target) = target else {
					tracing::debug!(%peer, "sidebar click without target");
					return Ok(Outcome::Ignored);
				};
				let action = self.commands.handle(&self.ctx, Target::parse(&target)).await?;
				Ok(Outcome::Command(action))
			}
			Inbound::Unknown => {
				tracing::trace!(%peer, "ignoring unknown inbound action");
				Ok(Outcome::Ignored)
			}
		}
	}

	/// Runs `(url, content)` through the pipeline.
	pub async fn ingest(&self, url: &str, content: &str) -> Result<Outcome> {
		let dispatch = self.pipeline.dispatch(&self.ctx, Page::new(url, content)).await?;
		Ok(Outcome::Ingested(dispatch))
	}

	async fn handle_tick(&self, tick: Tick) -> Result<Outcome> {
		tracing::debug!(trigger = tick.name(), "tick");
		let pages = &self.ctx.config.pages;
		match tick {
			Tick::InventoryRefresh => self.refresh(&pages.inventory).await,
			Tick::PerkRefresh => self.refresh(&pages.perks).await,
			Tick::Render => {
				self.ctx.broadcast_state()?;
				Ok(Outcome::Rendered)
			}
		}
	}

	async fn refresh(&self, path: &str) -> Result<Outcome> {
		let page = self.ctx.remote.fetch_page(path).await?;
		self.ingest(&page.url, &page.content).await
	}

	/// Fetches the pages the hub learns the player from, once, at startup.
	///
	/// Failures are logged per page and do not stop the others.
	pub async fn prime(&self) {
		let pages = &self.ctx.config.pages;
		for path in [&pages.home, &pages.perks, &pages.inventory] {
			if let Err(error) = self.refresh(path).await {
				tracing::warn!(%path, %error, "initial fetch failed");
			}
		}
	}

	/// Consumes events until `shutdown` fires or every sender is gone.
	pub async fn run(&self, mut events: mpsc::UnboundedReceiver<HubEvent>, shutdown: CancellationToken) {
		tracing::info!("hub loop started");
		loop {
			let event = tokio::select! {
				_ = shutdown.cancelled() => break,
				event = events.recv() => match event {
					Some(event) => event,
					None => break,
				},
			};
			if let Err(error) = self.handle_event(event).await {
				tracing::error!(%error, "hub event failed");
			}
		}
		tracing::info!("hub loop stopped");
	}
}
