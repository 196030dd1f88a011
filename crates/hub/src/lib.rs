//! Runtime core of the farmlore daemon.
//!
//! # Purpose
//!
//! - Owns the [`HubContext`]: store handles, hot player and inventory state, the peer registry and the remote client.
//! - Turns view connections, view messages and scheduled ticks into [`HubEvent`]s handled one at a time by [`Hub::run`].
//! - Routes observed pages through the ingestion pipeline and sidebar clicks through the [`Dispatcher`].
//!
//! # Key types
//!
//! | Type | Role |
//! |---|---|
//! | [`HubContext`] | Shared state every handler sees |
//! | [`Hub`] | Event loop over context, pipeline and dispatcher |
//! | [`PeerRegistry`] | Live views and fan-out delivery |
//! | [`Dispatcher`] | Click target to [`Action`] |
//! | [`RemoteOps`] | Calls made to the remote application |
//! | [`HubConfig`] | TOML configuration |

#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod hub;
pub mod ipc;
pub mod registry;
pub mod remote;
pub mod scheduler;

pub use commands::{Action, CommandHandler, Dispatcher};
pub use config::{ConfigError, HubConfig, PagesConfig, ScheduleConfig};
pub use context::{HotState, HubContext};
pub use error::{BroadcastError, DeliveryError, HubError, RemoteError, Result};
pub use hub::{Hub, HubEvent, Outcome};
pub use registry::{PeerRegistry, PeerSink};
pub use remote::{FetchedPage, HttpRemote, RemoteOps, rewrite_origin_headers};
pub use scheduler::Tick;
