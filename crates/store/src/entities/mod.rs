//! Typed façades over the built-in collections.

mod items;
mod locations;
mod log;
mod pets;
mod player;

pub use items::ItemStore;
pub(crate) use items::ITEM_VOLATILE;
pub use locations::LocationStore;
pub use log::{LogEntry, LogStore};
pub use pets::PetStore;
pub use player::{Player, PlayerStore};
