//! Page extractors.
//!
//! Each extractor is a pure function from page text to records or values;
//! none touches the store. Pages may be full HTML or already tag-stripped
//! text.

mod farm;
pub mod html;
mod inventory;
mod item;
mod parse;
mod perks;

pub use farm::extract_farm_id;
pub use inventory::{InventoryRow, extract_inventory};
pub use item::extract_item;
pub use parse::{parse_duration, parse_number, parse_yes};
pub use perks::{Perks, extract_perks};
