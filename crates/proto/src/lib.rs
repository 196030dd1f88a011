//! Shared wire types for the farmlore hub.
//!
//! Views connect to the hub over a Unix domain socket and exchange one JSON
//! object per line. Every message carries an `action` tag; inbound actions the
//! hub does not know decode to [`Inbound::Unknown`] instead of failing, so a
//! newer view never crashes an older hub.

#![warn(missing_docs)]

pub mod codec;
pub mod paths;
pub mod target;
pub mod types;

pub use codec::{decode_inbound, decode_outbound, encode_line};
pub use target::Target;
pub use types::*;
