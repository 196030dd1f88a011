//! Line framing for the JSON wire format.
//!
//! One message per line; the line terminator is added by the transport,
//! not by [`encode_line`].

use crate::types::{Inbound, Outbound};

/// Encodes an outbound message as a single JSON line (without terminator).
pub fn encode_line(msg: &Outbound) -> Result<String, serde_json::Error> {
	serde_json::to_string(msg)
}

/// Decodes one line sent by a view.
pub fn decode_inbound(line: &str) -> Result<Inbound, serde_json::Error> {
	serde_json::from_str(line.trim())
}

/// Decodes one line sent by the hub.
pub fn decode_outbound(line: &str) -> Result<Outbound, serde_json::Error> {
	serde_json::from_str(line.trim())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::types::StateSnapshot;

	#[test]
	fn sidebar_click_decodes() {
		let msg = decode_inbound(r#"{"action":"SIDEBAR_CLICK","target":"perk:"}"#).unwrap();
		assert_eq!(
			msg,
			Inbound::SidebarClick {
				target: Some("perk:".into())
			}
		);
	}

	#[test]
	fn sidebar_click_without_target() {
		let msg = decode_inbound(r#"{"action":"SIDEBAR_CLICK"}"#).unwrap();
		assert_eq!(msg, Inbound::SidebarClick { target: None });
	}

	#[test]
	fn unknown_action_is_not_an_error() {
		let msg = decode_inbound(r#"{"action":"SOMETHING_NEWER","extra":1}"#).unwrap();
		assert_eq!(msg, Inbound::Unknown);
	}

	#[test]
	fn reload_view_shape() {
		let line = encode_line(&Outbound::ReloadView {
			url: "xfarm.php?id=7".into(),
		})
		.unwrap();
		assert_eq!(line, r#"{"action":"RELOAD_VIEW","url":"xfarm.php?id=7"}"#);
	}

	#[test]
	fn render_state_uses_camel_case() {
		let line = encode_line(&Outbound::RenderState {
			state: StateSnapshot {
				perkset_loading: true,
				..Default::default()
			},
		})
		.unwrap();
		assert!(line.contains(r#""perksetLoading":true"#), "{line}");
		let Outbound::RenderState { state } = decode_outbound(&line).unwrap() else {
			panic!("expected render state");
		};
		assert!(state.perkset_loading);
	}
}
