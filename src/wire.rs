//! Wire types: everything that crosses a process boundary as JSON — the
//! upstream quote feed's JSONP-wrapped payload, and the client<->server
//! frames over the message connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::RatePoint;
use crate::core::symbols::SymbolEntry;

/// One quote as the upstream feed reports it.
///
/// Only `Symbol`, `Bid`, and `Ask` are read; every other field the upstream
/// may include (`Spread`, `ProductType`, `LastClose`, ...) is tolerated and
/// ignored by virtue of `serde` defaulting to ignore unknown fields on a
/// struct without `#[serde(deny_unknown_fields)]`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamQuote {
    /// Symbol name, e.g. `"EURUSD"`.
    #[serde(rename = "Symbol")]
    pub symbol: String,
    /// Bid price.
    #[serde(rename = "Bid")]
    pub bid: f64,
    /// Ask price.
    #[serde(rename = "Ask")]
    pub ask: f64,
}

/// The JSON body inside the JSONP wrapper: `{"Rates": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamResponse {
    /// The quote snapshot for this tick.
    #[serde(rename = "Rates")]
    pub rates: Vec<UpstreamQuote>,
}

/// Errors parsing the upstream JSONP-wrapped payload.
#[derive(Debug, Error)]
pub enum JsonpError {
    /// The body was shorter than the fixed 5-byte prefix + 3-byte suffix
    /// the wrapper is assumed to carry.
    #[error("body too short to strip JSONP wrapper ({0} bytes)")]
    TooShort(usize),
    /// The stripped body failed to parse as the expected shape.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Strip the fixed JSONP wrapper (`null(` prefix, `);` suffix in the
/// reference deployment — 5 leading bytes, 3 trailing bytes, by contract
/// rather than by checking the literal tokens; see spec open question (a))
/// and parse the remainder as an [`UpstreamResponse`].
pub fn parse_jsonp_response(body: &[u8]) -> Result<UpstreamResponse, JsonpError> {
    if body.len() < 8 {
        return Err(JsonpError::TooShort(body.len()));
    }
    let stripped = &body[5..body.len() - 3];
    Ok(serde_json::from_slice(stripped)?)
}

/// Inbound client -> server frame, dispatched on `action`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Request the static symbol table.
    Assets,
    /// Subscribe to live updates for one asset.
    Subscribe {
        /// The inner `message` payload.
        message: SubscribeMessage,
    },
}

/// Payload of a `subscribe` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeMessage {
    /// Asset id to subscribe to.
    #[serde(rename = "assetId")]
    pub asset_id: u32,
}

/// Outbound server -> client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Reply to `"assets"`.
    Assets {
        /// The `message` payload.
        message: AssetsMessage,
    },
    /// Reply to `"subscribe"`, sent before the live subscription is installed.
    AssetHistory {
        /// The `message` payload.
        message: AssetHistoryMessage,
    },
    /// A live rate update for a subscribed asset.
    Point {
        /// The point itself, flattened into `message`.
        message: RatePoint,
    },
}

/// `message` payload of an `"assets"` reply.
#[derive(Debug, Clone, Serialize)]
pub struct AssetsMessage {
    /// The static symbol table.
    pub assets: Vec<SymbolEntry>,
}

/// `message` payload of an `"asset_history"` reply.
#[derive(Debug, Clone, Serialize)]
pub struct AssetHistoryMessage {
    /// History points for the requested asset, ascending by time.
    pub points: Vec<RatePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_jsonp_wrapper() {
        let body = b"null({\"Rates\":[]});";
        let parsed = parse_jsonp_response(body).unwrap();
        assert!(parsed.rates.is_empty());
    }

    #[test]
    fn too_short_body_errors() {
        assert!(matches!(parse_jsonp_response(b"abc"), Err(JsonpError::TooShort(3))));
    }

    #[test]
    fn parses_quote_fields_and_ignores_extras() {
        let body = br#"null({"Rates":[{"Symbol":"EURUSD","Bid":1.10,"Ask":1.20,"Spread":0.1,"ProductType":"fx"}]});"#;
        let parsed = parse_jsonp_response(body).unwrap();
        assert_eq!(parsed.rates.len(), 1);
        assert_eq!(parsed.rates[0].symbol, "EURUSD");
        assert!((parsed.rates[0].bid - 1.10).abs() < f64::EPSILON);
        assert!((parsed.rates[0].ask - 1.20).abs() < f64::EPSILON);
    }

    #[test]
    fn deserializes_subscribe_frame() {
        let raw = r#"{"action":"subscribe","message":{"assetId":1}}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ClientFrame::Subscribe { message } => assert_eq!(message.asset_id, 1),
            ClientFrame::Assets => panic!("wrong variant"),
        }
    }

    #[test]
    fn deserializes_assets_frame() {
        let raw = r#"{"action":"assets"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame, ClientFrame::Assets));
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let raw = r#"{"action":"nonsense"}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn serializes_assets_reply_shape() {
        let frame = ServerFrame::Assets {
            message: AssetsMessage {
                assets: vec![SymbolEntry { id: 1, name: "EURUSD".into() }],
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["action"], "assets");
        assert_eq!(json["message"]["assets"][0]["id"], 1);
        assert_eq!(json["message"]["assets"][0]["name"], "EURUSD");
    }

    #[test]
    fn serializes_point_reply_shape() {
        let point = RatePoint::from_quote(1, "EURUSD".into(), 1000, 1.20, 1.10);
        let frame = ServerFrame::Point { message: point };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["action"], "point");
        assert_eq!(json["message"]["assetId"], 1);
    }
}
