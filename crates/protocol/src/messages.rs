use serde::{Deserialize, Serialize};

use crate::fetch::{FetchRequest, FetchResponse};

/// One message on the sync channel.
///
/// Serialized as a single JSON object tagged by `type`. Anything that
/// does not decode into one of these variants is not a sync message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Master → slaves: the master's clean URL changed.
    NavigationUpdate { url: String },
    /// Slave → master: a slave navigated; the URL still carries the marker.
    SlaveNavigated { url: String },
    /// Master → slaves.
    ScrollUpdate { x: f64, y: f64 },
    /// Slave → master.
    SlaveScroll { x: f64, y: f64 },
    FetchRequest(FetchRequest),
    FetchResponse(FetchResponse),
    FetchError { id: String, error: String },
}

impl SyncMessage {
    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NavigationUpdate { .. } => "navigation-update",
            Self::SlaveNavigated { .. } => "slave-navigated",
            Self::ScrollUpdate { .. } => "scroll-update",
            Self::SlaveScroll { .. } => "slave-scroll",
            Self::FetchRequest(_) => "fetch-request",
            Self::FetchResponse(_) => "fetch-response",
            Self::FetchError { .. } => "fetch-error",
        }
    }

    /// Correlation id for fetch traffic.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::FetchRequest(req) => Some(&req.id),
            Self::FetchResponse(resp) => Some(&resp.id),
            Self::FetchError { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::body::Body;
    use crate::fetch::{FetchOptions, Headers, ResponseType};

    #[test]
    fn navigation_update_wire_shape() {
        let msg = SyncMessage::NavigationUpdate {
            url: "https://host/products?sort=price".into(),
        };
        let value = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(
            value,
            json!({"type": "navigation-update", "url": "https://host/products?sort=price"})
        );
    }

    #[test]
    fn fetch_request_flattens_into_tagged_object() {
        let msg = SyncMessage::FetchRequest(FetchRequest {
            id: "k3j9x".into(),
            url: "/api/items".into(),
            options: FetchOptions::default(),
        });
        let value = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(
            value,
            json!({
                "type": "fetch-request",
                "id": "k3j9x",
                "url": "/api/items",
                "options": {"method": "GET"}
            })
        );
    }

    #[test]
    fn fetch_response_decodes_browser_field_names() {
        let text = r#"{
            "type": "fetch-response",
            "id": "k3j9x",
            "status": 200,
            "statusText": "OK",
            "headers": {"content-type": "application/json"},
            "body": "WzEsMiwzXQ==",
            "url": "https://host/api/items",
            "responseType": "basic",
            "redirected": false
        }"#;
        let msg: SyncMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => unreachable!("decode failed: {e}"),
        };
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json".into());
        assert_eq!(
            msg,
            SyncMessage::FetchResponse(FetchResponse {
                id: "k3j9x".into(),
                status: 200,
                status_text: "OK".into(),
                headers,
                body: Body::from("[1,2,3]"),
                url: "https://host/api/items".into(),
                response_type: ResponseType::Basic,
                redirected: false,
            })
        );
        assert_eq!(msg.correlation_id(), Some("k3j9x"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<SyncMessage>(r#"{"type":"teleport","url":"/"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_fields_are_rejected() {
        let result = serde_json::from_str::<SyncMessage>(r#"{"type":"scroll-update","x":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let msgs = [
            SyncMessage::SlaveNavigated { url: "/".into() },
            SyncMessage::ScrollUpdate { x: 0.0, y: 1.0 },
            SyncMessage::SlaveScroll { x: 0.0, y: 1.0 },
            SyncMessage::FetchError {
                id: "a".into(),
                error: "boom".into(),
            },
        ];
        for msg in msgs {
            let value = serde_json::to_value(&msg).unwrap_or_default();
            assert_eq!(value["type"], msg.kind());
        }
    }
}
