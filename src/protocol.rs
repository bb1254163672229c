//! Shared vocabulary exchanged between the coordinator, the casting SDK seam,
//! and the embedding page.
//!
//! This module defines the connection-state model, the remote player mirror,
//! and the media load payloads handed to an active cast session.

use std::fmt;

/// Identifier of the stock media receiver application.
pub const DEFAULT_MEDIA_RECEIVER_APP_ID: &str = "CC1AD845";

/// Coarse connectivity of the casting subsystem.
///
/// The serialized spelling is also the attribute value projected onto the
/// cast affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CastConnectionState {
    NoDevicesAvailable,
    #[default]
    NotConnected,
    Connecting,
    Connected,
    Error,
}

impl CastConnectionState {
    /// Attribute value written verbatim onto the cast affordance.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDevicesAvailable => "NO_DEVICES_AVAILABLE",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for CastConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session auto-join behavior requested from the session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoJoinPolicy {
    /// Join sessions started from the same tab and origin only.
    TabAndOriginScoped,
    /// Join any session started from the same origin.
    #[default]
    OriginScoped,
    /// Never auto-join.
    PageScoped,
}

impl AutoJoinPolicy {
    /// Spelling used in the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabAndOriginScoped => "tab_and_origin_scoped",
            Self::OriginScoped => "origin_scoped",
            Self::PageScoped => "page_scoped",
        }
    }
}

/// Options passed to `SessionProvider::configure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOptions {
    pub receiver_app_id: String,
    pub auto_join_policy: AutoJoinPolicy,
}

impl Default for CastOptions {
    fn default() -> Self {
        Self {
            receiver_app_id: DEFAULT_MEDIA_RECEIVER_APP_ID.to_string(),
            auto_join_policy: AutoJoinPolicy::default(),
        }
    }
}

/// Read-only mirror of the remote player state reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemotePlayerStatus {
    pub is_paused: bool,
    pub is_connected: bool,
}

/// Coarse classification of a playable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Mp4,
    Hls,
    WebM,
    Unknown,
}

impl ContentType {
    /// MIME type sent to the receiver. Unclassified sources are announced as MP4.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp4 | Self::Unknown => "video/mp4",
            Self::Hls => "application/x-mpegURL",
            Self::WebM => "video/webm",
        }
    }
}

/// Playable source resolved from the local media element for one cast attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    source_url: String,
    content_type: ContentType,
}

impl MediaDescriptor {
    /// Builds a descriptor. Returns `None` when the URL is empty or blank.
    pub fn new(source_url: &str, content_type: ContentType) -> Option<Self> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return None;
        }
        Some(Self {
            source_url: source_url.to_string(),
            content_type,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// Generic display metadata shown by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaMetadata {
    pub title: Option<String>,
}

/// Load request handed to an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub descriptor: MediaDescriptor,
    pub autoplay: bool,
    pub metadata: MediaMetadata,
}

impl LoadRequest {
    /// Renders the request as a Cast v2 `LOAD` media message body.
    ///
    /// `request_id` is allocated by the session that sends the message.
    pub fn to_cast_payload(&self, request_id: i64) -> serde_json::Value {
        let mut metadata = serde_json::json!({ "metadataType": 0 });
        if let Some(title) = self.metadata.title.as_deref() {
            metadata["title"] = serde_json::json!(title);
        }
        serde_json::json!({
            "type": "LOAD",
            "requestId": request_id,
            "autoplay": self.autoplay,
            "media": {
                "contentId": self.descriptor.source_url(),
                "streamType": "BUFFERED",
                "contentType": self.descriptor.content_type().mime_type(),
                "metadata": metadata,
            }
        })
    }
}

/// UI-facing rendering of a connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonProjection {
    pub attribute: &'static str,
    pub visible: bool,
    pub enabled: bool,
}

impl ButtonProjection {
    /// Maps a connection state onto the cast affordance.
    /// Only `NoDevicesAvailable` hides the button.
    pub fn for_state(state: CastConnectionState) -> Self {
        let visible = state != CastConnectionState::NoDevicesAvailable;
        Self {
            attribute: state.as_str(),
            visible,
            enabled: visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ButtonProjection, CastConnectionState, ContentType, LoadRequest, MediaDescriptor,
        MediaMetadata,
    };

    #[test]
    fn test_connection_state_serializes_as_attribute_value() {
        let encoded = serde_json::to_string(&CastConnectionState::NoDevicesAvailable)
            .expect("state should serialize");
        assert_eq!(encoded, "\"NO_DEVICES_AVAILABLE\"");
        assert_eq!(CastConnectionState::Connecting.to_string(), "CONNECTING");
    }

    #[test]
    fn test_projection_hides_only_when_no_devices_available() {
        let hidden = ButtonProjection::for_state(CastConnectionState::NoDevicesAvailable);
        assert!(!hidden.visible);
        assert!(!hidden.enabled);

        for state in [
            CastConnectionState::NotConnected,
            CastConnectionState::Connecting,
            CastConnectionState::Connected,
            CastConnectionState::Error,
        ] {
            let projection = ButtonProjection::for_state(state);
            assert!(projection.visible, "{state} should be visible");
            assert_eq!(projection.attribute, state.as_str());
        }
    }

    #[test]
    fn test_descriptor_rejects_blank_source() {
        assert!(MediaDescriptor::new("", ContentType::Mp4).is_none());
        assert!(MediaDescriptor::new("   ", ContentType::Unknown).is_none());
    }

    #[test]
    fn test_load_payload_carries_media_fields() {
        let descriptor = MediaDescriptor::new("http://host/stream.m3u8", ContentType::Hls)
            .expect("descriptor should build");
        let request = LoadRequest {
            descriptor,
            autoplay: true,
            metadata: MediaMetadata {
                title: Some("Trailer".to_string()),
            },
        };
        let payload = request.to_cast_payload(7);
        assert_eq!(payload["type"], "LOAD");
        assert_eq!(payload["requestId"], 7);
        assert_eq!(payload["autoplay"], true);
        assert_eq!(payload["media"]["contentId"], "http://host/stream.m3u8");
        assert_eq!(payload["media"]["contentType"], "application/x-mpegURL");
        assert_eq!(payload["media"]["metadata"]["title"], "Trailer");
    }
}
