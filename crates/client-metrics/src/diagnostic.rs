// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic (client) events.
//!
//! Diagnostic events are richer than operational metrics: each one wraps a client event payload
//! with a unique id, a schema version, origin timestamps and metadata about the client that
//! produced it. The buffer treats the resulting [`ClientMetric`] as opaque.

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::record::now_millis;

/// Caller-supplied structured data embedded in a diagnostic event.
pub type Payload = Map<String, Value>;

const DIAGNOSTIC_EVENT_TYPE: &str = "diagnostic-event";
const DIAGNOSTIC_SCHEMA_VERSION: u32 = 1;
const FALLBACK_LOCAL_IP: &str = "127.0.0.1";

/// Identifiers tying an event to a session, device and user.
///
/// Assembled by the host; the engine only forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locus_url: Option<String>,
}

/// One negotiated ICE media line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLine {
    pub media_type: String,
    pub direction: String,
    pub local_ip: String,
    pub local_port: u16,
    pub remote_ip: String,
    pub remote_port: u16,
    pub protocol: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientEventName {
    #[serde(rename = "client.mediaquality.event")]
    MediaQuality,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    #[default]
    Unknown,
}

/// The event body carried inside a [`DiagnosticEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    pub name: ClientEventName,
    pub identifiers: Identifiers,
    pub can_proceed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_lines: Option<Vec<MediaLine>>,
    pub intervals: Vec<Payload>,
}

impl ClientEvent {
    /// Local address of the first media line that reports one.
    pub fn local_ip(&self) -> Option<&str> {
        self.media_lines
            .as_deref()?
            .iter()
            .map(|line| line.local_ip.as_str())
            .find(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_type: String,
    pub sub_client_type: String,
    pub os: String,
    pub os_version: String,
    #[serde(rename = "localIP")]
    pub local_ip: String,
    pub client_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticOrigin {
    pub user_agent: String,
    pub network_type: NetworkType,
    pub local_ip_address: String,
    pub using_proxy: bool,
    pub media_engine_software_version: String,
    pub client_info: ClientInfo,
}

/// Triggered/sent timestamps, UTC milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OriginTime {
    pub triggered: i64,
    pub sent: i64,
}

impl OriginTime {
    pub fn now() -> Self {
        let now = now_millis();
        Self {
            triggered: now,
            sent: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEvent {
    pub event_id: Uuid,
    pub version: u32,
    pub origin: DiagnosticOrigin,
    pub origin_time: OriginTime,
    pub event: ClientEvent,
}

/// The unit stored in the diagnostic queue and posted to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetric {
    pub event_payload: DiagnosticEvent,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ClientMetric {
    pub fn new(event: DiagnosticEvent) -> Self {
        Self {
            event_payload: event,
            kind: DIAGNOSTIC_EVENT_TYPE,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_payload.event_id
    }
}

/// Static description of the host client, injected at engine construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: String,
    pub client_type: String,
    pub sub_client_type: String,
    pub os: String,
    pub os_version: String,
    pub client_version: String,
    pub media_engine_version: String,
    pub network_type: NetworkType,
    pub using_proxy: bool,
}

impl Default for ClientContext {
    fn default() -> Self {
        let version = env!("CARGO_PKG_VERSION").to_string();
        Self {
            user_agent: format!("client-metrics/{version}"),
            client_type: "SDK_CLIENT".to_string(),
            sub_client_type: "MOBILE_APP".to_string(),
            os: std::env::consts::OS.to_string(),
            os_version: "unknown".to_string(),
            client_version: version,
            media_engine_version: "unknown".to_string(),
            network_type: NetworkType::Unknown,
            using_proxy: false,
        }
    }
}

impl ClientContext {
    /// Builds a media-quality event for one reporting interval.
    ///
    /// The origin's local address comes from the first media line that has one, falling back to
    /// the loopback address.
    pub fn media_quality_event(
        &self,
        identifiers: Identifiers,
        media_lines: Option<Vec<MediaLine>>,
        interval: Payload,
    ) -> DiagnosticEvent {
        let event = ClientEvent {
            name: ClientEventName::MediaQuality,
            identifiers,
            can_proceed: true,
            media_lines,
            intervals: vec![interval],
        };
        let local_ip = event.local_ip().unwrap_or(FALLBACK_LOCAL_IP).to_string();

        let client_info = ClientInfo {
            client_type: self.client_type.clone(),
            sub_client_type: self.sub_client_type.clone(),
            os: self.os.clone(),
            os_version: self.os_version.clone(),
            local_ip: local_ip.clone(),
            client_version: self.client_version.clone(),
        };
        let origin = DiagnosticOrigin {
            user_agent: self.user_agent.clone(),
            network_type: self.network_type,
            local_ip_address: local_ip,
            using_proxy: self.using_proxy,
            media_engine_software_version: self.media_engine_version.clone(),
            client_info,
        };

        DiagnosticEvent {
            event_id: Uuid::new_v4(),
            version: DIAGNOSTIC_SCHEMA_VERSION,
            origin,
            origin_time: OriginTime::now(),
            event,
        }
    }
}
