//! Shared WebSocket adapter state.
//!
//! Room sessions depend on driving ports for reads and writes and on the
//! presence and subscription ports for connection bookkeeping, so the
//! adapter can be exercised with in-memory doubles.

use std::sync::Arc;

use url::Url;

use crate::domain::ports::{
    ChatMessageCommand, ChatRoomQuery, PresenceRegistry, RealtimeSubscriber,
};

/// Origins allowed to open a WebSocket.
///
/// Entries are `scheme://host[:port]`; a host of the form `*.example.com`
/// admits every subdomain of `example.com` but not the apex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedOrigins {
    entries: Vec<OriginPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginPattern {
    scheme: String,
    host: HostPattern,
    port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Exact(String),
    Subdomains(String),
}

impl AllowedOrigins {
    /// Parse configured entries, skipping the ones that are not origins.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|entry| OriginPattern::parse(entry.as_ref()))
            .collect();
        Self { entries }
    }

    /// Whether `origin` matches any configured entry.
    pub fn allows(&self, origin: &Url) -> bool {
        self.entries.iter().any(|pattern| pattern.matches(origin))
    }
}

impl OriginPattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_end_matches('/');
        let (scheme, rest) = raw.split_once("://")?;
        if let Some(apex) = rest.strip_prefix("*.") {
            let url = Url::parse(&format!("{scheme}://{apex}")).ok()?;
            return Some(Self {
                scheme: url.scheme().to_owned(),
                host: HostPattern::Subdomains(url.host_str()?.to_owned()),
                port: url.port_or_known_default(),
            });
        }
        let url = Url::parse(raw).ok()?;
        Some(Self {
            scheme: url.scheme().to_owned(),
            host: HostPattern::Exact(url.host_str()?.to_owned()),
            port: url.port_or_known_default(),
        })
    }

    fn matches(&self, origin: &Url) -> bool {
        let Some(host) = origin.host_str() else {
            return false;
        };
        if origin.scheme() != self.scheme || origin.port_or_known_default() != self.port {
            return false;
        }
        match &self.host {
            HostPattern::Exact(expected) => host == expected,
            HostPattern::Subdomains(apex) => host
                .strip_suffix(apex.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.')),
        }
    }
}

/// Dependency bundle for WebSocket handlers and sessions.
#[derive(Clone)]
pub struct WsState {
    pub messages: Arc<dyn ChatMessageCommand>,
    pub rooms: Arc<dyn ChatRoomQuery>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub topics: Arc<dyn RealtimeSubscriber>,
    pub origins: AllowedOrigins,
}

/// Parameter object for [`WsState::new`].
pub struct WsStatePorts {
    pub messages: Arc<dyn ChatMessageCommand>,
    pub rooms: Arc<dyn ChatRoomQuery>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub topics: Arc<dyn RealtimeSubscriber>,
}

impl WsState {
    /// Construct state from explicit port implementations.
    pub fn new(ports: WsStatePorts, origins: AllowedOrigins) -> Self {
        let WsStatePorts {
            messages,
            rooms,
            presence,
            topics,
        } = ports;
        Self {
            messages,
            rooms,
            presence,
            topics,
            origins,
        }
    }
}
