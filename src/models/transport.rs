//! Transport descriptor
//!
//! Protocol-agnostic network, transport and security settings that every
//! parser fills in and every outbound format reads.

use std::fmt;

/// Header name sing-box uses to carry WebSocket early data.
pub const EARLY_DATA_HEADER_NAME: &str = "Sec-WebSocket-Protocol";

/// Underlying network of an outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Tcp,
    Ws,
    Grpc,
    Quic,
    Udp,
    Http,
}

impl Network {
    /// Maps the spellings found in share links onto a network.
    ///
    /// Returns `None` for values no supported runtime understands.
    pub fn from_link_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "tcp" | "raw" => Some(Network::Tcp),
            "ws" | "websocket" => Some(Network::Ws),
            "grpc" | "gun" => Some(Network::Grpc),
            "quic" => Some(Network::Quic),
            "udp" => Some(Network::Udp),
            "http" | "h2" => Some(Network::Http),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Ws => "ws",
            Network::Grpc => "grpc",
            Network::Quic => "quic",
            Network::Udp => "udp",
            Network::Http => "http",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS client settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TlsSettings {
    pub server_name: Option<String>,
    pub allow_insecure: bool,
    pub alpn: Vec<String>,
    /// uTLS client fingerprint (chrome, firefox, ...)
    pub fingerprint: Option<String>,
}

/// REALITY client settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RealitySettings {
    pub server_name: Option<String>,
    pub public_key: String,
    pub short_id: String,
    pub spider_x: Option<String>,
    pub fingerprint: Option<String>,
}

/// Security layer. Being an enum, TLS and REALITY can never both be active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Security {
    #[default]
    None,
    Tls(TlsSettings),
    Reality(RealitySettings),
}

impl Security {
    pub fn as_str(&self) -> &'static str {
        match self {
            Security::None => "none",
            Security::Tls(_) => "tls",
            Security::Reality(_) => "reality",
        }
    }

    pub fn tls(&self) -> Option<&TlsSettings> {
        match self {
            Security::Tls(tls) => Some(tls),
            _ => None,
        }
    }

    pub fn reality(&self) -> Option<&RealitySettings> {
        match self {
            Security::Reality(reality) => Some(reality),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Security::None)
    }
}

/// WebSocket transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WsSettings {
    /// Path with any `ed=<n>` early-data parameter removed
    pub path: String,
    pub host: Option<String>,
    pub max_early_data: u32,
    pub early_data_header_name: Option<String>,
}

/// gRPC transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrpcSettings {
    pub service_name: Option<String>,
    pub multi_mode: bool,
}

/// Header disguise used on plain TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcpHeaderType {
    #[default]
    None,
    Http,
}

/// TCP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TcpSettings {
    pub header_type: TcpHeaderType,
    pub host: Option<String>,
    pub path: Option<String>,
}

/// HTTP/2 transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpSettings {
    pub host: Option<String>,
    pub path: Option<String>,
}

/// Shadowsocks UDP-over-TCP settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpOverTcp {
    pub enabled: bool,
    pub version: u8,
}

impl Default for UdpOverTcp {
    fn default() -> Self {
        UdpOverTcp {
            enabled: false,
            version: 2,
        }
    }
}

/// Network, transport and security settings shared by all protocols.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportDescriptor {
    pub network: Network,
    pub security: Security,
    pub ws: Option<WsSettings>,
    pub grpc: Option<GrpcSettings>,
    pub tcp: Option<TcpSettings>,
    pub http: Option<HttpSettings>,
    /// Xray packet encoding (xudp, packetaddr)
    pub packet_encoding: Option<String>,
    pub udp_over_tcp: UdpOverTcp,
}

impl TransportDescriptor {
    /// Returns true when TCP carries an HTTP header disguise.
    pub fn has_http_header(&self) -> bool {
        self.network == Network::Tcp
            && self
                .tcp
                .as_ref()
                .map_or(false, |tcp| tcp.header_type == TcpHeaderType::Http)
    }
}

/// Splits an `ed=<n>` early-data parameter out of a WebSocket path.
///
/// Returns the path without the parameter and the parsed value (0 when
/// absent or not a number). Other query parameters stay on the path.
pub fn split_early_data(path: &str) -> (String, u32) {
    let (base, query) = match path.split_once('?') {
        Some((base, query)) => (base, query),
        None => return (path.to_string(), 0),
    };

    let mut early_data = 0;
    let mut rest = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some(("ed", value)) => early_data = value.parse::<u32>().unwrap_or(0),
            _ => rest.push(pair),
        }
    }

    let base = if base.is_empty() { "/" } else { base };
    if rest.is_empty() {
        (base.to_string(), early_data)
    } else {
        (format!("{}?{}", base, rest.join("&")), early_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_link_value() {
        assert_eq!(Network::from_link_value(""), Some(Network::Tcp));
        assert_eq!(Network::from_link_value("WebSocket"), Some(Network::Ws));
        assert_eq!(Network::from_link_value("h2"), Some(Network::Http));
        assert_eq!(Network::from_link_value("kcp"), None);
    }

    #[test]
    fn test_default_descriptor_is_plain_tcp() {
        let descriptor = TransportDescriptor::default();
        assert_eq!(descriptor.network, Network::Tcp);
        assert!(descriptor.security.is_none());
        assert!(!descriptor.udp_over_tcp.enabled);
        assert_eq!(descriptor.udp_over_tcp.version, 2);
    }

    #[test]
    fn test_split_early_data() {
        assert_eq!(split_early_data("/ws?ed=2048"), ("/ws".to_string(), 2048));
        assert_eq!(
            split_early_data("/ws?foo=1&ed=1024"),
            ("/ws?foo=1".to_string(), 1024)
        );
        assert_eq!(split_early_data("/plain"), ("/plain".to_string(), 0));
        assert_eq!(split_early_data("?ed=abc"), ("/".to_string(), 0));
    }
}
