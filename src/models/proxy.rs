//! Proxy model definitions
//!
//! Contains the canonical record produced by the link parsers.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use super::transport::TransportDescriptor;

pub const SCHEME_VMESS: &str = "vmess://";
pub const SCHEME_VLESS: &str = "vless://";
pub const SCHEME_TROJAN: &str = "trojan://";
pub const SCHEME_SS: &str = "ss://";
pub const SCHEME_SSR: &str = "ssr://";
pub const SCHEME_WIREGUARD: &str = "wireguard://";
pub const SCHEME_HYSTERIA2: &str = "hysteria2://";

/// Represents the type of a proxy.
/// This is the canonical enum used for protocol identification across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    VMess,
    Vless,
    Trojan,
    Shadowsocks,
    ShadowsocksR,
    WireGuard,
    Hysteria2,
}

impl ProxyType {
    /// All supported protocols, in aggregate ordering.
    pub const ALL: [ProxyType; 7] = [
        ProxyType::VMess,
        ProxyType::Vless,
        ProxyType::Trojan,
        ProxyType::Shadowsocks,
        ProxyType::ShadowsocksR,
        ProxyType::Hysteria2,
        ProxyType::WireGuard,
    ];

    /// Looks up a protocol by the scheme name in front of `://`.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "vmess" => Some(ProxyType::VMess),
            "vless" => Some(ProxyType::Vless),
            "trojan" => Some(ProxyType::Trojan),
            "ss" => Some(ProxyType::Shadowsocks),
            "ssr" => Some(ProxyType::ShadowsocksR),
            "wireguard" | "wg" => Some(ProxyType::WireGuard),
            "hysteria2" | "hy2" => Some(ProxyType::Hysteria2),
            _ => None,
        }
    }

    /// The canonical link prefix, including `://`.
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::VMess => SCHEME_VMESS,
            ProxyType::Vless => SCHEME_VLESS,
            ProxyType::Trojan => SCHEME_TROJAN,
            ProxyType::Shadowsocks => SCHEME_SS,
            ProxyType::ShadowsocksR => SCHEME_SSR,
            ProxyType::WireGuard => SCHEME_WIREGUARD,
            ProxyType::Hysteria2 => SCHEME_HYSTERIA2,
        }
    }

    /// Scheme name without `://`, as used in errors and aggregate items.
    pub fn scheme_name(self) -> &'static str {
        self.scheme().trim_end_matches("://")
    }

    /// Converts a `ProxyType` into a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ProxyType::VMess => "VMess",
            ProxyType::Vless => "VLESS",
            ProxyType::Trojan => "Trojan",
            ProxyType::Shadowsocks => "SS",
            ProxyType::ShadowsocksR => "SSR",
            ProxyType::WireGuard => "WireGuard",
            ProxyType::Hysteria2 => "Hysteria2",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SIP003 plugin options in link order. A `None` value is a bare flag such
/// as `tls`, which counts as true.
pub type PluginOptions = LinkedHashMap<String, Option<String>>;

/// A Shadowsocks SIP003 plugin and its options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginConfig {
    pub name: String,
    pub options: PluginOptions,
}

impl PluginConfig {
    /// Returns the value of an option, or `None` when missing or a flag.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_deref())
    }

    /// Returns true for a bare flag or a truthy value.
    pub fn is_enabled(&self, key: &str) -> bool {
        match self.options.get(key) {
            Some(None) => true,
            Some(Some(value)) => crate::utils::string::is_truthy(value),
            None => false,
        }
    }

    /// Renders the options back to `key1=value1;flag;key2=value2`.
    pub fn options_string(&self) -> String {
        self.options
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{}={}", key, value),
                None => key.clone(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VMessNode {
    pub uuid: String,
    pub alter_id: u16,
    /// Body cipher, `auto` unless the link says otherwise
    pub security: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlessNode {
    pub uuid: String,
    pub flow: Option<String>,
    pub encryption: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrojanNode {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowsocksNode {
    pub method: String,
    pub password: String,
    pub plugin: Option<PluginConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowsocksRNode {
    pub method: String,
    pub password: String,
    pub protocol: String,
    pub protocol_param: Option<String>,
    pub obfs: String,
    pub obfs_param: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireGuardNode {
    pub private_key: String,
    pub public_key: String,
    pub pre_shared_key: Option<String>,
    /// Interface addresses with prefix length
    pub local_address: Vec<String>,
    pub mtu: u16,
    pub reserved: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteria2Node {
    pub auth: String,
    pub obfs: Option<String>,
    pub obfs_password: Option<String>,
    /// upload speed in Mbps, 0 when unset
    pub up_mbps: u32,
    /// download speed in Mbps, 0 when unset
    pub down_mbps: u32,
}

/// Protocol-specific part of a [`Proxy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyNode {
    VMess(VMessNode),
    Vless(VlessNode),
    Trojan(TrojanNode),
    Shadowsocks(ShadowsocksNode),
    ShadowsocksR(ShadowsocksRNode),
    WireGuard(WireGuardNode),
    Hysteria2(Hysteria2Node),
}

/// Represents one parsed proxy link.
///
/// Created once by a parser and never mutated afterwards; the outbound
/// formats only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub raw_uri: String,
    pub remark: String,
    pub hostname: String,
    pub port: u16,
    pub node: ProxyNode,
    pub transport: TransportDescriptor,
}

impl Proxy {
    pub fn proxy_type(&self) -> ProxyType {
        match self.node {
            ProxyNode::VMess(_) => ProxyType::VMess,
            ProxyNode::Vless(_) => ProxyType::Vless,
            ProxyNode::Trojan(_) => ProxyType::Trojan,
            ProxyNode::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxyNode::ShadowsocksR(_) => ProxyType::ShadowsocksR,
            ProxyNode::WireGuard(_) => ProxyType::WireGuard,
            ProxyNode::Hysteria2(_) => ProxyType::Hysteria2,
        }
    }

    pub fn address(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn raw_uri(&self) -> &str {
        &self.raw_uri
    }

    /// An outbound can only be rendered for a non-empty address.
    pub fn has_usable_address(&self) -> bool {
        !self.hostname.trim().is_empty()
    }
}
