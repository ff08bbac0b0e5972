use log::{debug, warn};

use super::common::{LinkParts, QueryParams};
use crate::error::{ParseError, Result};
use crate::models::transport::{split_early_data, EARLY_DATA_HEADER_NAME};
use crate::models::{
    GrpcSettings, Network, PluginConfig, PluginOptions, Proxy, ProxyNode, Security, ShadowsocksNode,
    TcpHeaderType, TcpSettings, TlsSettings, TransportDescriptor, UdpOverTcp, WsSettings,
    SCHEME_SS,
};
use crate::parser::parse_settings::{is_known_cipher, CipherPolicy};
use crate::parser::ParseSettings;
use crate::utils::base64::decode_base64_lenient;
use crate::utils::string::non_empty;

/// Plugin options some generators put next to `plugin=` instead of inside it.
const LOOSE_PLUGIN_KEYS: &[&str] = &[
    "obfs",
    "obfs-host",
    "obfs-uri",
    "mode",
    "host",
    "path",
    "tls",
    "mux",
];

/// Keys that can trail a plugin value but belong to the link itself.
const NON_PLUGIN_KEYS: &[&str] = &[
    "uot",
    "udp-over-tcp",
    "uot_version",
    "udp-over-tcp-version",
    "group",
];

/// Parse a canonical Shadowsocks link into a Proxy object
///
/// Accepts `ss://method:password@host:port`, the SIP002 form with Base64
/// user-info and, after normalization, the legacy all-Base64 form.
pub fn explode_ss(ss: &str, settings: &ParseSettings) -> Result<Proxy> {
    if !ss.starts_with(SCHEME_SS) {
        return Err(ParseError::malformed(format!("not a shadowsocks link: {}", ss)));
    }

    let parts = LinkParts::parse(ss)?;
    let (method, password) = split_credentials(&parts.userinfo())?;
    let method = resolve_cipher(&method, settings.cipher_policy)?;

    let mut plugin = parts
        .params
        .get_any(&["plugin"])
        .map(|value| parse_plugin(value, &parts.params));

    let mut transport = match &plugin {
        Some(plugin) => plugin_transport(plugin),
        None => TransportDescriptor::default(),
    };
    transport.udp_over_tcp = udp_over_tcp(&parts.params, plugin.as_ref());
    if let Some(plugin) = plugin.as_mut() {
        for key in NON_PLUGIN_KEYS {
            plugin.options.remove(*key);
        }
    }

    Ok(Proxy {
        raw_uri: ss.to_string(),
        remark: parts.remark,
        hostname: parts.host,
        port: parts.port,
        node: ProxyNode::Shadowsocks(ShadowsocksNode {
            method,
            password,
            plugin,
        }),
        transport,
    })
}

/// Splits user-info into method and password, trying Base64 first.
fn split_credentials(userinfo: &str) -> Result<(String, String)> {
    let decoded = match decode_base64_lenient(userinfo) {
        Ok(decoded) if decoded.contains(':') => decoded,
        _ => userinfo.to_string(),
    };

    match decoded.split_once(':') {
        Some((method, password)) if !method.trim().is_empty() => {
            Ok((method.trim().to_string(), password.to_string()))
        }
        _ => Err(ParseError::malformed("missing shadowsocks method or password")),
    }
}

/// Lowercases a cipher name, aliases `rc4` and applies the cipher policy.
pub fn resolve_cipher(method: &str, policy: CipherPolicy) -> Result<String> {
    let method = match method.to_ascii_lowercase().as_str() {
        "rc4" => "rc4-md5".to_string(),
        other => other.to_string(),
    };

    if is_known_cipher(&method) {
        return Ok(method);
    }
    match policy {
        CipherPolicy::Permissive => {
            debug!("Keeping unknown shadowsocks cipher '{}'", method);
            Ok(method)
        }
        CipherPolicy::FallbackNone => {
            warn!("Unknown shadowsocks cipher '{}', using 'none'", method);
            Ok("none".to_string())
        }
        CipherPolicy::Strict => Err(ParseError::malformed(format!(
            "unsupported shadowsocks cipher: {}",
            method
        ))),
    }
}

/// Parses `name;key=value;flag` and merges loose plugin keys from the query.
pub fn parse_plugin(value: &str, params: &QueryParams) -> PluginConfig {
    let mut pieces = value.split(';');
    let name = pieces.next().unwrap_or_default().trim().to_string();

    let mut options = PluginOptions::new();
    for piece in pieces.map(str::trim).filter(|p| !p.is_empty()) {
        match piece.split_once('=') {
            Some((key, value)) => options.insert(key.trim().to_string(), Some(value.to_string())),
            None => options.insert(piece.to_string(), None),
        };
    }

    for (key, value) in params.iter() {
        if LOOSE_PLUGIN_KEYS.contains(&key) && !options.contains_key(key) {
            options.insert(key.to_string(), non_empty(value));
        }
    }

    PluginConfig { name, options }
}

/// Transport implied by a SIP003 plugin.
fn plugin_transport(plugin: &PluginConfig) -> TransportDescriptor {
    let mut transport = TransportDescriptor::default();

    match plugin.name.as_str() {
        "v2ray-plugin" | "xray-plugin" => {
            let host = plugin.get("host").and_then(non_empty);
            match plugin.get("mode").unwrap_or("websocket") {
                "quic" => transport.network = Network::Quic,
                "grpc" => {
                    transport.network = Network::Grpc;
                    transport.grpc = Some(GrpcSettings {
                        service_name: plugin.get("serviceName").and_then(non_empty),
                        multi_mode: false,
                    });
                }
                _ => {
                    let (path, max_early_data) = split_early_data(plugin.get("path").unwrap_or("/"));
                    transport.network = Network::Ws;
                    transport.ws = Some(WsSettings {
                        path,
                        host: host.clone(),
                        max_early_data,
                        early_data_header_name: (max_early_data > 0)
                            .then(|| EARLY_DATA_HEADER_NAME.to_string()),
                    });
                }
            }
            if plugin.is_enabled("tls") {
                transport.security = Security::Tls(TlsSettings {
                    server_name: host,
                    ..Default::default()
                });
            }
        }
        "obfs-local" | "simple-obfs" => {
            transport.network = Network::Tcp;
            transport.tcp = Some(TcpSettings {
                header_type: TcpHeaderType::Http,
                host: plugin.get("obfs-host").and_then(non_empty),
                path: Some(
                    plugin
                        .get("obfs-uri")
                        .and_then(non_empty)
                        .unwrap_or_else(|| "/".to_string()),
                ),
            });
        }
        other => debug!("No transport mapping for plugin '{}'", other),
    }

    transport
}

fn udp_over_tcp(params: &QueryParams, plugin: Option<&PluginConfig>) -> UdpOverTcp {
    const ENABLE_KEYS: &[&str] = &["uot", "udp-over-tcp"];
    const VERSION_KEYS: &[&str] = &["uot_version", "udp-over-tcp-version"];

    let enabled = params.flag_any(ENABLE_KEYS)
        || plugin.map_or(false, |p| ENABLE_KEYS.iter().any(|key| p.is_enabled(key)));
    let version = params
        .get_any(VERSION_KEYS)
        .or_else(|| plugin.and_then(|p| VERSION_KEYS.iter().find_map(|key| p.get(key))))
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(UdpOverTcp::default().version);

    UdpOverTcp { enabled, version }
}
