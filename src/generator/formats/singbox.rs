use serde_json::{json, Value};

use crate::error::Result;
use crate::models::{
    Network, Proxy, ProxyNode, RealitySettings, Security, ShadowsocksNode, TlsSettings,
    TransportDescriptor,
};

const DEFAULT_UTLS_FINGERPRINT: &str = "chrome";

/// Convert a proxy to a sing-box outbound
///
/// Every protocol has a sing-box mapping, so this only fails for records
/// that could not have come out of a parser.
pub fn proxy_to_singbox(proxy: &Proxy, tag: &str) -> Result<Value> {
    let mut outbound = json!({
        "tag": tag,
        "server": proxy.address(),
        "server_port": proxy.port()
    });
    let transport = &proxy.transport;

    match &proxy.node {
        ProxyNode::VMess(node) => {
            outbound["type"] = json!("vmess");
            outbound["uuid"] = json!(node.uuid);
            outbound["alter_id"] = json!(node.alter_id);
            outbound["security"] = json!(node.security);
            apply_stream(&mut outbound, proxy);
        }
        ProxyNode::Vless(node) => {
            outbound["type"] = json!("vless");
            outbound["uuid"] = json!(node.uuid);
            if let Some(flow) = &node.flow {
                outbound["flow"] = json!(flow);
            }
            if let Some(packet_encoding) = &transport.packet_encoding {
                outbound["packet_encoding"] = json!(packet_encoding);
            }
            apply_stream(&mut outbound, proxy);
        }
        ProxyNode::Trojan(node) => {
            outbound["type"] = json!("trojan");
            outbound["password"] = json!(node.password);
            apply_stream(&mut outbound, proxy);
        }
        ProxyNode::Shadowsocks(node) => {
            outbound["type"] = json!("shadowsocks");
            outbound["method"] = json!(node.method);
            outbound["password"] = json!(node.password);
            apply_plugin(&mut outbound, node);
            if transport.udp_over_tcp.enabled {
                outbound["udp_over_tcp"] = json!({
                    "enabled": true,
                    "version": transport.udp_over_tcp.version
                });
            }
        }
        ProxyNode::ShadowsocksR(node) => {
            outbound["type"] = json!("shadowsocksr");
            outbound["method"] = json!(node.method);
            outbound["password"] = json!(node.password);
            outbound["protocol"] = json!(node.protocol);
            outbound["obfs"] = json!(node.obfs);
            if let Some(param) = &node.protocol_param {
                outbound["protocol_param"] = json!(param);
            }
            if let Some(param) = &node.obfs_param {
                outbound["obfs_param"] = json!(param);
            }
        }
        ProxyNode::WireGuard(node) => {
            outbound["type"] = json!("wireguard");
            outbound["local_address"] = json!(node.local_address);
            outbound["private_key"] = json!(node.private_key);
            outbound["peer_public_key"] = json!(node.public_key);
            outbound["mtu"] = json!(node.mtu);
            if let Some(psk) = &node.pre_shared_key {
                outbound["pre_shared_key"] = json!(psk);
            }
            if !node.reserved.is_empty() {
                outbound["reserved"] = json!(node.reserved);
            }
        }
        ProxyNode::Hysteria2(node) => {
            outbound["type"] = json!("hysteria2");
            outbound["password"] = json!(node.auth);
            if node.up_mbps > 0 {
                outbound["up_mbps"] = json!(node.up_mbps);
            }
            if node.down_mbps > 0 {
                outbound["down_mbps"] = json!(node.down_mbps);
            }
            if let Some(obfs) = &node.obfs {
                let mut obfs_block = json!({ "type": obfs });
                if let Some(password) = &node.obfs_password {
                    obfs_block["password"] = json!(password);
                }
                outbound["obfs"] = obfs_block;
            }
            // Hysteria2 is always QUIC, so the TLS block goes on without uTLS
            if let Security::Tls(tls) = &transport.security {
                let mut block = tls_block(tls, proxy.address());
                if let Some(obj) = block.as_object_mut() {
                    obj.remove("utls");
                }
                outbound["tls"] = block;
            }
        }
    }

    Ok(outbound)
}

/// Adds `transport` and `tls` for the V2Ray-family protocols.
fn apply_stream(outbound: &mut Value, proxy: &Proxy) {
    if let Some(transport) = transport_block(&proxy.transport) {
        outbound["transport"] = transport;
    }
    match &proxy.transport.security {
        Security::Tls(tls) => outbound["tls"] = tls_block(tls, proxy.address()),
        Security::Reality(reality) => outbound["tls"] = reality_block(reality, proxy.address()),
        Security::None => {}
    }
}

/// sing-box has no tcp transport type; plain tcp means no block at all.
pub fn transport_block(transport: &TransportDescriptor) -> Option<Value> {
    match transport.network {
        Network::Ws => {
            let ws = transport.ws.clone().unwrap_or_default();
            let mut block = json!({
                "type": "ws",
                "path": if ws.path.is_empty() { "/".to_string() } else { ws.path }
            });
            if let Some(host) = &ws.host {
                block["headers"] = json!({ "Host": host });
            }
            if ws.max_early_data > 0 {
                block["max_early_data"] = json!(ws.max_early_data);
                if let Some(name) = &ws.early_data_header_name {
                    block["early_data_header_name"] = json!(name);
                }
            }
            Some(block)
        }
        Network::Grpc => {
            let grpc = transport.grpc.clone().unwrap_or_default();
            let mut block = json!({ "type": "grpc" });
            if let Some(service_name) = &grpc.service_name {
                block["service_name"] = json!(service_name);
            }
            Some(block)
        }
        Network::Http => {
            let http = transport.http.clone().unwrap_or_default();
            let mut block = json!({ "type": "http" });
            if let Some(host) = &http.host {
                block["host"] = json!(host.split(',').map(str::trim).collect::<Vec<_>>());
            }
            if let Some(path) = &http.path {
                block["path"] = json!(path);
            }
            Some(block)
        }
        Network::Tcp if transport.has_http_header() => {
            let tcp = transport.tcp.clone().unwrap_or_default();
            let mut block = json!({
                "type": "http",
                "method": "GET",
                "path": tcp.path.unwrap_or_else(|| "/".to_string())
            });
            if let Some(host) = &tcp.host {
                block["host"] = json!([host]);
            }
            Some(block)
        }
        Network::Quic => Some(json!({ "type": "quic" })),
        Network::Tcp | Network::Udp => None,
    }
}

pub fn tls_block(tls: &TlsSettings, address: &str) -> Value {
    let mut block = json!({
        "enabled": true,
        "server_name": tls.server_name.as_deref().unwrap_or(address)
    });
    if tls.allow_insecure {
        block["insecure"] = json!(true);
    }
    if !tls.alpn.is_empty() {
        block["alpn"] = json!(tls.alpn);
    }
    if let Some(fingerprint) = &tls.fingerprint {
        block["utls"] = json!({
            "enabled": true,
            "fingerprint": fingerprint
        });
    }
    block
}

/// REALITY lives inside the TLS block and always needs uTLS.
pub fn reality_block(reality: &RealitySettings, address: &str) -> Value {
    json!({
        "enabled": true,
        "server_name": reality.server_name.as_deref().unwrap_or(address),
        "utls": {
            "enabled": true,
            "fingerprint": reality
                .fingerprint
                .as_deref()
                .unwrap_or(DEFAULT_UTLS_FINGERPRINT)
        },
        "reality": {
            "enabled": true,
            "public_key": reality.public_key,
            "short_id": reality.short_id
        }
    })
}

fn apply_plugin(outbound: &mut Value, node: &ShadowsocksNode) {
    let plugin = match &node.plugin {
        Some(plugin) if !plugin.name.is_empty() => plugin,
        _ => return,
    };
    let name = match plugin.name.as_str() {
        "simple-obfs" => "obfs-local",
        other => other,
    };
    outbound["plugin"] = json!(name);

    let options = plugin.options_string();
    if !options.is_empty() {
        outbound["plugin_opts"] = json!(options);
    }
}
