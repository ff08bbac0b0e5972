use serde_json::{json, Value};

use crate::error::{ParseError, Result};
use crate::models::{
    GrpcSettings, HttpSettings, Network, Proxy, ProxyNode, RealitySettings, Security, Target,
    TcpSettings, TlsSettings, WsSettings,
};

/// REALITY needs a uTLS fingerprint; Xray clients default to chrome.
const DEFAULT_REALITY_FINGERPRINT: &str = "chrome";

/// Convert a proxy to an Xray outbound
///
/// Produces `{protocol, tag, settings, streamSettings}`. ShadowsocksR and
/// WireGuard have no Xray mapping and yield
/// [`ParseError::UnsupportedScheme`].
pub fn proxy_to_xray(proxy: &Proxy, tag: &str) -> Result<Value> {
    let address = proxy.address();
    let port = proxy.port();

    let (protocol, settings) = match &proxy.node {
        ProxyNode::VMess(node) => (
            "vmess",
            json!({
                "vnext": [{
                    "address": address,
                    "port": port,
                    "users": [{
                        "id": node.uuid,
                        "alterId": node.alter_id,
                        "security": node.security,
                        "level": 0
                    }]
                }]
            }),
        ),
        ProxyNode::Vless(node) => {
            let mut user = json!({
                "id": node.uuid,
                "encryption": node.encryption,
                "level": 0
            });
            if let Some(flow) = &node.flow {
                user["flow"] = json!(flow);
            }
            (
                "vless",
                json!({
                    "vnext": [{
                        "address": address,
                        "port": port,
                        "users": [user]
                    }]
                }),
            )
        }
        ProxyNode::Trojan(node) => (
            "trojan",
            json!({
                "servers": [{
                    "address": address,
                    "port": port,
                    "password": node.password,
                    "level": 0
                }]
            }),
        ),
        ProxyNode::Shadowsocks(node) => {
            let mut server = json!({
                "address": address,
                "port": port,
                "method": node.method,
                "password": node.password
            });
            let uot = proxy.transport.udp_over_tcp;
            if uot.enabled {
                server["uot"] = json!(true);
                server["UoTVersion"] = json!(uot.version);
            }
            ("shadowsocks", json!({ "servers": [server] }))
        }
        ProxyNode::Hysteria2(node) => {
            let mut settings = json!({
                "server": address,
                "port": port,
                "auth": node.auth
            });
            if let Some(password) = &node.obfs_password {
                settings["password"] = json!(password);
            }
            ("hysteria2", settings)
        }
        ProxyNode::ShadowsocksR(_) | ProxyNode::WireGuard(_) => {
            return Err(ParseError::UnsupportedScheme {
                scheme: proxy.proxy_type().scheme_name().to_string(),
                target: Target::Xray,
            })
        }
    };

    Ok(json!({
        "protocol": protocol,
        "tag": tag,
        "settings": settings,
        "streamSettings": stream_settings(proxy)
    }))
}

/// Builds `streamSettings`. `network` and `security` are always present.
pub fn stream_settings(proxy: &Proxy) -> Value {
    let transport = &proxy.transport;
    let mut stream = json!({
        "network": transport.network.as_str(),
        "security": transport.security.as_str()
    });

    if let Some(packet_encoding) = &transport.packet_encoding {
        stream["packetEncoding"] = json!(packet_encoding);
    }

    match transport.network {
        Network::Ws => {
            if let Some(ws) = &transport.ws {
                stream["wsSettings"] = ws_settings(ws);
            }
        }
        Network::Grpc => {
            if let Some(grpc) = &transport.grpc {
                stream["grpcSettings"] = grpc_settings(grpc);
            }
        }
        Network::Http => {
            if let Some(http) = &transport.http {
                stream["httpSettings"] = http_settings(http);
            }
        }
        Network::Tcp => {
            if let (true, Some(tcp)) = (transport.has_http_header(), &transport.tcp) {
                stream["tcpSettings"] = tcp_http_settings(tcp);
            }
        }
        Network::Quic => stream["quicSettings"] = json!({ "header": { "type": "none" } }),
        Network::Udp => {}
    }

    match &transport.security {
        Security::Tls(tls) => stream["tlsSettings"] = tls_settings(tls, proxy.address()),
        Security::Reality(reality) => {
            stream["realitySettings"] = reality_settings(reality, proxy.address())
        }
        Security::None => {}
    }

    stream
}

/// Early data stays on the path as Xray's native `?ed=<n>` hint.
fn ws_settings(ws: &WsSettings) -> Value {
    let path = if ws.max_early_data > 0 {
        let separator = if ws.path.contains('?') { '&' } else { '?' };
        format!("{}{}ed={}", ws.path, separator, ws.max_early_data)
    } else {
        ws.path.clone()
    };

    let mut settings = json!({ "path": if path.is_empty() { "/".to_string() } else { path } });
    if let Some(host) = &ws.host {
        settings["headers"] = json!({ "Host": host });
    }
    settings
}

fn grpc_settings(grpc: &GrpcSettings) -> Value {
    let mut settings = json!({ "multiMode": grpc.multi_mode });
    if let Some(service_name) = &grpc.service_name {
        settings["serviceName"] = json!(service_name);
    }
    settings
}

fn http_settings(http: &HttpSettings) -> Value {
    let mut settings = json!({});
    if let Some(host) = &http.host {
        settings["host"] = json!(host.split(',').map(str::trim).collect::<Vec<_>>());
    }
    if let Some(path) = &http.path {
        settings["path"] = json!(path);
    }
    settings
}

fn tcp_http_settings(tcp: &TcpSettings) -> Value {
    let mut request = json!({
        "path": [tcp.path.clone().unwrap_or_else(|| "/".to_string())]
    });
    if let Some(host) = &tcp.host {
        request["headers"] = json!({ "Host": [host] });
    }
    json!({
        "header": {
            "type": "http",
            "request": request
        }
    })
}

fn tls_settings(tls: &TlsSettings, address: &str) -> Value {
    let mut settings = json!({
        "serverName": tls.server_name.as_deref().unwrap_or(address),
        "allowInsecure": tls.allow_insecure
    });
    if !tls.alpn.is_empty() {
        settings["alpn"] = json!(tls.alpn);
    }
    if let Some(fingerprint) = &tls.fingerprint {
        settings["fingerprint"] = json!(fingerprint);
    }
    settings
}

fn reality_settings(reality: &RealitySettings, address: &str) -> Value {
    let mut settings = json!({
        "serverName": reality.server_name.as_deref().unwrap_or(address),
        "publicKey": reality.public_key,
        "shortId": reality.short_id,
        "fingerprint": reality
            .fingerprint
            .as_deref()
            .unwrap_or(DEFAULT_REALITY_FINGERPRINT)
    });
    if let Some(spider_x) = &reality.spider_x {
        settings["spiderX"] = json!(spider_x);
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{explode, ParseSettings};

    fn xray(link: &str) -> Result<Value> {
        let proxy = explode(link, &ParseSettings::default())?;
        proxy_to_xray(&proxy, "proxy")
    }

    #[test]
    fn test_shadowsocks_servers() {
        let out = xray("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpwYXNz@1.2.3.4:8388#tag").unwrap();
        assert_eq!(out["protocol"], "shadowsocks");
        assert_eq!(out["tag"], "proxy");
        let server = &out["settings"]["servers"][0];
        assert_eq!(server["address"], "1.2.3.4");
        assert_eq!(server["port"], 8388);
        assert_eq!(server["method"], "chacha20-ietf-poly1305");
        assert_eq!(server["password"], "pass");
        assert!(server.get("uot").is_none());
        assert_eq!(out["streamSettings"]["network"], "tcp");
        assert_eq!(out["streamSettings"]["security"], "none");
    }

    #[test]
    fn test_shadowsocks_uot() {
        let out = xray("ss://aes-128-gcm:pw@h.com:80?uot=1").unwrap();
        let server = &out["settings"]["servers"][0];
        assert_eq!(server["uot"], true);
        assert_eq!(server["UoTVersion"], 2);
    }

    #[test]
    fn test_hysteria2() {
        let out = xray("hysteria2://auth123@5.6.7.8:443?insecure=1&sni=example.com&obfs-password=x")
            .unwrap();
        assert_eq!(out["settings"]["auth"], "auth123");
        assert_eq!(out["settings"]["password"], "x");
        let stream = &out["streamSettings"];
        assert_eq!(stream["network"], "udp");
        assert_eq!(stream["security"], "tls");
        assert_eq!(stream["tlsSettings"]["allowInsecure"], true);
        assert_eq!(stream["tlsSettings"]["serverName"], "example.com");
    }

    #[test]
    fn test_ws_keeps_early_data_hint() {
        let out = xray("vless://u@h.com:443?type=ws&path=%2Fws%3Fed%3D2048&host=cdn.h.com&security=tls")
            .unwrap();
        let ws = &out["streamSettings"]["wsSettings"];
        assert_eq!(ws["path"], "/ws?ed=2048");
        assert_eq!(ws["headers"]["Host"], "cdn.h.com");
        assert_eq!(out["streamSettings"]["tlsSettings"]["serverName"], "h.com");
    }

    #[test]
    fn test_reality_has_no_tls_settings() {
        let out = xray("vless://u@h.com:443?security=reality&pbk=KEY&sid=01&sni=www.apple.com&flow=xtls-rprx-vision")
            .unwrap();
        let stream = &out["streamSettings"];
        assert!(stream.get("tlsSettings").is_none());
        assert_eq!(stream["realitySettings"]["publicKey"], "KEY");
        assert_eq!(stream["realitySettings"]["fingerprint"], "chrome");
        assert!(stream["realitySettings"].get("spiderX").is_none());
        assert_eq!(out["settings"]["vnext"][0]["users"][0]["flow"], "xtls-rprx-vision");
    }

    #[test]
    fn test_tcp_http_header() {
        let out = xray("trojan://pw@h.com:443?headerType=http&host=a.com").unwrap();
        let header = &out["streamSettings"]["tcpSettings"]["header"];
        assert_eq!(header["type"], "http");
        assert_eq!(header["request"]["path"][0], "/");
        assert_eq!(header["request"]["headers"]["Host"][0], "a.com");
    }

    #[test]
    fn test_ssr_and_wireguard_are_unsupported() {
        let result = xray("wireguard://priv@h.com:51820?publickey=pub");
        assert_eq!(
            result,
            Err(ParseError::UnsupportedScheme {
                scheme: "wireguard".to_string(),
                target: Target::Xray
            })
        );
    }
}
