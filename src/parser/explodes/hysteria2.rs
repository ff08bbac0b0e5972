use super::common::{require, LinkParts};
use crate::error::{ParseError, Result};
use crate::models::{
    Hysteria2Node, Network, Proxy, ProxyNode, Security, TlsSettings, TransportDescriptor,
    SCHEME_HYSTERIA2,
};
use crate::parser::ParseSettings;
use crate::utils::string::{non_empty, split_list};

/// Leading digits of a bandwidth value such as `100` or `100 mbps`.
fn parse_mbps(value: Option<&str>) -> u32 {
    value
        .map(|v| {
            v.trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u32>().ok())
        .unwrap_or(0)
}

/// Parse a Hysteria2 link into a Proxy object
///
/// `hy2://` links arrive here with the canonical `hysteria2://` prefix.
pub fn explode_hysteria2(hysteria2: &str, _settings: &ParseSettings) -> Result<Proxy> {
    if !hysteria2.starts_with(SCHEME_HYSTERIA2) {
        return Err(ParseError::malformed(format!(
            "not a hysteria2 link: {}",
            hysteria2
        )));
    }

    let parts = LinkParts::parse(hysteria2)?;
    let auth = require(&parts.userinfo(), "hysteria2 auth")?;
    let params = &parts.params;

    let tls = TlsSettings {
        server_name: params.get_any(&["sni", "peer"]).and_then(non_empty),
        allow_insecure: params.flag_any(&["insecure", "allow_insecure", "allowInsecure"]),
        alpn: params.get_any(&["alpn"]).map(split_list).unwrap_or_default(),
        fingerprint: params.get_any(&["fp", "fingerprint"]).and_then(non_empty),
    };

    let node = Hysteria2Node {
        auth,
        obfs: params.get_any(&["obfs"]).and_then(non_empty),
        obfs_password: params.get_any(&["obfs-password"]).and_then(non_empty),
        up_mbps: parse_mbps(params.get_any(&["upmbps", "up"])),
        down_mbps: parse_mbps(params.get_any(&["downmbps", "down"])),
    };

    Ok(Proxy {
        raw_uri: hysteria2.to_string(),
        remark: parts.remark,
        hostname: parts.host,
        port: parts.port,
        node: ProxyNode::Hysteria2(node),
        transport: TransportDescriptor {
            network: Network::Udp,
            security: Security::Tls(tls),
            ..Default::default()
        },
    })
}
