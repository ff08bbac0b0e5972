use super::common::{require, LinkParts};
use super::stream::{build_transport, StreamOptions};
use crate::error::{ParseError, Result};
use crate::models::{Proxy, ProxyNode, VlessNode, SCHEME_VLESS};
use crate::parser::ParseSettings;
use crate::utils::string::non_empty;

/// Parse a VLESS link into a Proxy object
///
/// The user-info is the UUID and is taken verbatim, never Base64-decoded.
pub fn explode_vless(vless: &str, _settings: &ParseSettings) -> Result<Proxy> {
    if !vless.starts_with(SCHEME_VLESS) {
        return Err(ParseError::malformed(format!("not a vless link: {}", vless)));
    }

    let parts = LinkParts::parse(vless)?;
    let uuid = require(&parts.username, "vless uuid")?;
    let params = &parts.params;

    let mut transport = build_transport(&StreamOptions::from_query(params), "none");
    transport.packet_encoding = params
        .get_any(&["packetEncoding", "packet_encoding"])
        .and_then(non_empty);

    let node = VlessNode {
        uuid,
        flow: params.get_any(&["flow"]).and_then(non_empty),
        encryption: params
            .get_any(&["encryption"])
            .and_then(non_empty)
            .unwrap_or_else(|| "none".to_string()),
    };

    Ok(Proxy {
        raw_uri: vless.to_string(),
        remark: parts.remark,
        hostname: parts.host,
        port: parts.port,
        node: ProxyNode::Vless(node),
        transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Network;

    fn vless_node(proxy: &Proxy) -> &VlessNode {
        match &proxy.node {
            ProxyNode::Vless(node) => node,
            other => panic!("expected vless, got {:?}", other),
        }
    }

    #[test]
    fn test_reality_link() {
        let proxy = crate::parser::explode(
            "vless://b831381d-6324-4d53-ad4f-8cda48b30811@1.2.3.4:443?encryption=none&flow=xtls-rprx-vision&security=reality&sni=www.apple.com&fp=chrome&pbk=Z84J2IelR9ch3k8VtlVhhs5ycBUlXA7wHBWcBrjqnAw&sid=6ba85179e30d4fc2&type=tcp#reality",
            &ParseSettings::default(),
        )
        .unwrap();

        let node = vless_node(&proxy);
        assert_eq!(node.uuid, "b831381d-6324-4d53-ad4f-8cda48b30811");
        assert_eq!(node.flow.as_deref(), Some("xtls-rprx-vision"));
        assert_eq!(node.encryption, "none");
        assert_eq!(proxy.transport.network, Network::Tcp);

        let reality = proxy.transport.security.reality().unwrap();
        assert_eq!(reality.server_name.as_deref(), Some("www.apple.com"));
        assert_eq!(reality.short_id, "6ba85179e30d4fc2");
        assert_eq!(reality.fingerprint.as_deref(), Some("chrome"));
        assert_eq!(proxy.remark, "reality");
    }

    #[test]
    fn test_ws_tls_and_packet_encoding() {
        let proxy = crate::parser::explode(
            "vless://uuid-1@h.com:443?type=ws&security=tls&path=%2Fvl%3Fed%3D2560&host=cdn.h.com&packetEncoding=xudp",
            &ParseSettings::default(),
        )
        .unwrap();
        assert_eq!(proxy.transport.network, Network::Ws);
        assert_eq!(proxy.transport.ws.as_ref().unwrap().max_early_data, 2560);
        assert_eq!(proxy.transport.packet_encoding.as_deref(), Some("xudp"));
        assert!(proxy.transport.security.tls().is_some());
        assert_eq!(vless_node(&proxy).encryption, "none");
    }

    #[test]
    fn test_missing_uuid() {
        assert!(matches!(
            crate::parser::explode("vless://h.com:443", &ParseSettings::default()),
            Err(ParseError::MalformedUri(_))
        ));
    }
}
