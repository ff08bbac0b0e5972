use serde_json::Value;

use super::common::{require, LinkParts};
use super::stream::{build_transport, StreamOptions};
use crate::error::{ParseError, Result};
use crate::models::{Proxy, ProxyNode, VMessNode, SCHEME_VMESS};
use crate::parser::ParseSettings;
use crate::utils::string::{is_truthy, non_empty};
use crate::utils::url::url_decode;

/// Reads a JSON field that generators write either as string or number.
fn json_text(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a VMess link into a Proxy object
///
/// Handles the decoded JSON form (`vmess://{"add":...}`) as well as the
/// AEAD URL form `vmess://uuid@host:port?type=...#remark`.
pub fn explode_vmess(vmess: &str, settings: &ParseSettings) -> Result<Proxy> {
    let body = vmess
        .strip_prefix(SCHEME_VMESS)
        .ok_or_else(|| ParseError::malformed(format!("not a vmess link: {}", vmess)))?;

    if body.trim_start().starts_with('{') {
        explode_vmess_json(vmess, body.trim())
    } else {
        explode_std_vmess(vmess, settings)
    }
}

fn explode_vmess_json(vmess: &str, body: &str) -> Result<Proxy> {
    // A fragment may follow the JSON object
    let mut stream = serde_json::Deserializer::from_str(body).into_iter::<Value>();
    let json = match stream.next() {
        Some(Ok(json)) => json,
        Some(Err(e)) => {
            return Err(ParseError::malformed(format!("invalid vmess json: {}", e)))
        }
        None => return Err(ParseError::malformed("empty vmess json")),
    };
    let fragment = body[stream.byte_offset()..]
        .trim()
        .strip_prefix('#')
        .map(url_decode);

    let hostname = require(&json_text(&json, "add").unwrap_or_default(), "vmess address")?;
    let port = json_text(&json, "port")
        .and_then(|p| p.trim().parse::<u16>().ok())
        .filter(|p| *p > 0)
        .ok_or_else(|| ParseError::malformed("missing vmess port"))?;
    let uuid = require(&json_text(&json, "id").unwrap_or_default(), "vmess id")?;
    let alter_id = json_text(&json, "aid")
        .and_then(|a| a.trim().parse::<u16>().ok())
        .unwrap_or(0);
    let security = json_text(&json, "scy").unwrap_or_else(|| "auto".to_string());

    let network = json_text(&json, "net");
    let header_type = json_text(&json, "type");
    let tls = json_text(&json, "tls");
    let sni = json_text(&json, "sni");
    let host = json_text(&json, "host");
    let path = json_text(&json, "path");
    let alpn = json_text(&json, "alpn");
    let fingerprint = json_text(&json, "fp");
    let public_key = json_text(&json, "pbk");
    let short_id = json_text(&json, "sid");
    let spider_x = json_text(&json, "spx");
    let insecure = json_text(&json, "allowInsecure")
        .or_else(|| json_text(&json, "insecure"))
        .map_or(false, |v| is_truthy(&v));

    // For grpc the header type slot carries the multiplex mode
    let options = StreamOptions {
        network: network.as_deref(),
        security: tls.as_deref(),
        sni: sni.as_deref(),
        host: host.as_deref(),
        path: path.as_deref(),
        service_name: None,
        mode: header_type.as_deref(),
        header_type: header_type.as_deref(),
        public_key: public_key.as_deref(),
        short_id: short_id.as_deref(),
        spider_x: spider_x.as_deref(),
        fingerprint: fingerprint.as_deref(),
        alpn: alpn.as_deref(),
        allow_insecure: insecure,
    };
    let transport = build_transport(&options, "none");

    let remark = json_text(&json, "ps")
        .or(fragment)
        .unwrap_or_default();

    Ok(Proxy {
        raw_uri: vmess.to_string(),
        remark,
        hostname,
        port,
        node: ProxyNode::VMess(VMessNode {
            uuid,
            alter_id,
            security,
        }),
        transport,
    })
}

/// Parse the AEAD URL form `vmess://uuid@host:port?...`.
pub fn explode_std_vmess(vmess: &str, _settings: &ParseSettings) -> Result<Proxy> {
    let parts = LinkParts::parse(vmess)?;
    let uuid = require(&parts.username, "vmess uuid")?;
    let params = &parts.params;

    let transport = build_transport(&StreamOptions::from_query(params), "none");
    let node = VMessNode {
        uuid,
        alter_id: params
            .get_any(&["alterId", "aid"])
            .and_then(|a| a.parse::<u16>().ok())
            .unwrap_or(0),
        security: params
            .get_any(&["encryption", "scy"])
            .and_then(non_empty)
            .unwrap_or_else(|| "auto".to_string()),
    };

    Ok(Proxy {
        raw_uri: vmess.to_string(),
        remark: parts.remark,
        hostname: parts.host,
        port: parts.port,
        node: ProxyNode::VMess(node),
        transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Network, ProxyType};
    use crate::utils::base64::base64_encode;

    fn parse(link: &str) -> Result<Proxy> {
        crate::parser::explode(link, &ParseSettings::default())
    }

    fn vmess_node(proxy: &Proxy) -> &VMessNode {
        match &proxy.node {
            ProxyNode::VMess(node) => node,
            other => panic!("expected vmess, got {:?}", other),
        }
    }

    #[test]
    fn test_json_form_with_numeric_port() {
        let json = r#"{"v":"2","ps":"hk 01","add":"hk.example.com","port":443,"id":"b831381d-6324-4d53-ad4f-8cda48b30811","aid":"0","scy":"aes-128-gcm","net":"ws","type":"none","host":"cdn.example.com","path":"/ws?ed=2048","tls":"tls","sni":"hk.example.com","alpn":"h2,http/1.1"}"#;
        let proxy = parse(&format!("vmess://{}", base64_encode(json))).unwrap();

        assert_eq!(proxy.proxy_type(), ProxyType::VMess);
        assert_eq!(proxy.address(), "hk.example.com");
        assert_eq!(proxy.port(), 443);
        assert_eq!(proxy.remark, "hk 01");
        let node = vmess_node(&proxy);
        assert_eq!(node.security, "aes-128-gcm");
        assert_eq!(node.alter_id, 0);

        assert_eq!(proxy.transport.network, Network::Ws);
        let ws = proxy.transport.ws.as_ref().unwrap();
        assert_eq!(ws.path, "/ws");
        assert_eq!(ws.max_early_data, 2048);
        let tls = proxy.transport.security.tls().unwrap();
        assert_eq!(tls.alpn, vec!["h2", "http/1.1"]);
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"add":"1.2.3.4","port":"8080","id":"u"}"#;
        let proxy = parse(&format!("vmess://{}#fallback", base64_encode(json))).unwrap();
        assert_eq!(proxy.transport.network, Network::Tcp);
        assert!(proxy.transport.security.is_none());
        assert_eq!(vmess_node(&proxy).security, "auto");
        assert_eq!(proxy.remark, "fallback");
    }

    #[test]
    fn test_json_remark_with_brace() {
        let json = r#"{"add":"h.com","port":"443","id":"u"}"#;
        let proxy = parse(&format!("vmess://{}#a}}b%7D", base64_encode(json))).unwrap();
        assert_eq!(proxy.address(), "h.com");
        assert_eq!(proxy.remark, "a}b}");

        assert!(matches!(
            parse("vmess://{\"add\":\"h.com\""),
            Err(ParseError::MalformedUri(_))
        ));
    }

    #[test]
    fn test_json_grpc_uses_path_as_service_name() {
        let json = r#"{"add":"h.com","port":"443","id":"u","net":"grpc","path":"svc","type":"multi","tls":"tls"}"#;
        let proxy = parse(&format!("vmess://{}", base64_encode(json))).unwrap();
        let grpc = proxy.transport.grpc.as_ref().unwrap();
        assert_eq!(grpc.service_name.as_deref(), Some("svc"));
        assert!(grpc.multi_mode);
    }

    #[test]
    fn test_aead_url_form() {
        let proxy = parse(
            "vmess://b831381d-6324-4d53-ad4f-8cda48b30811@h.com:443?type=grpc&serviceName=gun&security=tls&encryption=chacha20-poly1305#aead",
        )
        .unwrap();
        assert_eq!(vmess_node(&proxy).security, "chacha20-poly1305");
        assert_eq!(proxy.transport.network, Network::Grpc);
        assert_eq!(proxy.remark, "aead");
    }

    #[test]
    fn test_bad_json_and_missing_fields() {
        assert!(matches!(
            parse(&format!("vmess://{}", base64_encode("{\"add\":"))),
            Err(ParseError::MalformedUri(_))
        ));
        let json = r#"{"add":"","port":"443","id":"u"}"#;
        assert!(parse(&format!("vmess://{}", base64_encode(json))).is_err());
        let json = r#"{"add":"h.com","port":"0","id":"u"}"#;
        assert!(parse(&format!("vmess://{}", base64_encode(json))).is_err());
    }
}
