use super::common::{require, QueryParams};
use crate::error::{ParseError, Result};
use crate::models::{Proxy, ProxyNode, ShadowsocksRNode, TransportDescriptor, SCHEME_SSR};
use crate::parser::ParseSettings;
use crate::utils::base64::{decode_base64_lenient, url_safe_base64_decode};
use crate::utils::string::non_empty;
use crate::utils::url::parse_host_port;

/// Parse a ShadowsocksR link into a Proxy object
///
/// Expects the decoded form
/// `ssr://server:port:protocol:method:obfs:base64(password)/?obfsparam=...`
/// where every parameter value is URL-safe Base64.
pub fn explode_ssr(ssr: &str, _settings: &ParseSettings) -> Result<Proxy> {
    let body = ssr
        .strip_prefix(SCHEME_SSR)
        .ok_or_else(|| ParseError::malformed(format!("not a ssr link: {}", ssr)))?;

    let (main, query) = match body.split_once("/?").or_else(|| body.split_once('?')) {
        Some((main, query)) => (main, query),
        None => (body.trim_end_matches('/'), ""),
    };

    // The server may be an IPv6 address, so split from the right
    let fields: Vec<&str> = main.rsplitn(6, ':').collect();
    if fields.len() < 6 {
        return Err(ParseError::malformed(format!("incomplete ssr link: {}", ssr)));
    }
    let (password_encoded, obfs, method, protocol, port, server) =
        (fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]);

    let (hostname, port) = parse_host_port(&format!("{}:{}", server, port))
        .ok_or_else(|| ParseError::malformed(format!("invalid ssr server: {}", ssr)))?;
    let password = decode_base64_lenient(password_encoded)
        .map_err(|_| ParseError::malformed("invalid ssr password"))?;

    let params = QueryParams::parse(query);
    let param = |key: &str| {
        params
            .get(key)
            .map(url_safe_base64_decode)
            .and_then(|value| non_empty(&value))
    };

    let node = ShadowsocksRNode {
        method: require(method, "ssr method")?.to_ascii_lowercase(),
        password,
        protocol: require(protocol, "ssr protocol")?,
        protocol_param: param("protoparam"),
        obfs: require(obfs, "ssr obfs")?,
        obfs_param: param("obfsparam"),
    };

    Ok(Proxy {
        raw_uri: ssr.to_string(),
        remark: param("remarks").unwrap_or_default(),
        hostname,
        port,
        node: ProxyNode::ShadowsocksR(node),
        transport: TransportDescriptor::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::base64::url_safe_base64_encode;

    fn ssr_link(server: &str, params: &str) -> String {
        let body = format!(
            "{}:8388:auth_aes128_md5:aes-256-cfb:tls1.2_ticket_auth:{}/?{}",
            server,
            url_safe_base64_encode("p@ss"),
            params
        );
        format!("ssr://{}", url_safe_base64_encode(&body))
    }

    #[test]
    fn test_full_link() {
        let params = format!(
            "obfsparam={}&protoparam={}&remarks={}&group={}",
            url_safe_base64_encode("cdn.example.com"),
            url_safe_base64_encode("32:abc"),
            url_safe_base64_encode("香港 01"),
            url_safe_base64_encode("provider")
        );
        let proxy = crate::parser::explode(&ssr_link("1.2.3.4", &params), &ParseSettings::default())
            .unwrap();

        assert_eq!(proxy.address(), "1.2.3.4");
        assert_eq!(proxy.port(), 8388);
        assert_eq!(proxy.remark, "香港 01");
        match &proxy.node {
            ProxyNode::ShadowsocksR(node) => {
                assert_eq!(node.password, "p@ss");
                assert_eq!(node.method, "aes-256-cfb");
                assert_eq!(node.protocol, "auth_aes128_md5");
                assert_eq!(node.protocol_param.as_deref(), Some("32:abc"));
                assert_eq!(node.obfs, "tls1.2_ticket_auth");
                assert_eq!(node.obfs_param.as_deref(), Some("cdn.example.com"));
            }
            other => panic!("expected ssr, got {:?}", other),
        }
    }

    #[test]
    fn test_ipv6_server_without_params() {
        let proxy =
            crate::parser::explode(&ssr_link("2001:db8::1", ""), &ParseSettings::default()).unwrap();
        assert_eq!(proxy.address(), "2001:db8::1");
        assert!(proxy.remark.is_empty());
    }

    #[test]
    fn test_garbage() {
        assert!(matches!(
            crate::parser::explode("ssr://bm90LWVub3VnaA", &ParseSettings::default()),
            Err(ParseError::MalformedUri(_))
        ));
    }
}
