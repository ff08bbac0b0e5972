use uri_outbound::parser::normalize::{
    has_userinfo_separator, looks_like_base64, looks_like_semicolon_query, looks_like_uuid,
    rewrite_semicolon_query,
};
use uri_outbound::parser::Scheme;
use uri_outbound::utils::base64::base64_encode;
use uri_outbound::{normalize, ProxyType};

#[cfg(test)]
mod normalize_tests {
    use super::*;

    #[test]
    fn test_normalize_is_idempotent() {
        let links = [
            "hysteria2://auth@h.com:443?obfs=salamander;obfs-password=pw;sni=h.com#hy",
            "hy2://auth@h.com:443?sni=h.com&insecure=1",
            "vless://u@h.com:443?type=ws\\u0026path=%2Fws#v",
            "trojan://pw@h.com:443?sni=a.com;allowInsecure=1",
            "ss://YWVzLTEyOC1nY206dGVzdA@h.com:80?plugin=obfs-local%3Bobfs%3Dhttp#n",
            "wireguard://priv@h.com:51820?publickey=pub;mtu=1280",
        ];
        for link in links {
            let once = normalize(link);
            let twice = normalize(&once.uri);
            assert_eq!(once, twice, "link {}", link);
        }
    }

    #[test]
    fn test_semicolon_rewrite_only_without_ampersand() {
        assert_eq!(
            rewrite_semicolon_query("hysteria2://a@h:443?sni=x.com;insecure=1"),
            "hysteria2://a@h:443?sni=x.com&insecure=1"
        );
        let mixed = "hysteria2://a@h:443?obfs-password=a;b&sni=x.com";
        assert_eq!(rewrite_semicolon_query(mixed), mixed);
        assert!(looks_like_semicolon_query("a=1;b=2"));
        assert!(!looks_like_semicolon_query("a=1;b=2&c=3"));
    }

    #[test]
    fn test_named_predicates() {
        assert!(looks_like_base64("YWVzLTEyOC1nY206dGVzdA"));
        assert!(looks_like_base64("YWVz+/=="));
        assert!(!looks_like_base64("aes-128-gcm:test"));
        assert!(looks_like_uuid("b831381d-6324-4d53-ad4f-8cda48b30811"));
        assert!(!looks_like_uuid("YWVzLTEyOC1nY206dGVzdA"));
        assert!(has_userinfo_separator("x@[2001:db8::1]:443"));
        assert!(!has_userinfo_separator("YWVzLTEyOC1nY206dGVzdA"));
    }

    #[test]
    fn test_scheme_detection() {
        assert_eq!(
            normalize("HY2://a@h.com:443").scheme,
            Scheme::Known(ProxyType::Hysteria2)
        );
        assert_eq!(normalize("wg://k@h.com:1").uri, "wireguard://k@h.com:1");
        assert_eq!(
            normalize("tuic://a@h.com:443").scheme,
            Scheme::Unknown("tuic".to_string())
        );
    }

    #[test]
    fn test_vmess_payload_with_whitespace() {
        let json = r#"{"add":"h.com","port":"443","id":"u"}"#;
        let encoded = base64_encode(json);
        let (head, tail) = encoded.split_at(10);
        let normalized = normalize(&format!("vmess://{}\n{}", head, tail));
        assert_eq!(normalized.uri, format!("vmess://{}", json));
    }
}
