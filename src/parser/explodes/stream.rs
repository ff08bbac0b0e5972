//! Transport descriptor construction from link parameters.

use log::debug;

use super::common::QueryParams;
use crate::models::transport::{split_early_data, EARLY_DATA_HEADER_NAME};
use crate::models::{
    GrpcSettings, HttpSettings, Network, RealitySettings, Security, TcpHeaderType, TcpSettings,
    TlsSettings, TransportDescriptor, WsSettings,
};
use crate::utils::string::{non_empty, split_list};

/// Raw stream-related values of a link, before interpretation.
///
/// URL-style links fill it from their query with [`StreamOptions::from_query`];
/// the VMess JSON form fills it field by field.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions<'a> {
    pub network: Option<&'a str>,
    pub security: Option<&'a str>,
    pub sni: Option<&'a str>,
    pub host: Option<&'a str>,
    pub path: Option<&'a str>,
    pub service_name: Option<&'a str>,
    pub mode: Option<&'a str>,
    pub header_type: Option<&'a str>,
    pub public_key: Option<&'a str>,
    pub short_id: Option<&'a str>,
    pub spider_x: Option<&'a str>,
    pub fingerprint: Option<&'a str>,
    pub alpn: Option<&'a str>,
    pub allow_insecure: bool,
}

impl<'a> StreamOptions<'a> {
    pub fn from_query(params: &'a QueryParams) -> Self {
        StreamOptions {
            network: params.get_any(&["type", "network"]),
            security: params.get_any(&["security"]),
            sni: params.get_any(&["sni", "peer"]),
            host: params.get_any(&["host"]),
            path: params.get_any(&["path"]),
            service_name: params.get_any(&["serviceName", "service_name"]),
            mode: params.get_any(&["mode"]),
            header_type: params.get_any(&["headerType"]),
            public_key: params.get_any(&["pbk", "publicKey"]),
            short_id: params.get_any(&["sid", "shortId"]),
            spider_x: params.get_any(&["spx", "spiderX"]),
            fingerprint: params.get_any(&["fp", "fingerprint"]),
            alpn: params.get_any(&["alpn"]),
            allow_insecure: params.flag_any(&["allowInsecure", "insecure", "allow_insecure"]),
        }
    }
}

fn opt(value: Option<&str>) -> Option<String> {
    value.and_then(non_empty)
}

/// Builds the security layer. Unknown values fall back to `default_security`.
pub fn build_security(options: &StreamOptions, default_security: &str) -> Security {
    let mut security = options
        .security
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| default_security.to_string());
    if !matches!(security.as_str(), "tls" | "xtls" | "reality" | "none" | "") {
        debug!("Unknown security '{}', using '{}'", security, default_security);
        security = default_security.to_string();
    }

    match security.as_str() {
        "tls" | "xtls" => Security::Tls(TlsSettings {
            server_name: opt(options.sni),
            allow_insecure: options.allow_insecure,
            alpn: options.alpn.map(split_list).unwrap_or_default(),
            fingerprint: opt(options.fingerprint),
        }),
        "reality" => Security::Reality(RealitySettings {
            server_name: opt(options.sni),
            public_key: options.public_key.unwrap_or_default().trim().to_string(),
            short_id: options.short_id.unwrap_or_default().trim().to_string(),
            spider_x: opt(options.spider_x),
            fingerprint: opt(options.fingerprint),
        }),
        _ => Security::None,
    }
}

/// Builds a full transport descriptor.
///
/// `default_security` applies when the link carries no `security` value,
/// `tls` for Trojan and `none` elsewhere.
pub fn build_transport(options: &StreamOptions, default_security: &str) -> TransportDescriptor {
    let network = match options.network {
        Some(value) => Network::from_link_value(value).unwrap_or_else(|| {
            debug!("Unknown network '{}', falling back to tcp", value);
            Network::Tcp
        }),
        None => Network::Tcp,
    };

    let mut transport = TransportDescriptor {
        network,
        security: build_security(options, default_security),
        ..Default::default()
    };

    match network {
        Network::Ws => {
            let (path, max_early_data) = split_early_data(options.path.unwrap_or("/"));
            transport.ws = Some(WsSettings {
                path,
                host: opt(options.host),
                max_early_data,
                early_data_header_name: (max_early_data > 0)
                    .then(|| EARLY_DATA_HEADER_NAME.to_string()),
            });
        }
        Network::Grpc => {
            transport.grpc = Some(GrpcSettings {
                service_name: opt(options.service_name).or_else(|| opt(options.path)),
                multi_mode: options
                    .mode
                    .map_or(false, |mode| mode.eq_ignore_ascii_case("multi")),
            });
        }
        Network::Http => {
            transport.http = Some(HttpSettings {
                host: opt(options.host),
                path: opt(options.path),
            });
        }
        Network::Tcp => {
            if options
                .header_type
                .map_or(false, |t| t.eq_ignore_ascii_case("http"))
            {
                transport.tcp = Some(TcpSettings {
                    header_type: TcpHeaderType::Http,
                    host: opt(options.host),
                    path: opt(options.path),
                });
            }
        }
        Network::Quic | Network::Udp => {}
    }

    transport
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_for(query: &str, default_security: &str) -> TransportDescriptor {
        let params = QueryParams::parse(query);
        build_transport(&StreamOptions::from_query(&params), default_security)
    }

    #[test]
    fn test_defaults_to_plain_tcp() {
        let transport = transport_for("", "none");
        assert_eq!(transport.network, Network::Tcp);
        assert_eq!(transport.security, Security::None);
        assert!(transport.ws.is_none() && transport.tcp.is_none());
    }

    #[test]
    fn test_ws_with_early_data_and_tls() {
        let transport = transport_for(
            "type=ws&security=tls&sni=a.com&host=cdn.a.com&path=%2Fws%3Fed%3D2048&alpn=h2,http/1.1&fp=chrome",
            "none",
        );
        let ws = transport.ws.unwrap();
        assert_eq!(ws.path, "/ws");
        assert_eq!(ws.max_early_data, 2048);
        assert_eq!(ws.early_data_header_name.as_deref(), Some(EARLY_DATA_HEADER_NAME));
        assert_eq!(ws.host.as_deref(), Some("cdn.a.com"));

        let tls = transport.security.tls().unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("a.com"));
        assert_eq!(tls.alpn, vec!["h2", "http/1.1"]);
        assert_eq!(tls.fingerprint.as_deref(), Some("chrome"));
    }

    #[test]
    fn test_reality_excludes_tls() {
        let transport = transport_for(
            "security=reality&sni=www.apple.com&pbk=PUBKEY&sid=ab12&spx=%2F&fp=chrome&alpn=h2",
            "none",
        );
        assert!(transport.security.tls().is_none());
        let reality = transport.security.reality().unwrap();
        assert_eq!(reality.public_key, "PUBKEY");
        assert_eq!(reality.short_id, "ab12");
        assert_eq!(reality.spider_x.as_deref(), Some("/"));
    }

    #[test]
    fn test_grpc_and_tcp_http_header() {
        let grpc = transport_for("type=grpc&serviceName=svc&mode=multi", "none");
        assert_eq!(
            grpc.grpc,
            Some(GrpcSettings {
                service_name: Some("svc".to_string()),
                multi_mode: true
            })
        );

        let grpc = transport_for("type=grpc", "none");
        assert_eq!(grpc.grpc.unwrap().service_name, None);

        let tcp = transport_for("headerType=http&host=a.com&path=%2Findex", "none");
        assert!(tcp.has_http_header());
        assert_eq!(tcp.tcp.unwrap().path.as_deref(), Some("/index"));
    }

    #[test]
    fn test_default_security_and_unknown_network() {
        let transport = transport_for("type=kcp", "tls");
        assert_eq!(transport.network, Network::Tcp);
        assert!(transport.security.tls().is_some());

        let transport = transport_for("security=none", "tls");
        assert!(transport.security.is_none());
    }
}
