use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;

use super::common::{require, QueryParams};
use crate::error::{ParseError, Result};
use crate::models::{
    Network, Proxy, ProxyNode, TransportDescriptor, WireGuardNode, SCHEME_WIREGUARD,
};
use crate::parser::ParseSettings;
use crate::utils::base64::pad_base64;
use crate::utils::string::{non_empty, split_list};
use crate::utils::url::{parse_host_port, split_fragment, split_query, url_decode};

pub const DEFAULT_LOCAL_ADDRESS: &str = "172.16.0.2/32";
pub const DEFAULT_MTU: u16 = 1420;

/// Adds a host prefix length to bare interface addresses.
fn with_prefix(address: &str) -> String {
    if address.contains('/') {
        address.to_string()
    } else if address.contains(':') {
        format!("{}/128", address)
    } else {
        format!("{}/32", address)
    }
}

/// `reserved` is either a list of bytes or a Base64 string of three bytes.
fn parse_reserved(value: &str) -> Vec<u8> {
    if value.contains(',') || value.trim().parse::<u8>().is_ok() {
        return value
            .split(',')
            .filter_map(|b| b.trim().parse::<u8>().ok())
            .collect();
    }
    match STANDARD.decode(pad_base64(value.trim())) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Ignoring unreadable wireguard reserved '{}': {}", value, e);
            Vec::new()
        }
    }
}

/// Parse a WireGuard link into a Proxy object
///
/// The private key is the user-info or a `privateKey` parameter. Keys are
/// Base64 and may contain `/`, so the link is split by hand instead of
/// going through a URL parser.
pub fn explode_wireguard(wireguard: &str, _settings: &ParseSettings) -> Result<Proxy> {
    let body = wireguard.strip_prefix(SCHEME_WIREGUARD).ok_or_else(|| {
        ParseError::malformed(format!("not a wireguard link: {}", wireguard))
    })?;

    let (head, fragment) = split_fragment(body);
    let (authority, query) = split_query(head);
    let params = QueryParams::parse(query.unwrap_or(""));

    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => (url_decode(userinfo), host_port),
        None => (String::new(), authority),
    };
    let (hostname, port) = parse_host_port(host_port).ok_or_else(|| {
        ParseError::malformed(format!("invalid wireguard endpoint: {}", wireguard))
    })?;

    let private_key = non_empty(&userinfo)
        .or_else(|| {
            params
                .get_any(&["privateKey", "privatekey", "secretKey"])
                .and_then(non_empty)
        })
        .unwrap_or_default();
    let private_key = require(&private_key, "wireguard private key")?;
    let public_key = require(
        params
            .get_any(&["publickey", "publicKey", "peer_public_key"])
            .unwrap_or_default(),
        "wireguard public key",
    )?;

    let local_address: Vec<String> = params
        .get_any(&["address", "ip", "selfIP", "local_address"])
        .map(split_list)
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_LOCAL_ADDRESS.to_string()])
        .iter()
        .map(|address| with_prefix(address))
        .collect();

    let node = WireGuardNode {
        private_key,
        public_key,
        pre_shared_key: params
            .get_any(&["presharedkey", "presharedKey", "preSharedKey", "psk"])
            .and_then(non_empty),
        local_address,
        mtu: params
            .get_any(&["mtu"])
            .and_then(|m| m.trim().parse::<u16>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MTU),
        reserved: params
            .get_any(&["reserved"])
            .map(parse_reserved)
            .unwrap_or_default(),
    };

    Ok(Proxy {
        raw_uri: wireguard.to_string(),
        remark: fragment.map(url_decode).unwrap_or_default(),
        hostname,
        port,
        node: ProxyNode::WireGuard(node),
        transport: TransportDescriptor {
            network: Network::Udp,
            ..Default::default()
        },
    })
}
