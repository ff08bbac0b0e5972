use super::common::{require, LinkParts};
use super::stream::{build_transport, StreamOptions};
use crate::error::{ParseError, Result};
use crate::models::{Proxy, ProxyNode, TrojanNode, SCHEME_TROJAN};
use crate::parser::ParseSettings;
use crate::utils::string::is_truthy;

/// Parse a Trojan link into a Proxy object
///
/// Security defaults to TLS. The legacy `ws=1&wspath=/path` flags select
/// WebSocket when no `type` is given.
pub fn explode_trojan(trojan: &str, _settings: &ParseSettings) -> Result<Proxy> {
    if !trojan.starts_with(SCHEME_TROJAN) {
        return Err(ParseError::malformed(format!("not a trojan link: {}", trojan)));
    }

    let parts = LinkParts::parse(trojan)?;
    let password = require(&parts.userinfo(), "trojan password")?;
    let params = &parts.params;

    let mut options = StreamOptions::from_query(params);
    if options.network.is_none() && params.get("ws").map_or(false, is_truthy) {
        options.network = Some("ws");
        options.path = params.get_any(&["wspath"]).or(options.path);
    }
    let transport = build_transport(&options, "tls");

    Ok(Proxy {
        raw_uri: trojan.to_string(),
        remark: parts.remark,
        hostname: parts.host,
        port: parts.port,
        node: ProxyNode::Trojan(TrojanNode { password }),
        transport,
    })
}
