//! Scheme detection and encoding repair for share links.
//!
//! Every heuristic that guesses at an encoding lives here as a named
//! predicate. The parsers only ever see the canonical form produced by
//! [`normalize`]:
//!
//! | Scheme | Repairs |
//! |---|---|
//! | `vmess` | Base64 payload decoded to JSON, AEAD URL form kept as is |
//! | `vless`, `trojan`, `hysteria2` | `&` repair, semicolon query rewrite |
//! | `ss` | `&` repair, percent decoding, Base64 user-info or legacy body decoded, re-assembled, semicolon query rewrite up to `plugin=` |
//! | `ssr` | Base64 payload decoded |
//! | `wireguard` | `&` repair, percent decoding, semicolon query rewrite |
//!
//! Normalization never fails. Shapes it does not recognize are returned
//! unchanged and rejected later by the parser.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::models::ProxyType;
use crate::utils::base64::decode_base64_lenient;
use crate::utils::url::{split_fragment, split_query, url_decode, url_encode};

/// Literal escape some subscription generators leave in place of `&`.
const ESCAPED_AMPERSAND: &str = "\\u0026";

lazy_static! {
    /// `@host:port` followed by the end of the authority. The first match is
    /// the real separator, so `@`, `#` and `&` inside passwords and `@`
    /// inside queries are left alone.
    static ref HOST_SEPARATOR: Regex =
        Regex::new(r"@(\[[0-9A-Fa-f:.]+\]|[^@/?#:\s\[\]]+):(\d{1,5})(?:[/?#]|$)").unwrap();
}

/// Scheme of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    Known(ProxyType),
    /// Text before `://`, empty when the link has no scheme at all
    Unknown(String),
}

impl Scheme {
    pub fn proxy_type(&self) -> Option<ProxyType> {
        match self {
            Scheme::Known(proxy_type) => Some(*proxy_type),
            Scheme::Unknown(_) => None,
        }
    }

    /// Scheme name without `://`.
    pub fn name(&self) -> &str {
        match self {
            Scheme::Known(proxy_type) => proxy_type.scheme_name(),
            Scheme::Unknown(name) => name,
        }
    }
}

/// A link in canonical form, ready for its protocol parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUri {
    pub scheme: Scheme,
    /// Canonical link. Known schemes always carry their canonical prefix,
    /// so `hy2://` comes out as `hysteria2://`.
    pub uri: String,
}

/// Returns true when `s` only uses Base64 characters of either alphabet
/// with at most two trailing `=`.
pub fn looks_like_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    !body.is_empty()
        && s.len() - body.len() <= 2
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_'))
}

/// Returns true when a query uses `;` as pair delimiter. Any `&` disables
/// the rewrite, even for mixed-delimiter queries.
pub fn looks_like_semicolon_query(query: &str) -> bool {
    query.contains(';') && !query.contains('&')
}

/// Returns true for UUIDs, which must never be taken for Base64.
pub fn looks_like_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s.trim()).is_ok()
}

/// Returns true when the link body has an `@host:port` separator.
pub fn has_userinfo_separator(body: &str) -> bool {
    HOST_SEPARATOR.is_match(body)
}

/// Replaces every `;` of a semicolon-delimited query with `&`.
///
/// The query is the text after the first `?` up to the first `#`. Queries
/// already using `&` are returned untouched, so the rewrite is idempotent.
pub fn rewrite_semicolon_query(uri: &str) -> String {
    rewrite_query_with(uri, |query| query.replace(';', "&"))
}

/// Semicolon rewrite for Shadowsocks links.
///
/// A SIP003 `plugin=name;key=value;flag` value is itself `;`-delimited, so
/// only the pairs in front of `plugin=` are rewritten and the plugin value
/// runs to the end of the query.
pub fn rewrite_ss_semicolon_query(uri: &str) -> String {
    rewrite_query_with(uri, |query| {
        let plugin_at = if query.starts_with("plugin=") {
            Some(0)
        } else {
            query.find(";plugin=").map(|at| at + 1)
        };
        match plugin_at {
            Some(at) => format!("{}{}", query[..at].replace(';', "&"), &query[at..]),
            None => query.replace(';', "&"),
        }
    })
}

fn rewrite_query_with(uri: &str, rewrite: impl Fn(&str) -> String) -> String {
    let (head, fragment) = split_fragment(uri);
    let (base, query) = match split_query(head) {
        (base, Some(query)) if looks_like_semicolon_query(query) => (base, query),
        _ => return uri.to_string(),
    };

    let mut result = format!("{}?{}", base, rewrite(query));
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

/// Brings a raw share link into canonical form.
pub fn normalize(raw: &str) -> NormalizedUri {
    let raw = raw.trim();
    let (scheme_name, body) = match raw.split_once("://") {
        Some(parts) => parts,
        None => {
            return NormalizedUri {
                scheme: Scheme::Unknown(String::new()),
                uri: raw.to_string(),
            }
        }
    };

    let proxy_type = match ProxyType::from_scheme(scheme_name) {
        Some(proxy_type) => proxy_type,
        None => {
            debug!("Unknown scheme '{}', passing link through", scheme_name);
            return NormalizedUri {
                scheme: Scheme::Unknown(scheme_name.to_ascii_lowercase()),
                uri: raw.to_string(),
            };
        }
    };

    let body = match proxy_type {
        ProxyType::VMess => normalize_vmess(body),
        ProxyType::Vless | ProxyType::Trojan | ProxyType::Hysteria2 => {
            rewrite_semicolon_query(&repair_ampersands(body))
        }
        ProxyType::Shadowsocks => {
            let body = decode_once(&repair_ampersands(body));
            let body = normalize_ss(&body).unwrap_or(body);
            rewrite_ss_semicolon_query(&body)
        }
        ProxyType::ShadowsocksR => normalize_ssr(body),
        ProxyType::WireGuard => rewrite_semicolon_query(&decode_once(&repair_ampersands(body))),
    };

    let uri = format!("{}{}", proxy_type.scheme(), body);
    trace!("Normalized {} link to {}", proxy_type, uri);
    NormalizedUri {
        scheme: Scheme::Known(proxy_type),
        uri,
    }
}

fn repair_ampersands(s: &str) -> String {
    s.replace(ESCAPED_AMPERSAND, "&")
}

/// Percent-decodes once, leaving `+` alone.
fn decode_once(s: &str) -> String {
    url_decode(s)
}

/// Decodes a Base64 VMess payload. The AEAD URL form is not Base64 and
/// comes back untouched.
fn normalize_vmess(body: &str) -> String {
    let (payload, fragment) = split_fragment(body);
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if !looks_like_base64(&payload) {
        return body.to_string();
    }

    match decode_base64_lenient(&payload) {
        Ok(decoded) => match fragment {
            Some(fragment) if !fragment.is_empty() => format!("{}#{}", decoded.trim(), fragment),
            _ => decoded.trim().to_string(),
        },
        Err(e) => {
            debug!("VMess payload kept as plain text: {}", e);
            body.to_string()
        }
    }
}

fn normalize_ssr(body: &str) -> String {
    let (payload, _) = split_fragment(body);
    let payload = payload.trim().trim_end_matches('/');
    match decode_base64_lenient(payload) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(e) => {
            debug!("SSR payload kept as plain text: {}", e);
            body.to_string()
        }
    }
}

/// Re-assembles a Shadowsocks body as
/// `method:<pct-encoded password>@host:port[?query][#pct-encoded remark]`.
///
/// Returns `None` when the body has no recognizable credentials.
fn normalize_ss(body: &str) -> Option<String> {
    if let Some(caps) = HOST_SEPARATOR.captures(body) {
        let separator = caps.get(0)?;
        let port = caps.get(2)?;
        let (method, password) = split_ss_userinfo(&body[..separator.start()])?;
        return Some(assemble_ss(
            &method,
            &password,
            caps.get(1)?.as_str(),
            port.as_str(),
            &body[port.end()..],
        ));
    }

    // Legacy form: base64(method:password@host:port)[?query][#remark]
    let (head, fragment) = split_fragment(body);
    let (payload, query) = split_query(head);
    let decoded = match decode_base64_lenient(payload.trim_end_matches('/')) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Shadowsocks body is neither SIP002 nor legacy: {}", e);
            return None;
        }
    };
    let (userinfo, host_port) = decoded.trim().rsplit_once('@')?;
    let (method, password) = userinfo.split_once(':')?;
    let (host, port) = host_port.trim_end_matches('/').rsplit_once(':')?;

    let mut rest = String::new();
    if let Some(query) = query {
        rest.push('?');
        rest.push_str(query);
    }
    if let Some(fragment) = fragment {
        rest.push('#');
        rest.push_str(fragment);
    }
    Some(assemble_ss(method, password, host, port, &rest))
}

/// Splits `method:password`, decoding Base64 user-info first.
fn split_ss_userinfo(userinfo: &str) -> Option<(String, String)> {
    if let Some((method, password)) = userinfo.split_once(':') {
        return Some((method.to_string(), password.to_string()));
    }
    if !looks_like_base64(userinfo) || looks_like_uuid(userinfo) {
        return None;
    }
    let decoded = decode_base64_lenient(userinfo).ok()?;
    let (method, password) = decoded.split_once(':')?;
    Some((method.to_string(), password.to_string()))
}

fn assemble_ss(method: &str, password: &str, host: &str, port: &str, rest: &str) -> String {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    let mut result = format!("{}:{}@{}:{}", method, url_encode(password), host, port);

    let rest = rest.trim_start_matches('/');
    let (head, fragment) = split_fragment(rest);
    if let Some(query) = head.strip_prefix('?').filter(|q| !q.is_empty()) {
        result.push('?');
        result.push_str(query);
    }
    if let Some(remark) = fragment.filter(|r| !r.is_empty()) {
        result.push('#');
        result.push_str(&url_encode(remark));
    }
    result
}
