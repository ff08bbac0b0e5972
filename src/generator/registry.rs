use std::collections::HashMap;

use log::{debug, warn};
use once_cell::sync::OnceCell;

use crate::error::{ParseError, Result};
use crate::generator::formats::{synth_for, try_synthesize, SynthFn};
use crate::models::{Proxy, ProxyType, Target};
use crate::parser::explodes::common::{parser_for, ParseFn};
use crate::parser::normalize::{normalize, Scheme};
use crate::parser::ParseSettings;
use crate::settings::Settings;

/// Protocols Xray can express. sing-box takes every protocol.
const XRAY_PROTOCOLS: &[ProxyType] = &[
    ProxyType::VMess,
    ProxyType::Vless,
    ProxyType::Trojan,
    ProxyType::Shadowsocks,
    ProxyType::Hysteria2,
];

/// One parsed link bound to a target runtime.
///
/// The rendered JSON is computed on first use and cached.
#[derive(Debug)]
pub struct Outbound {
    proxy: Proxy,
    target: Target,
    tag: String,
    synth: SynthFn,
    rendered: OnceCell<String>,
}

impl Outbound {
    pub fn addr(&self) -> &str {
        self.proxy.address()
    }

    pub fn port(&self) -> u16 {
        self.proxy.port()
    }

    pub fn scheme(&self) -> ProxyType {
        self.proxy.proxy_type()
    }

    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Compact outbound JSON, empty when nothing usable can be rendered.
    pub fn get_outbound_str(&self) -> &str {
        self.rendered.get_or_init(|| {
            if !self.proxy.has_usable_address() {
                return String::new();
            }
            match (self.synth)(&self.proxy, &self.tag) {
                Ok(value) => value.to_string(),
                Err(e) => {
                    debug!("Rendering {} outbound failed: {}", self.target, e);
                    String::new()
                }
            }
        })
    }
}

/// Registry of (protocol, target) pairs that can be turned into outbounds
pub struct OutboundRegistry {
    entries: HashMap<(ProxyType, Target), (ParseFn, SynthFn)>,
    parse_settings: ParseSettings,
    tag: String,
    tag_from_remark: bool,
}

impl Default for OutboundRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl OutboundRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        let defaults = Settings::default();
        OutboundRegistry {
            entries: HashMap::new(),
            parse_settings: ParseSettings::default(),
            tag: defaults.outbound.tag,
            tag_from_remark: defaults.outbound.tag_from_remark,
        }
    }

    /// Creates a registry with every built-in protocol registered
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for proxy_type in XRAY_PROTOCOLS {
            registry.register(*proxy_type, Target::Xray);
        }
        for proxy_type in ProxyType::ALL {
            registry.register(proxy_type, Target::SingBox);
        }
        registry
    }

    /// Built-in registry configured from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::with_builtin();
        registry.parse_settings = ParseSettings::from(settings);
        registry.tag = settings.outbound.tag.clone();
        registry.tag_from_remark = settings.outbound.tag_from_remark;
        registry
    }

    /// Registers the built-in parser and renderer for a pair.
    pub fn register(&mut self, proxy_type: ProxyType, target: Target) {
        self.register_with(proxy_type, target, parser_for(proxy_type), synth_for(target));
    }

    pub fn register_with(
        &mut self,
        proxy_type: ProxyType,
        target: Target,
        parse: ParseFn,
        synth: SynthFn,
    ) {
        self.entries.insert((proxy_type, target), (parse, synth));
    }

    pub fn supports(&self, proxy_type: ProxyType, target: Target) -> bool {
        self.entries.contains_key(&(proxy_type, target))
    }

    /// Parses `raw` and binds it to `target`.
    ///
    /// Unknown schemes and protocols without a renderer for the target
    /// fail with [`ParseError::UnsupportedScheme`].
    pub fn get_outbound(&self, target: Target, raw: &str) -> Result<Outbound> {
        let raw = raw.trim();
        let normalized = normalize(raw);

        let proxy_type = match &normalized.scheme {
            Scheme::Known(proxy_type) => *proxy_type,
            Scheme::Unknown(name) if name.is_empty() => {
                return Err(ParseError::malformed(format!("missing scheme: {}", raw)))
            }
            Scheme::Unknown(name) => {
                warn!("No outbound for unknown scheme '{}'", name);
                return Err(ParseError::UnsupportedScheme {
                    scheme: name.clone(),
                    target,
                });
            }
        };

        let (parse, synth) = match self.entries.get(&(proxy_type, target)) {
            Some(entry) => *entry,
            None => {
                warn!("Scheme '{}' is not supported for {}", proxy_type.scheme_name(), target);
                return Err(ParseError::UnsupportedScheme {
                    scheme: proxy_type.scheme_name().to_string(),
                    target,
                });
            }
        };

        let mut proxy = parse(&normalized.uri, &self.parse_settings).map_err(|e| {
            debug!("Failed to parse {} link: {}", proxy_type, e);
            e
        })?;
        proxy.raw_uri = raw.to_string();

        let tag = self.tag_for(&proxy);
        Ok(Outbound {
            proxy,
            target,
            tag,
            synth,
            rendered: OnceCell::new(),
        })
    }

    /// Outbound JSON for `raw`, or an empty string on any failure.
    pub fn outbound_string(&self, target: Target, raw: &str) -> String {
        match self.get_outbound(target, raw) {
            Ok(outbound) => outbound.get_outbound_str().to_string(),
            Err(_) => String::new(),
        }
    }

    /// Renders an already parsed proxy with this registry's tag rules.
    pub fn render(&self, proxy: &Proxy, target: Target) -> Result<String> {
        if !self.supports(proxy.proxy_type(), target) {
            return Err(ParseError::UnsupportedScheme {
                scheme: proxy.proxy_type().scheme_name().to_string(),
                target,
            });
        }
        try_synthesize(proxy, target, &self.tag_for(proxy))
    }

    fn tag_for(&self, proxy: &Proxy) -> String {
        if self.tag_from_remark && !proxy.remark.trim().is_empty() {
            proxy.remark.clone()
        } else {
            self.tag.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_builtin_pairs() {
        let registry = OutboundRegistry::with_builtin();
        for proxy_type in ProxyType::ALL {
            assert!(registry.supports(proxy_type, Target::SingBox));
        }
        assert!(registry.supports(ProxyType::Hysteria2, Target::Xray));
        assert!(!registry.supports(ProxyType::WireGuard, Target::Xray));
        assert!(!registry.supports(ProxyType::ShadowsocksR, Target::Xray));
    }

    #[test]
    fn test_get_outbound_accessors() {
        let registry = OutboundRegistry::with_builtin();
        let outbound = registry
            .get_outbound(Target::SingBox, "  hy2://auth@5.6.7.8:443?sni=example.com#hk  ")
            .unwrap();
        assert_eq!(outbound.addr(), "5.6.7.8");
        assert_eq!(outbound.port(), 443);
        assert_eq!(outbound.scheme(), ProxyType::Hysteria2);
        assert_eq!(outbound.proxy().raw_uri(), "hy2://auth@5.6.7.8:443?sni=example.com#hk");
        assert_eq!(outbound.tag(), "proxy");

        let json: Value = serde_json::from_str(outbound.get_outbound_str()).unwrap();
        assert_eq!(json["type"], "hysteria2");
        // cached
        assert!(std::ptr::eq(outbound.get_outbound_str(), outbound.get_outbound_str()));
    }

    #[test]
    fn test_unsupported_combinations() {
        let registry = OutboundRegistry::with_builtin();
        let err = registry
            .get_outbound(Target::Xray, "wireguard://priv@h.com:51820?publickey=pub")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnsupportedScheme {
                scheme: "wireguard".to_string(),
                target: Target::Xray
            }
        );

        let err = registry
            .get_outbound(Target::SingBox, "tuic://u:p@h.com:443")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedScheme { ref scheme, .. } if scheme == "tuic"));

        assert!(matches!(
            registry.get_outbound(Target::Xray, "no scheme here"),
            Err(ParseError::MalformedUri(_))
        ));
    }

    #[test]
    fn test_outbound_string_is_empty_on_failure() {
        let registry = OutboundRegistry::with_builtin();
        assert_eq!(registry.outbound_string(Target::Xray, "ss://!!!notvalid"), "");
        assert_eq!(registry.outbound_string(Target::SingBox, "ss://!!!notvalid"), "");
        assert!(!registry
            .outbound_string(Target::Xray, "trojan://pw@h.com:443")
            .is_empty());
    }

    #[test]
    fn test_tag_from_remark() {
        let mut settings = Settings::default();
        settings.outbound.tag_from_remark = true;
        let registry = OutboundRegistry::from_settings(&settings);

        let outbound = registry
            .get_outbound(Target::Xray, "trojan://pw@h.com:443#JP%2001")
            .unwrap();
        assert_eq!(outbound.tag(), "JP 01");

        let outbound = registry.get_outbound(Target::Xray, "trojan://pw@h.com:443").unwrap();
        assert_eq!(outbound.tag(), "proxy");
    }
}
