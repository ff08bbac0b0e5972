//! Aggregate of parsed links, bucketed by protocol
//!
//! The aggregate is an owned object. Every mutation takes its single lock,
//! and readers get a cloned [`ResultSnapshot`], so a bucket is never seen
//! half-appended.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::ProxyType;

const UPDATE_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One successfully converted link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProxyItem {
    /// Scheme name without `://`, e.g. `vless`
    pub scheme: String,
    pub address: String,
    pub port: u16,
    pub remark: String,
    pub raw_uri: String,
    /// Rendered outbound JSON
    pub outbound: String,
}

impl ProxyItem {
    pub fn new(
        proxy_type: ProxyType,
        address: &str,
        port: u16,
        remark: &str,
        raw_uri: &str,
        outbound: &str,
    ) -> Self {
        ProxyItem {
            scheme: proxy_type.scheme_name().to_string(),
            address: address.to_string(),
            port,
            remark: remark.to_string(),
            raw_uri: raw_uri.to_string(),
            outbound: outbound.to_string(),
        }
    }

    /// Protocol of the item, taken from `scheme` or else from the raw link.
    pub fn proxy_type(&self) -> Option<ProxyType> {
        ProxyType::from_scheme(&self.scheme).or_else(|| {
            self.raw_uri
                .split_once("://")
                .and_then(|(scheme, _)| ProxyType::from_scheme(scheme))
        })
    }
}

/// Persisted state of a [`ProxyResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSnapshot {
    #[serde(rename = "Vmess")]
    pub vmess: Vec<ProxyItem>,
    #[serde(rename = "Vless")]
    pub vless: Vec<ProxyItem>,
    #[serde(rename = "Trojan")]
    pub trojan: Vec<ProxyItem>,
    #[serde(rename = "Shadowsocks")]
    pub shadowsocks: Vec<ProxyItem>,
    #[serde(rename = "ShadowsocksR")]
    pub shadowsocks_r: Vec<ProxyItem>,
    #[serde(rename = "Hysteria2")]
    pub hysteria2: Vec<ProxyItem>,
    #[serde(rename = "Wireguard")]
    pub wireguard: Vec<ProxyItem>,
    #[serde(rename = "UpdateAt")]
    pub update_at: String,
    #[serde(rename = "VmessTotal")]
    pub vmess_total: usize,
    #[serde(rename = "VlessTotal")]
    pub vless_total: usize,
    #[serde(rename = "TrojanTotal")]
    pub trojan_total: usize,
    #[serde(rename = "SSTotal")]
    pub ss_total: usize,
    #[serde(rename = "SSRTotal")]
    pub ssr_total: usize,
    #[serde(rename = "Hysteria2Total")]
    pub hysteria2_total: usize,
    #[serde(rename = "WireguardTotal")]
    pub wireguard_total: usize,
}

impl ResultSnapshot {
    fn bucket_mut(&mut self, proxy_type: ProxyType) -> (&mut Vec<ProxyItem>, &mut usize) {
        match proxy_type {
            ProxyType::VMess => (&mut self.vmess, &mut self.vmess_total),
            ProxyType::Vless => (&mut self.vless, &mut self.vless_total),
            ProxyType::Trojan => (&mut self.trojan, &mut self.trojan_total),
            ProxyType::Shadowsocks => (&mut self.shadowsocks, &mut self.ss_total),
            ProxyType::ShadowsocksR => (&mut self.shadowsocks_r, &mut self.ssr_total),
            ProxyType::Hysteria2 => (&mut self.hysteria2, &mut self.hysteria2_total),
            ProxyType::WireGuard => (&mut self.wireguard, &mut self.wireguard_total),
        }
    }

    pub fn bucket(&self, proxy_type: ProxyType) -> &[ProxyItem] {
        match proxy_type {
            ProxyType::VMess => &self.vmess,
            ProxyType::Vless => &self.vless,
            ProxyType::Trojan => &self.trojan,
            ProxyType::Shadowsocks => &self.shadowsocks,
            ProxyType::ShadowsocksR => &self.shadowsocks_r,
            ProxyType::Hysteria2 => &self.hysteria2,
            ProxyType::WireGuard => &self.wireguard,
        }
    }

    pub fn total(&self, proxy_type: ProxyType) -> usize {
        match proxy_type {
            ProxyType::VMess => self.vmess_total,
            ProxyType::Vless => self.vless_total,
            ProxyType::Trojan => self.trojan_total,
            ProxyType::Shadowsocks => self.ss_total,
            ProxyType::ShadowsocksR => self.ssr_total,
            ProxyType::Hysteria2 => self.hysteria2_total,
            ProxyType::WireGuard => self.wireguard_total,
        }
    }
}

/// Thread-safe aggregate of converted links
#[derive(Debug, Default)]
pub struct ProxyResult {
    state: Mutex<ResultSnapshot>,
}

impl ProxyResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResultSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends an item to its protocol bucket. Items of unknown protocols
    /// are dropped.
    pub fn add_item(&self, item: ProxyItem) {
        let proxy_type = match item.proxy_type() {
            Some(proxy_type) => proxy_type,
            None => {
                debug!("Dropping item with unknown scheme '{}'", item.scheme);
                return;
            }
        };

        let mut state = self.lock();
        let (bucket, total) = state.bucket_mut(proxy_type);
        bucket.push(item);
        *total += 1;
        state.update_at = chrono::Local::now().format(UPDATE_AT_FORMAT).to_string();
    }

    /// Sum of the per-protocol totals.
    pub fn len(&self) -> usize {
        let state = self.lock();
        ProxyType::ALL.iter().map(|t| state.total(*t)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item, bucket by bucket in protocol order.
    pub fn total_list(&self) -> Vec<ProxyItem> {
        let state = self.lock();
        ProxyType::ALL
            .iter()
            .flat_map(|t| state.bucket(*t).iter().cloned())
            .collect()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        let update_at = std::mem::take(&mut state.update_at);
        *state = ResultSnapshot {
            update_at,
            ..Default::default()
        };
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.lock().clone()
    }

    /// Replaces the state with the document at `path`.
    ///
    /// A missing file leaves the state alone, as does a document that does
    /// not deserialize.
    pub fn load(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No result file at {}", path.display());
                return;
            }
            Err(e) => {
                warn!("Failed to read result file {}: {}", path.display(), e);
                return;
            }
        };

        match serde_json::from_str::<ResultSnapshot>(&content) {
            Ok(snapshot) => *self.lock() = snapshot,
            Err(e) => warn!("Ignoring unreadable result file {}: {}", path.display(), e),
        }
    }

    /// Writes the state to `path` as one JSON document.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string(&self.snapshot())
            .context("Failed to serialize proxy result")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write result file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(proxy_type: ProxyType, address: &str) -> ProxyItem {
        ProxyItem::new(
            proxy_type,
            address,
            443,
            "r",
            &format!("{}{}:443", proxy_type.scheme(), address),
            "{}",
        )
    }

    #[test]
    fn test_add_item_buckets_and_counts() {
        let result = ProxyResult::new();
        result.add_item(item(ProxyType::Trojan, "a"));
        result.add_item(item(ProxyType::VMess, "b"));
        result.add_item(item(ProxyType::Trojan, "c"));
        result.add_item(item(ProxyType::WireGuard, "d"));

        assert_eq!(result.len(), 4);
        let snapshot = result.snapshot();
        assert_eq!(snapshot.trojan_total, 2);
        assert_eq!(snapshot.vmess_total, 1);
        assert_eq!(snapshot.wireguard.len(), 1);
        assert!(!snapshot.update_at.is_empty());

        let order: Vec<_> = result.total_list().into_iter().map(|i| i.address).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_unknown_scheme_is_dropped() {
        let result = ProxyResult::new();
        result.add_item(ProxyItem {
            scheme: "tuic".to_string(),
            raw_uri: "tuic://x".to_string(),
            ..Default::default()
        });
        assert!(result.is_empty());
    }

    #[test]
    fn test_clear() {
        let result = ProxyResult::new();
        result.add_item(item(ProxyType::Shadowsocks, "a"));
        result.clear();
        assert_eq!(result.len(), 0);
        assert!(result.total_list().is_empty());
        assert_eq!(result.snapshot().ss_total, 0);
    }

    #[test]
    fn test_field_names() {
        let result = ProxyResult::new();
        result.add_item(item(ProxyType::ShadowsocksR, "a"));
        let json = serde_json::to_value(result.snapshot()).unwrap();
        assert_eq!(json["SSRTotal"], 1);
        assert_eq!(json["ShadowsocksR"][0]["Address"], "a");
        assert_eq!(json["ShadowsocksR"][0]["Scheme"], "ssr");
        for key in ["Vmess", "Wireguard", "UpdateAt", "WireguardTotal", "Hysteria2Total"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
