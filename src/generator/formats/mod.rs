pub mod singbox;
pub mod xray;

use log::debug;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Proxy, Target};

pub use singbox::proxy_to_singbox;
pub use xray::proxy_to_xray;

/// Signature shared by the per-target outbound renderers.
pub type SynthFn = fn(&Proxy, &str) -> Result<Value>;

/// Returns the renderer for a target.
pub fn synth_for(target: Target) -> SynthFn {
    match target {
        Target::Xray => proxy_to_xray,
        Target::SingBox => proxy_to_singbox,
    }
}

/// Renders a proxy as compact outbound JSON for `target`.
///
/// A record without a usable address renders as an empty string, as does
/// a protocol the target cannot express.
pub fn try_synthesize(proxy: &Proxy, target: Target, tag: &str) -> Result<String> {
    if !proxy.has_usable_address() {
        return Ok(String::new());
    }
    let value = synth_for(target)(proxy, tag)?;
    Ok(value.to_string())
}

/// Like [`try_synthesize`] but maps every failure to an empty string.
pub fn synthesize(proxy: &Proxy, target: Target, tag: &str) -> String {
    match try_synthesize(proxy, target, tag) {
        Ok(json) => json,
        Err(e) => {
            debug!("No {} outbound for {}: {}", target, proxy.raw_uri(), e);
            String::new()
        }
    }
}
