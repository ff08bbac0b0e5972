pub mod common;
pub mod hysteria2;
pub mod ss;
pub mod ssr;
pub mod stream;
pub mod trojan;
pub mod vless;
pub mod vmess;
pub mod wireguard;

// Re-export all parsers
pub use common::{explode, explode_normalized, LinkParts, QueryParams};
pub use hysteria2::explode_hysteria2;
pub use ss::explode_ss;
pub use ssr::explode_ssr;
pub use trojan::explode_trojan;
pub use vless::explode_vless;
pub use vmess::explode_vmess;
pub use wireguard::explode_wireguard;
