//! Core data models for the application
//!
//! This module contains the primary data structures used throughout the crate,
//! separated from the logic that operates on them.
//!
//! # Usage
//!
//! Records are produced by the parsers rather than built by hand:
//!
//! ```rust
//! use uri_outbound::parser::explodes::explode;
//! use uri_outbound::parser::ParseSettings;
//! use uri_outbound::ProxyType;
//!
//! let proxy = explode(
//!     "trojan://secret@example.com:443?sni=example.com#node",
//!     &ParseSettings::default(),
//! )
//! .unwrap();
//! assert_eq!(proxy.proxy_type(), ProxyType::Trojan);
//! assert_eq!(proxy.address(), "example.com");
//! assert_eq!(proxy.remark, "node");
//! ```

mod proxy;
pub mod proxy_result;
mod target;
pub mod transport;

pub use proxy::*;
pub use proxy_result::{ProxyItem, ProxyResult};
pub use target::Target;
pub use transport::{
    GrpcSettings, HttpSettings, Network, RealitySettings, Security, TcpHeaderType, TcpSettings,
    TlsSettings, TransportDescriptor, UdpOverTcp, WsSettings,
};
