pub mod error;
pub mod generator;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;

// Re-export the main proxy types for easier access
pub use models::{Proxy, ProxyItem, ProxyResult, ProxyType, Target};

// Re-export the conversion entry points
pub use error::ParseError;
pub use generator::{synthesize, try_synthesize, Outbound, OutboundRegistry};
pub use parser::{explode, normalize, ParseSettings};
pub use settings::Settings;
