pub mod explodes;
pub mod normalize;
pub mod parse_settings;

// Re-export common types
pub use explodes::explode;
pub use normalize::{normalize, NormalizedUri, Scheme};
pub use parse_settings::{CipherPolicy, ParseSettings};
