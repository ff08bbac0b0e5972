pub mod formats;
pub mod registry;

// Re-export format converters
pub use formats::{proxy_to_singbox, proxy_to_xray, synth_for, synthesize, try_synthesize, SynthFn};

// Re-export registry types
pub use registry::{Outbound, OutboundRegistry};
