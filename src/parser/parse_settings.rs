use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Shadowsocks ciphers recognized by Xray and sing-box.
pub const SS_CIPHERS: &[&str] = &[
    "none",
    "plain",
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "chacha20-ietf-poly1305",
    "xchacha20-ietf-poly1305",
    "2022-blake3-aes-128-gcm",
    "2022-blake3-aes-256-gcm",
    "2022-blake3-chacha20-poly1305",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "rc4-md5",
    "chacha20",
    "chacha20-ietf",
    "xchacha20",
];

/// What to do with a Shadowsocks cipher outside [`SS_CIPHERS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherPolicy {
    /// Keep the cipher name as written (lowercased)
    #[default]
    Permissive,
    /// Replace it with `none`
    FallbackNone,
    /// Reject the link as malformed
    Strict,
}

impl FromStr for CipherPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "permissive" => Ok(CipherPolicy::Permissive),
            "fallback-none" | "none" => Ok(CipherPolicy::FallbackNone),
            "strict" => Ok(CipherPolicy::Strict),
            other => Err(format!("unknown cipher policy: {}", other)),
        }
    }
}

/// Used for controlling the behavior of parsing functions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSettings {
    /// Handling of unknown Shadowsocks ciphers
    pub cipher_policy: CipherPolicy,
}

impl ParseSettings {
    pub fn with_cipher_policy(cipher_policy: CipherPolicy) -> Self {
        ParseSettings { cipher_policy }
    }
}

impl From<&Settings> for ParseSettings {
    fn from(settings: &Settings) -> Self {
        ParseSettings {
            cipher_policy: settings.parser.cipher_policy,
        }
    }
}

/// Returns true when the cipher is one of [`SS_CIPHERS`].
pub fn is_known_cipher(method: &str) -> bool {
    SS_CIPHERS.contains(&method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_policy_from_str() {
        assert_eq!(
            "fallback_none".parse::<CipherPolicy>(),
            Ok(CipherPolicy::FallbackNone)
        );
        assert_eq!("Strict".parse::<CipherPolicy>(), Ok(CipherPolicy::Strict));
        assert!("loose".parse::<CipherPolicy>().is_err());
    }

    #[test]
    fn test_default_is_permissive() {
        assert_eq!(
            ParseSettings::default().cipher_policy,
            CipherPolicy::Permissive
        );
    }

    #[test]
    fn test_is_known_cipher() {
        assert!(is_known_cipher("rc4-md5"));
        assert!(!is_known_cipher("rc4"));
        assert!(!is_known_cipher("AES-128-GCM"));
    }
}
