use std::fmt;
use std::str::FromStr;

/// Runtime whose outbound schema is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Xray-core: `{protocol, settings, streamSettings}`
    Xray,
    /// sing-box: flat `{type, server, server_port, transport, tls}`
    SingBox,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Xray => "xray",
            Target::SingBox => "sing",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xray" | "xray-core" | "v2ray" => Ok(Target::Xray),
            "sing" | "singbox" | "sing-box" => Ok(Target::SingBox),
            other => Err(format!("unknown target: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("xray".parse::<Target>(), Ok(Target::Xray));
        assert_eq!("Sing-Box".parse::<Target>(), Ok(Target::SingBox));
        assert!("clash".parse::<Target>().is_err());
    }
}
