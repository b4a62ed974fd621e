use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Android,
    Linux,
    Windows,
    MacOS,
    Unknown,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Android,
        Platform::Linux,
        Platform::Windows,
        Platform::MacOS,
        Platform::Unknown,
    ];

    pub fn detect() -> Self {
        if cfg!(target_os = "android") {
            Self::Android
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOS
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Unknown
        }
    }

    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_else(|err| {
            warn!(label, error = %err, "неизвестная платформа, используется профиль по умолчанию");
            Self::Unknown
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "Android",
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::MacOS => "MacOS",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if let Some(platform) = Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(label))
        {
            return Ok(platform);
        }
        match label.to_lowercase().as_str() {
            "win" => Ok(Self::Windows),
            "darwin" | "mac" => Ok(Self::MacOS),
            "default" => Ok(Self::Unknown),
            other => Err(format!("неизвестная платформа '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Platform::from_label("LINUX"), Platform::Linux);
        assert_eq!(Platform::from_label(" android "), Platform::Android);
        assert_eq!(Platform::from_label("Darwin"), Platform::MacOS);
        assert_eq!(Platform::from_label("Windows"), Platform::Windows);
    }

    #[test]
    fn unknown_label_degrades_to_unknown() {
        assert_eq!(Platform::from_label("freebsd"), Platform::Unknown);
        assert_eq!(Platform::from_label(""), Platform::Unknown);
        assert!("plan9".parse::<Platform>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_label(&platform.to_string()), platform);
        }
    }
}
