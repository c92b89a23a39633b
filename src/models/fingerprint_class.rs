use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Henry-style fingerprint class derived from singularities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintClass {
    /// No cores, no deltas
    #[serde(rename = "arch")]
    Arch,
    /// One core above one delta, nearly vertically aligned
    #[serde(rename = "tented arch")]
    TentedArch,
    /// One core and one delta, delta steeply below-right of the core
    #[serde(rename = "left loop")]
    LeftLoop,
    /// One core and one delta, delta steeply below-left of the core
    #[serde(rename = "right loop")]
    RightLoop,
    /// Two cores (and two deltas)
    #[serde(rename = "whorl or twin loop")]
    WhorlOrTwinLoop,
    /// Singularity configuration matches no rule
    #[serde(rename = "unknown")]
    Unknown,
}

impl FingerprintClass {
    /// All labels, in rule order
    pub const ALL: [FingerprintClass; 6] = [
        FingerprintClass::Arch,
        FingerprintClass::TentedArch,
        FingerprintClass::LeftLoop,
        FingerprintClass::RightLoop,
        FingerprintClass::WhorlOrTwinLoop,
        FingerprintClass::Unknown,
    ];

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            FingerprintClass::Arch => "arch",
            FingerprintClass::TentedArch => "tented arch",
            FingerprintClass::LeftLoop => "left loop",
            FingerprintClass::RightLoop => "right loop",
            FingerprintClass::WhorlOrTwinLoop => "whorl or twin loop",
            FingerprintClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FingerprintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FingerprintClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|class| class.label() == normalized)
            .ok_or_else(|| format!("unknown fingerprint class `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        assert_eq!("arch".parse(), Ok(FingerprintClass::Arch));
        assert_eq!("Tented-Arch".parse(), Ok(FingerprintClass::TentedArch));
        assert_eq!(
            "whorl_or_twin_loop".parse(),
            Ok(FingerprintClass::WhorlOrTwinLoop)
        );
        assert!("spiral".parse::<FingerprintClass>().is_err());
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&FingerprintClass::LeftLoop).unwrap();
        assert_eq!(json, "\"left loop\"");
    }
}
