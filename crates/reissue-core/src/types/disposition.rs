//! Batch dispositions
//!
//! A disposition is the corrective action class chosen for a failed batch.
//! Classification from error codes happens in the transport layer; the
//! orchestrator only executes whatever disposition it is handed.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Corrective action for a failed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    /// Re-submit every request in a fresh batch
    #[default]
    Normal,

    /// Hand every caller its original result and error
    AbortRetries,

    /// Repair the session first, then retry or abort depending on the repair
    RepairSession,
}

impl Disposition {
    /// Kebab-case name, as used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Normal => "normal",
            Disposition::AbortRetries => "abort-retries",
            Disposition::RepairSession => "repair-session",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Disposition::Normal),
            "abort-retries" | "abort" => Ok(Disposition::AbortRetries),
            "repair-session" | "repair" => Ok(Disposition::RepairSession),
            other => Err(Error::invalid_disposition(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_normal() {
        assert_eq!(Disposition::default(), Disposition::Normal);
    }

    #[test]
    fn test_display_matches_serde() {
        for disposition in [
            Disposition::Normal,
            Disposition::AbortRetries,
            Disposition::RepairSession,
        ] {
            let yaml = serde_yaml_ng::to_string(&disposition).unwrap();
            assert_eq!(yaml.trim(), disposition.to_string());
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "abort-retries".parse::<Disposition>().unwrap(),
            Disposition::AbortRetries
        );
        assert_eq!(
            " Repair-Session ".parse::<Disposition>().unwrap(),
            Disposition::RepairSession
        );
        assert!(matches!(
            "backoff".parse::<Disposition>(),
            Err(Error::InvalidDisposition { .. })
        ));
    }
}
