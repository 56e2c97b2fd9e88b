//! Settings shared by every contract facade.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::error::ContractResult;

/// Message send mode (the "gas mode" flag passed with each internal message).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendMode(u8);

impl SendMode {
    /// Ordinary message, fees deducted from the attached value.
    pub const ORDINARY: SendMode = SendMode(0);
    /// Pay transfer fees separately from the attached value.
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    /// Ignore errors during the action phase.
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    /// Destroy the sender if its balance reaches zero.
    pub const DESTROY_IF_ZERO: SendMode = SendMode(32);
    /// Carry the remaining value of the inbound message.
    pub const CARRY_REMAINING_VALUE: SendMode = SendMode(64);
    /// Carry the whole remaining balance.
    pub const CARRY_ALL_BALANCE: SendMode = SendMode(128);

    /// Wrap a raw mode byte.
    pub const fn new(bits: u8) -> Self {
        SendMode(bits)
    }

    /// Raw mode byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag of `other` is set.
    pub const fn contains(self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SendMode {
    fn default() -> Self {
        SendMode::PAY_GAS_SEPARATELY
    }
}

impl BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: SendMode) -> SendMode {
        SendMode(self.0 | rhs.0)
    }
}

impl fmt::Display for SendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings applied by contract facades.
///
/// Constructed by the caller and handed to each facade; nothing here is
/// global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractSettings {
    /// Workchain used when deriving addresses from code and config cells.
    pub workchain: i32,
    /// Render user-friendly addresses with the testnet flag.
    pub testnet: bool,
    /// Bounce flag for outgoing messages and user-friendly rendering.
    pub bounceable: bool,
    /// Send mode attached to every outgoing message.
    pub send_mode: SendMode,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            workchain: 0,
            testnet: false,
            bounceable: true,
            send_mode: SendMode::default(),
        }
    }
}

impl ContractSettings {
    /// Settings for testnet with the default basechain workchain.
    pub fn testnet() -> Self {
        Self {
            testnet: true,
            ..Self::default()
        }
    }

    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ContractResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize settings to JSON.
    pub fn to_json(&self) -> ContractResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ContractSettings::default();
        assert_eq!(settings.workchain, 0);
        assert!(!settings.testnet);
        assert!(settings.bounceable);
        assert_eq!(settings.send_mode, SendMode::PAY_GAS_SEPARATELY);
    }

    #[test]
    fn test_from_json_partial() {
        let settings = ContractSettings::from_json(r#"{"testnet": true, "send_mode": 3}"#).unwrap();
        assert!(settings.testnet);
        assert_eq!(settings.workchain, 0);
        assert_eq!(
            settings.send_mode,
            SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = ContractSettings {
            workchain: -1,
            testnet: true,
            bounceable: false,
            send_mode: SendMode::CARRY_ALL_BALANCE,
        };
        let json = settings.to_json().unwrap();
        assert_eq!(ContractSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_invalid_json() {
        assert!(ContractSettings::from_json("{ workchain: ").is_err());
    }

    #[test]
    fn test_send_mode_flags() {
        let mode = SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS;
        assert_eq!(mode.bits(), 3);
        assert!(mode.contains(SendMode::IGNORE_ERRORS));
        assert!(!mode.contains(SendMode::CARRY_ALL_BALANCE));
    }
}
