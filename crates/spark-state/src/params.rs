//! consensus parameters for the spark subsystem
//!
//! Two independent activation heights gate the ledger: spark itself, and the
//! schnorr transcript fix. Heights below `spark_start_block` see no spark
//! activity at all; `schnorr_fixes_start_block` only decides which
//! challenge transcript ownership proofs are verified with.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use spark_primitives::SchnorrMode;

/// maximum number of coins in one anonymity group
pub const MAX_COINS_IN_GROUP: usize = 65_000;

/// coins carried over from the previous group into a new group's anonymity set
pub const START_GROUP_SIZE: usize = 16_000;

/// spark activation height (mainnet)
pub const SPARK_START_BLOCK: u32 = 819_300;

/// spark activation height (testnet)
pub const SPARK_START_BLOCK_TESTNET: u32 = 107_000;

/// schnorr transcript fix activation height (mainnet)
pub const SCHNORR_FIXES_START_BLOCK: u32 = 436_000;

/// schnorr transcript fix activation height (testnet)
pub const SCHNORR_FIXES_START_BLOCK_TESTNET: u32 = 35_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Spark consensus parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkParams {
    pub network: Network,
    /// first height at which spark transactions are valid
    pub spark_start_block: u32,
    /// first height at which ownership proofs use the fixed transcript
    pub schnorr_fixes_start_block: u32,
    pub max_coins_in_group: usize,
    pub start_group_size: usize,
}

impl SparkParams {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            spark_start_block: SPARK_START_BLOCK,
            schnorr_fixes_start_block: SCHNORR_FIXES_START_BLOCK,
            max_coins_in_group: MAX_COINS_IN_GROUP,
            start_group_size: START_GROUP_SIZE,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            spark_start_block: SPARK_START_BLOCK_TESTNET,
            schnorr_fixes_start_block: SCHNORR_FIXES_START_BLOCK_TESTNET,
            ..Self::mainnet()
        }
    }

    /// Activates spark before the transcript fix, so both proof modes occur.
    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            spark_start_block: 1_000,
            schnorr_fixes_start_block: 1_500,
            ..Self::mainnet()
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Override the group limits (used by tests and small regtest chains).
    pub fn with_group_limits(mut self, max_coins_in_group: usize, start_group_size: usize) -> Self {
        self.max_coins_in_group = max_coins_in_group;
        self.start_group_size = start_group_size;
        self
    }

    pub fn is_spark_allowed(&self, height: u32) -> bool {
        height >= self.spark_start_block
    }

    pub fn schnorr_mode(&self, height: u32) -> SchnorrMode {
        SchnorrMode::from_fixes(height >= self.schnorr_fixes_start_block)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_coins_in_group == 0 {
            return Err("max_coins_in_group must be positive".into());
        }
        if self.start_group_size > self.max_coins_in_group {
            return Err(format!(
                "start_group_size {} exceeds max_coins_in_group {}",
                self.start_group_size, self.max_coins_in_group
            ));
        }
        Ok(())
    }
}

impl Default for SparkParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_gates_are_independent() {
        let p = SparkParams::regtest();
        assert!(!p.is_spark_allowed(999));
        assert!(p.is_spark_allowed(1_000));
        assert_eq!(p.schnorr_mode(1_200), SchnorrMode::Legacy);
        assert_eq!(p.schnorr_mode(1_500), SchnorrMode::Fixed);

        let mainnet = SparkParams::mainnet();
        // the fix predates spark on mainnet, every spark proof is fixed-mode
        assert_eq!(mainnet.schnorr_mode(mainnet.spark_start_block), SchnorrMode::Fixed);
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("regtest".parse::<Network>().unwrap(), Network::Regtest);
        assert!("signet".parse::<Network>().is_err());
    }

    #[test]
    fn test_params_json_defaults() {
        let p: SparkParams = serde_json::from_str(r#"{"network":"regtest","spark_start_block":5}"#).unwrap();
        assert_eq!(p.network, Network::Regtest);
        assert_eq!(p.spark_start_block, 5);
        assert_eq!(p.max_coins_in_group, MAX_COINS_IN_GROUP);
    }

    #[test]
    fn test_validate() {
        assert!(SparkParams::default().validate().is_ok());
        assert!(SparkParams::regtest().with_group_limits(10, 20).validate().is_err());
        assert!(SparkParams::regtest().with_group_limits(0, 0).validate().is_err());
    }
}
