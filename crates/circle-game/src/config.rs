//! deployment configuration loaded from TOML
//!
//! ```toml
//! authority = "0x..."
//! token = "0x..."
//! whitelist = ["0x...", "0x..."]   # or whitelist_root = "0x..."
//! payout = 200
//! decimals = 18
//! payout_policy = "once-per-winner"
//!
//! [limits]
//! max_axis = 100000
//! max_radius = 100000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claim::PayoutPolicy;
use crate::error::Error;
use crate::game::GameParams;
use crate::types::{parse_hash, Address, Hash, Limits};
use crate::whitelist::build_tree;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no authority configured")]
    MissingAuthority,

    #[error("exactly one of `whitelist_root` and `whitelist` must be set")]
    WhitelistSource,

    #[error("whitelist is empty")]
    EmptyWhitelist,

    #[error("whitelist_root is not a 32-byte hex hash: {0}")]
    InvalidRoot(String),

    #[error("payout {payout} with {decimals} decimals does not fit in u128")]
    PayoutOverflow { payout: u64, decimals: u32 },

    #[error(transparent)]
    Game(#[from] Error),
}

fn default_payout() -> u64 {
    200
}

fn default_decimals() -> u32 {
    18
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// may be left out and supplied on the command line instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<Address>,
    pub token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<Address>>,
    #[serde(default)]
    pub salt: u64,
    /// whole tokens per winner
    #[serde(default = "default_payout")]
    pub payout: u64,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default)]
    pub payout_policy: PayoutPolicy,
    #[serde(default)]
    pub limits: Limits,
}

impl GameConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_authority(mut self, authority: Address) -> Self {
        self.authority = Some(authority);
        self
    }

    /// the configured root, or the root of the configured address list
    pub fn root(&self) -> Result<Hash, ConfigError> {
        match (&self.whitelist_root, &self.whitelist) {
            (Some(hex), None) => parse_hash(hex).ok_or_else(|| ConfigError::InvalidRoot(hex.clone())),
            (None, Some(list)) => build_tree(list).root().ok_or(ConfigError::EmptyWhitelist),
            _ => Err(ConfigError::WhitelistSource),
        }
    }

    /// payout in base units: `payout * 10^decimals`
    pub fn payout_amount(&self) -> Result<u128, ConfigError> {
        10u128
            .checked_pow(self.decimals)
            .and_then(|scale| u128::from(self.payout).checked_mul(scale))
            .ok_or(ConfigError::PayoutOverflow {
                payout: self.payout,
                decimals: self.decimals,
            })
    }

    pub fn to_params(&self) -> Result<GameParams, ConfigError> {
        let authority = self.authority.ok_or(ConfigError::MissingAuthority)?;
        Ok(GameParams {
            authority,
            token: self.token,
            whitelist_root: self.root()?,
            salt: self.salt,
            payout_amount: self.payout_amount()?,
            payout_policy: self.payout_policy,
            limits: self.limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::DEFAULT_PAYOUT;
    use crate::types::format_hash;

    const MINIMAL: &str = r#"
        authority = "0xadadadadadadadadadadadadadadadadadadadad"
        token = "0xcccccccccccccccccccccccccccccccccccccccc"
        whitelist = [
            "0x0101010101010101010101010101010101010101",
            "0x0202020202020202020202020202020202020202",
        ]
    "#;

    #[test]
    fn test_defaults() {
        let config = GameConfig::from_toml_str(MINIMAL).unwrap();
        let params = config.to_params().unwrap();

        assert_eq!(params.authority, Address([0xad; 20]));
        assert_eq!(params.token, Address([0xcc; 20]));
        assert_eq!(params.salt, 0);
        assert_eq!(params.payout_amount, DEFAULT_PAYOUT);
        assert_eq!(params.payout_policy, PayoutPolicy::OncePerWinner);
        assert_eq!(params.limits, Limits::default());

        let expected = build_tree(&[Address([1; 20]), Address([2; 20])]).root().unwrap();
        assert_eq!(params.whitelist_root, expected);
    }

    #[test]
    fn test_explicit_root_and_overrides() {
        let root = [9u8; 32];
        let text = format!(
            r#"
            token = "0xcccccccccccccccccccccccccccccccccccccccc"
            whitelist_root = "{}"
            salt = 7
            payout = 5
            decimals = 6
            payout_policy = "every-claim"

            [limits]
            max_axis = 1000
            "#,
            format_hash(&root)
        );
        let config = GameConfig::from_toml_str(&text)
            .unwrap()
            .with_authority(Address([0xad; 20]));
        let params = config.to_params().unwrap();

        assert_eq!(params.whitelist_root, root);
        assert_eq!(params.salt, 7);
        assert_eq!(params.payout_amount, 5_000_000);
        assert_eq!(params.payout_policy, PayoutPolicy::EveryClaim);
        assert_eq!(params.limits.max_axis, 1000);
        assert_eq!(params.limits.max_radius, Limits::default().max_radius);
    }

    #[test]
    fn test_missing_authority() {
        let text = MINIMAL.replace(
            "authority = \"0xadadadadadadadadadadadadadadadadadadadad\"",
            "",
        );
        let config = GameConfig::from_toml_str(&text).unwrap();
        assert!(matches!(config.to_params(), Err(ConfigError::MissingAuthority)));
    }

    #[test]
    fn test_whitelist_source_must_be_unique() {
        let mut config = GameConfig::from_toml_str(MINIMAL).unwrap();
        config.whitelist_root = Some(format_hash(&[1u8; 32]));
        assert!(matches!(config.root(), Err(ConfigError::WhitelistSource)));

        config.whitelist_root = None;
        config.whitelist = None;
        assert!(matches!(config.root(), Err(ConfigError::WhitelistSource)));

        config.whitelist = Some(Vec::new());
        assert!(matches!(config.root(), Err(ConfigError::EmptyWhitelist)));

        config.whitelist = None;
        config.whitelist_root = Some("0x1234".into());
        assert!(matches!(config.root(), Err(ConfigError::InvalidRoot(_))));
    }

    #[test]
    fn test_payout_overflow() {
        let mut config = GameConfig::from_toml_str(MINIMAL).unwrap();
        config.decimals = 40;
        assert!(matches!(
            config.payout_amount(),
            Err(ConfigError::PayoutOverflow { payout: 200, decimals: 40 })
        ));
    }

    #[test]
    fn test_bad_address_is_parse_error() {
        let text = MINIMAL.replace("0xcccccccccccccccccccccccccccccccccccccccc", "0xcc");
        assert!(matches!(GameConfig::from_toml_str(&text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = format!("{MINIMAL}\nadmin = \"x\"\n");
        assert!(matches!(GameConfig::from_toml_str(&text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GameConfig::load("/nonexistent/circle-game.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
