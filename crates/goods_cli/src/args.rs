//! Positional argument → environment variable → default resolution.
//!
//! The process environment is read once in `main` into an [`Env`] snapshot;
//! everything below works on that snapshot so resolution is testable without
//! touching global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use goods_chain::{AccountId, parse_near_amount};
use goods_core::GoodsError;
use thiserror::Error;

/// Environment variables the commands read.
pub mod vars {
    pub const NETWORK: &str = "NETWORK";
    pub const CREATOR_ACCOUNT_ID: &str = "CREATOR_ACCOUNT_ID";
    pub const BENEFICIARY_ID: &str = "BENEFICIARY_ID";
    pub const ADMIN_ID: &str = "ADMIN_ID";
    pub const OPERATOR_ID: &str = "OPERATOR_ID";
    pub const TREASURY_ID: &str = "TREASURY_ID";
    pub const INIT_IMO_FEE: &str = "INIT_IMO_FEE";
    pub const ROCK_PURCHASE_FEE: &str = "ROCK_PURCHASE_FEE";
    pub const INIT_IMO_NFT_HOLDER_SIZE: &str = "INIT_IMO_NFT_HOLDER_SIZE";
    pub const PUBLIC_TOTAL_SUPPLY: &str = "PUBLIC_TOTAL_SUPPLY";
    pub const PUBLIC_PRICE: &str = "PUBLIC_PRICE";
    pub const SIGNER_ACCOUNT: &str = "SIGNER_ACCOUNT";
    pub const CONTRACT_ACCOUNT: &str = "CONTRACT_ACCOUNT";
    pub const METAVERSE_ID: &str = "METAVERSE_ID";
    pub const DEPOSIT: &str = "DEPOSIT";
    pub const TOKEN_PRICE: &str = "TOKEN_PRICE";
    pub const GAS: &str = "GAS";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing {name}: {hint}")]
    Missing { name: &'static str, hint: String },

    #[error("{name} must be a base-10 integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be at most {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        max: u64,
    },

    #[error("{name}: {reason}")]
    InvalidAmount { name: &'static str, reason: String },

    #[error("{name} {value:?} is not a valid account id: {reason}")]
    InvalidAccount {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} is not valid JSON: {reason}")]
    InvalidJson { name: &'static str, reason: String },
}

impl From<ArgError> for GoodsError {
    fn from(err: ArgError) -> Self {
        GoodsError::Input(err.to_string())
    }
}

/// Snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// A variable's value. Unset and blank are the same thing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Resolves command parameters against an [`Env`].
///
/// For every parameter the first non-blank source wins: the positional
/// argument, then each listed variable in order, then the default.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    env: &'a Env,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    pub fn raw(&self, positional: Option<&str>, vars: &[&str]) -> Option<String> {
        positional
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| vars.iter().find_map(|var| self.env.get(var)))
            .map(str::to_string)
    }

    pub fn string_or(&self, positional: Option<&str>, vars: &[&str], default: &str) -> String {
        self.raw(positional, vars)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn require(
        &self,
        name: &'static str,
        positional: Option<&str>,
        vars: &[&str],
    ) -> Result<String, ArgError> {
        self.raw(positional, vars).ok_or_else(|| ArgError::Missing {
            name,
            hint: missing_hint(vars),
        })
    }

    /// A base-10 integer, `default` when nothing is given.
    pub fn number<T: FromStr>(
        &self,
        name: &'static str,
        positional: Option<&str>,
        vars: &[&str],
        default: T,
    ) -> Result<T, ArgError> {
        match self.raw(positional, vars) {
            Some(value) => parse_number(name, &value),
            None => Ok(default),
        }
    }

    pub fn required_number<T: FromStr>(
        &self,
        name: &'static str,
        positional: Option<&str>,
        vars: &[&str],
    ) -> Result<T, ArgError> {
        let value = self.require(name, positional, vars)?;
        parse_number(name, &value)
    }

    /// A NEAR amount in yoctoNEAR (`"1.5"` NEAR, or `"5yocto"`).
    pub fn amount(
        &self,
        name: &'static str,
        positional: Option<&str>,
        vars: &[&str],
        default: u128,
    ) -> Result<u128, ArgError> {
        match self.raw(positional, vars) {
            Some(value) => {
                parse_near_amount(&value).map_err(|reason| ArgError::InvalidAmount { name, reason })
            }
            None => Ok(default),
        }
    }

    pub fn account(
        &self,
        name: &'static str,
        positional: Option<&str>,
        vars: &[&str],
    ) -> Result<AccountId, ArgError> {
        let value = self.require(name, positional, vars)?;
        parse_account(name, &value)
    }

    pub fn path(&self, positional: Option<&Path>, vars: &[&str]) -> Option<PathBuf> {
        let positional = positional.and_then(Path::to_str);
        self.raw(positional, vars).map(PathBuf::from)
    }

    pub fn required_path(
        &self,
        name: &'static str,
        positional: Option<&Path>,
        vars: &[&str],
    ) -> Result<PathBuf, ArgError> {
        self.path(positional, vars).ok_or_else(|| ArgError::Missing {
            name,
            hint: missing_hint(vars),
        })
    }

    pub fn json(
        &self,
        name: &'static str,
        positional: Option<&str>,
        default: serde_json::Value,
    ) -> Result<serde_json::Value, ArgError> {
        match self.raw(positional, &[]) {
            Some(value) => serde_json::from_str(&value).map_err(|e| ArgError::InvalidJson {
                name,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Gas in TGas from `GAS`, else `default_tgas`; returned in gas units.
    pub fn gas(&self, default_tgas: u64) -> Result<u64, ArgError> {
        let tgas: u64 = self.number("GAS", None, &[vars::GAS], default_tgas)?;
        let max = goods_chain::MAX_GAS / goods_chain::TGAS;
        if tgas == 0 || tgas > max {
            return Err(ArgError::OutOfRange {
                name: "GAS (TGas)",
                value: tgas,
                max,
            });
        }
        Ok(tgas * goods_chain::TGAS)
    }
}

pub fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ArgError> {
    let value = value.trim();
    // `FromStr` for integers also takes a leading '+'.
    if !value.bytes().all(|b| b.is_ascii_digit()) || value.is_empty() {
        return Err(ArgError::InvalidNumber {
            name,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| ArgError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

pub fn parse_account(name: &'static str, value: &str) -> Result<AccountId, ArgError> {
    value
        .trim()
        .parse::<AccountId>()
        .map_err(|e| ArgError::InvalidAccount {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn missing_hint(vars: &[&str]) -> String {
    match vars {
        [] => "pass it as an argument".to_string(),
        [var] => format!("pass it as an argument or set {var}"),
        _ => format!("pass it as an argument or set one of {}", vars.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Env {
        Env::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn positional_wins_over_env() {
        let env = env(&[("ADMIN_ID", "env-admin")]);
        let r = Resolver::new(&env);
        assert_eq!(r.string_or(Some("arg-admin"), &["ADMIN_ID"], ""), "arg-admin");
    }

    #[test]
    fn env_used_when_positional_absent() {
        let env = env(&[("ADMIN_ID", "alice")]);
        let r = Resolver::new(&env);
        assert_eq!(r.string_or(None, &["ADMIN_ID"], ""), "alice");
    }

    #[test]
    fn default_used_when_both_absent() {
        let env = Env::default();
        let r = Resolver::new(&env);
        assert_eq!(r.string_or(None, &["ADMIN_ID"], ""), "");
        assert_eq!(r.number::<u32>("fee", None, &["ROCK_PURCHASE_FEE"], 0).unwrap(), 0);
    }

    #[test]
    fn blank_values_fall_through() {
        let env = env(&[("SIGNER_ACCOUNT", "  "), ("CONTRACT_ACCOUNT", "rocks.testnet")]);
        let r = Resolver::new(&env);
        assert_eq!(
            r.raw(Some(""), &["SIGNER_ACCOUNT", "CONTRACT_ACCOUNT"]).as_deref(),
            Some("rocks.testnet")
        );
    }

    #[test]
    fn variables_checked_in_order() {
        let env = env(&[("TOKEN_PRICE", "2"), ("PUBLIC_PRICE", "3")]);
        let r = Resolver::new(&env);
        assert_eq!(r.raw(None, &["TOKEN_PRICE", "PUBLIC_PRICE"]).as_deref(), Some("2"));
        assert_eq!(r.raw(None, &["PUBLIC_PRICE", "TOKEN_PRICE"]).as_deref(), Some("3"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let env = env(&[("ROCK_PURCHASE_FEE", "ten")]);
        let r = Resolver::new(&env);
        let err = r
            .number::<u32>("rock purchase fee", None, &["ROCK_PURCHASE_FEE"], 0)
            .unwrap_err();
        assert_eq!(
            err,
            ArgError::InvalidNumber {
                name: "rock purchase fee",
                value: "ten".into()
            }
        );
        assert!(parse_number::<u32>("n", "+5").is_err());
        assert!(parse_number::<u32>("n", "0x10").is_err());
        assert!(parse_number::<u8>("n", "300").is_err());
        assert_eq!(parse_number::<u128>("n", " 42 ").unwrap(), 42);
    }

    #[test]
    fn missing_required_value_names_the_variable() {
        let env = Env::default();
        let r = Resolver::new(&env);
        let err = r.require("contract account", None, &["CONTRACT_ACCOUNT"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing contract account: pass it as an argument or set CONTRACT_ACCOUNT"
        );
    }

    #[test]
    fn amounts_are_near_or_yocto() {
        let env = env(&[("DEPOSIT", "1yocto")]);
        let r = Resolver::new(&env);
        assert_eq!(r.amount("deposit", None, &["DEPOSIT"], 0).unwrap(), 1);
        assert_eq!(
            r.amount("deposit", Some("0.1"), &["DEPOSIT"], 0).unwrap(),
            goods_chain::ONE_NEAR / 10
        );
        assert!(matches!(
            r.amount("deposit", Some("lots"), &[], 0),
            Err(ArgError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn accounts_are_validated() {
        let env = Env::default();
        let r = Resolver::new(&env);
        assert_eq!(
            r.account("signer", Some("alice.testnet"), &[]).unwrap().as_str(),
            "alice.testnet"
        );
        assert!(matches!(
            r.account("signer", Some("Alice!"), &[]),
            Err(ArgError::InvalidAccount { .. })
        ));
    }

    #[test]
    fn gas_is_bounded() {
        let r_env = env(&[("GAS", "100")]);
        let r = Resolver::new(&r_env);
        assert_eq!(r.gas(30).unwrap(), 100 * goods_chain::TGAS);

        let empty = Env::default();
        assert_eq!(Resolver::new(&empty).gas(30).unwrap(), 30 * goods_chain::TGAS);

        let too_much = env(&[("GAS", "301")]);
        assert!(matches!(
            Resolver::new(&too_much).gas(30),
            Err(ArgError::OutOfRange { max: 300, .. })
        ));
    }

    #[test]
    fn json_argument() {
        let env = Env::default();
        let r = Resolver::new(&env);
        let value = r
            .json("args", Some(r#"{"metaverse_id":"mv"}"#), serde_json::json!({}))
            .unwrap();
        assert_eq!(value["metaverse_id"], "mv");
        assert_eq!(r.json("args", None, serde_json::json!({})).unwrap(), serde_json::json!({}));
        assert!(r.json("args", Some("{"), serde_json::json!({})).is_err());
    }

    #[test]
    fn arg_errors_are_input_errors() {
        let err: GoodsError = ArgError::InvalidNumber {
            name: "fee",
            value: "x".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }
}
