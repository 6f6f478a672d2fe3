use async_trait::async_trait;
use near_crypto::PublicKey;
use near_primitives::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::keystore::StoredKey;

/// 1 TGas in gas units.
pub const TGAS: u64 = 1_000_000_000_000;
/// Largest prepaid gas a single function call may carry.
pub const MAX_GAS: u64 = 300 * TGAS;
/// 1 NEAR in yoctoNEAR.
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;
/// Deposit demanded by admin/operator-gated contract methods.
pub const ONE_YOCTO: u128 = 1;

/// One contract method invocation: name, JSON arguments, attached deposit and gas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub method_name: String,
    pub args: Vec<u8>,
    pub deposit: u128,
    pub gas: u64,
}

impl CallDescriptor {
    /// Serialize `args` to JSON and build the descriptor.
    pub fn json<A: Serialize + ?Sized>(
        method_name: impl Into<String>,
        args: &A,
        deposit: u128,
        gas: u64,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            method_name: method_name.into(),
            args: serde_json::to_vec(args)?,
            deposit,
            gas,
        })
    }

    /// The arguments parsed back as JSON, for logs and tests.
    pub fn args_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.args).unwrap_or(serde_json::Value::Null)
    }
}

/// The actions this tool sends. Converted to SDK actions by the RPC client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAction {
    CreateAccount,
    Transfer { deposit: u128 },
    AddFullAccessKey { public_key: PublicKey },
    DeployContract { code: Vec<u8> },
    FunctionCall(CallDescriptor),
    DeleteAccount { beneficiary_id: AccountId },
}

impl ChainAction {
    pub fn name(&self) -> &'static str {
        match self {
            ChainAction::CreateAccount => "create_account",
            ChainAction::Transfer { .. } => "transfer",
            ChainAction::AddFullAccessKey { .. } => "add_key",
            ChainAction::DeployContract { .. } => "deploy_contract",
            ChainAction::FunctionCall(_) => "function_call",
            ChainAction::DeleteAccount { .. } => "delete_account",
        }
    }
}

/// A transaction that reached final execution successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub transaction_hash: String,
    pub signer_id: AccountId,
    pub receiver_id: AccountId,
    /// Raw `SuccessValue` bytes; empty when the receipt returned nothing.
    #[serde(default)]
    pub return_value: Vec<u8>,
}

impl Outcome {
    /// Decode the return value as JSON. Empty output decodes to `Null`.
    pub fn json(&self) -> Result<serde_json::Value, ChainError> {
        decode_json(&self.return_value)
    }
}

pub(crate) fn decode_json(bytes: &[u8]) -> Result<serde_json::Value, ChainError> {
    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Parse a NEAR amount: `"1.5"` is NEAR, a `yocto` suffix (`"1yocto"`) is
/// raw yoctoNEAR. At most 24 fractional digits.
pub fn parse_near_amount(input: &str) -> Result<u128, String> {
    let input = input.trim();
    if let Some(raw) = input.strip_suffix("yocto") {
        return raw
            .trim()
            .parse::<u128>()
            .map_err(|e| format!("{input:?} is not a yoctoNEAR amount: {e}"));
    }
    let amount = input.strip_suffix("NEAR").unwrap_or(input).trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("{input:?} is not a NEAR amount"));
    }
    if frac.len() > 24 {
        return Err(format!("{input:?} has more than 24 decimals"));
    }
    let digits = |s: &str| s.is_empty() || s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !digits(frac) {
        return Err(format!("{input:?} is not a NEAR amount"));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("{input:?} is too large"))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let scaled = format!("{frac:0<24}");
        scaled.parse().map_err(|_| format!("{input:?} is not a NEAR amount"))?
    };
    whole
        .checked_mul(ONE_NEAR)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| format!("{input:?} is too large"))
}

/// Render yoctoNEAR as a NEAR decimal without trailing zeros.
pub fn format_near(yocto: u128) -> String {
    let whole = yocto / ONE_NEAR;
    let frac = yocto % ONE_NEAR;
    if frac == 0 {
        return format!("{whole} NEAR");
    }
    let frac = format!("{frac:024}");
    format!("{whole}.{} NEAR", frac.trim_end_matches('0'))
}

/// Everything this tool asks of the network, behind one seam.
///
/// Production code uses [`crate::rpc::RpcClient`]; tests use the recording
/// client from [`crate::testing`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Run a read-only contract method and return its raw result bytes.
    async fn view_call(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, ChainError>;

    /// Sign `actions` with `signer`, send them to `receiver_id` and wait for
    /// final execution. An on-chain failure is [`ChainError::Execution`].
    async fn send_actions(
        &self,
        signer: &StoredKey,
        receiver_id: &AccountId,
        actions: Vec<ChainAction>,
    ) -> Result<Outcome, ChainError>;

    async fn account_exists(&self, account_id: &AccountId) -> Result<bool, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_descriptor_serializes_args() {
        let call = CallDescriptor::json(
            "change_admin",
            &serde_json::json!({ "new_admin_id": "alice.testnet" }),
            ONE_YOCTO,
            30 * TGAS,
        )
        .unwrap();
        assert_eq!(call.method_name, "change_admin");
        assert_eq!(call.args_json()["new_admin_id"], "alice.testnet");
        assert_eq!(call.deposit, 1);
        assert_eq!(call.gas, 30_000_000_000_000);
    }

    #[test]
    fn outcome_json_empty_is_null() {
        let outcome = Outcome {
            transaction_hash: "h".into(),
            signer_id: "a.testnet".parse().unwrap(),
            receiver_id: "b.testnet".parse().unwrap(),
            return_value: Vec::new(),
        };
        assert_eq!(outcome.json().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn outcome_json_decodes_value() {
        let outcome = Outcome {
            transaction_hash: "h".into(),
            signer_id: "a.testnet".parse().unwrap(),
            receiver_id: "b.testnet".parse().unwrap(),
            return_value: br#"{"token_id":"7"}"#.to_vec(),
        };
        assert_eq!(outcome.json().unwrap()["token_id"], "7");
    }

    #[test]
    fn action_names() {
        assert_eq!(ChainAction::CreateAccount.name(), "create_account");
        assert_eq!(ChainAction::DeployContract { code: vec![] }.name(), "deploy_contract");
    }
    #[test]
    fn parse_near_amounts() {
        assert_eq!(parse_near_amount("1").unwrap(), ONE_NEAR);
        assert_eq!(parse_near_amount("0.5").unwrap(), ONE_NEAR / 2);
        assert_eq!(parse_near_amount("2 NEAR").unwrap(), 2 * ONE_NEAR);
        assert_eq!(parse_near_amount(".1").unwrap(), ONE_NEAR / 10);
        assert_eq!(parse_near_amount("1yocto").unwrap(), ONE_YOCTO);
        assert_eq!(parse_near_amount("0").unwrap(), 0);
    }

    #[test]
    fn parse_near_amount_rejects_garbage() {
        assert!(parse_near_amount("").is_err());
        assert!(parse_near_amount("abc").is_err());
        assert!(parse_near_amount("1.2.3").is_err());
        assert!(parse_near_amount("-1").is_err());
        assert!(parse_near_amount("0.0000000000000000000000001").is_err());
        assert!(parse_near_amount("xyocto").is_err());
    }

    #[test]
    fn format_near_trims_zeros() {
        assert_eq!(format_near(ONE_NEAR), "1 NEAR");
        assert_eq!(format_near(ONE_NEAR + ONE_NEAR / 4), "1.25 NEAR");
        assert_eq!(format_near(1), "0.000000000000000000000001 NEAR");
    }
}
