//! Contract invocation: typed proxy calls and deploy / init / upgrade.

use std::path::Path;

use near_primitives::types::AccountId;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{CallDescriptor, ChainAction, ChainClient, Outcome};
use crate::contracts::{ContractKind, INIT_METHOD, InitArgs};
use crate::error::ChainError;
use crate::keystore::StoredKey;

/// A deployed contract seen through its declared interface.
///
/// Only methods listed in [`ContractKind::interface`] can be called, and
/// only with the matching classification. Anything else fails before a
/// request leaves the process.
pub struct ContractProxy<'a> {
    client: &'a dyn ChainClient,
    kind: ContractKind,
    contract_id: AccountId,
    signer: Option<&'a StoredKey>,
}

impl<'a> ContractProxy<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        kind: ContractKind,
        contract_id: AccountId,
        signer: Option<&'a StoredKey>,
    ) -> Self {
        Self {
            client,
            kind,
            contract_id,
            signer,
        }
    }

    /// Run a view method and decode its result.
    pub async fn view<A: Serialize + ?Sized>(
        &self,
        method_name: &str,
        args: &A,
    ) -> Result<serde_json::Value, ChainError> {
        if !self.kind.interface().has_view(method_name) {
            return Err(self.undeclared(method_name, "view"));
        }
        let args = serde_json::to_vec(args)?;
        debug!(contract = %self.contract_id, method = method_name, "view call");
        let bytes = self
            .client
            .view_call(&self.contract_id, method_name, args)
            .await?;
        self.kind.interface().decode_view(method_name, &bytes)
    }

    /// Sign and send one change method call.
    pub async fn call<A: Serialize + ?Sized>(
        &self,
        method_name: &str,
        args: &A,
        deposit: u128,
        gas: u64,
    ) -> Result<Outcome, ChainError> {
        if !self.kind.interface().has_change(method_name) {
            return Err(self.undeclared(method_name, "change"));
        }
        let signer = self
            .signer
            .ok_or_else(|| ChainError::MissingSigner(method_name.to_string()))?;

        let call = CallDescriptor::json(method_name, args, deposit, gas)?;
        info!(
            contract = %self.contract_id,
            kind = %self.kind,
            method = method_name,
            signer = %signer.account_id,
            deposit,
            gas,
            "calling contract"
        );
        self.client
            .send_actions(signer, &self.contract_id, vec![ChainAction::FunctionCall(call)])
            .await
    }

    /// Call the `new` initializer.
    pub async fn init(&self, args: &InitArgs, gas: u64) -> Result<Outcome, ChainError> {
        if args.kind() != self.kind {
            return Err(ChainError::Execution(format!(
                "{} init arguments given for a {} contract",
                args.kind(),
                self.kind
            )));
        }
        self.call(INIT_METHOD, args, 0, gas).await
    }

    fn undeclared(&self, method_name: &str, classification: &'static str) -> ChainError {
        warn!(
            contract = %self.kind,
            method = method_name,
            "refusing undeclared {classification} method"
        );
        ChainError::MethodNotDeclared {
            contract: self.kind.name(),
            method: method_name.to_string(),
            classification,
        }
    }
}

/// Transactions sent by [`deploy`].
///
/// Once the code transaction lands it is reported even when the
/// initializer fails, so the caller can tell a half-deployed contract from
/// one that was never touched.
#[derive(Debug)]
pub struct Deployment {
    pub contract_id: AccountId,
    pub code_size: usize,
    pub deploy: Outcome,
    /// `None` when no initialization was requested.
    pub init: Option<Result<Outcome, ChainError>>,
}

/// Read a contract binary. Missing or empty files are rejected.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, ChainError> {
    let code = std::fs::read(path).map_err(|e| ChainError::Artifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if code.is_empty() {
        return Err(ChainError::Artifact {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        });
    }
    Ok(code)
}

/// Deploy `wasm_path` to the signer's own account, then run the
/// initializer when `init` is given.
///
/// With `init == None` this is an upgrade: code is replaced and contract
/// state is left alone. The account must already exist. Errors returned
/// here mean no code was deployed; an initializer failure is carried in
/// [`Deployment::init`].
pub async fn deploy(
    client: &dyn ChainClient,
    signer: &StoredKey,
    wasm_path: &Path,
    init: Option<&InitArgs>,
    init_gas: u64,
) -> Result<Deployment, ChainError> {
    let code = read_artifact(wasm_path)?;
    let contract_id = signer.account_id.clone();

    if !client.account_exists(&contract_id).await? {
        return Err(ChainError::Execution(format!(
            "account {contract_id} does not exist; create it before deploying"
        )));
    }

    let code_size = code.len();
    info!(
        contract = %contract_id,
        path = %wasm_path.display(),
        bytes = code_size,
        init = init.is_some(),
        "deploying contract code"
    );
    let deploy = client
        .send_actions(
            signer,
            &contract_id,
            vec![ChainAction::DeployContract { code }],
        )
        .await?;

    let init = match init {
        Some(args) => {
            let proxy = ContractProxy::new(client, args.kind(), contract_id.clone(), Some(signer));
            let result = proxy.init(args, init_gas).await;
            if let Err(e) = &result {
                warn!(
                    contract = %contract_id,
                    tx = %deploy.transaction_hash,
                    "code deployed but initialization failed: {e}"
                );
            }
            Some(result)
        }
        None => None,
    };

    Ok(Deployment {
        contract_id,
        code_size,
        deploy,
        init,
    })
}
