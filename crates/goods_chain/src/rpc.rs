//! JSON-RPC implementation of [`ChainClient`] on top of `near-jsonrpc-client`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use near_crypto::InMemorySigner;
use near_jsonrpc_client::errors::JsonRpcError;
use near_jsonrpc_client::{JsonRpcClient, methods};
use near_jsonrpc_primitives::types::query::{QueryResponseKind, RpcQueryError};
use near_primitives::account::{AccessKey, AccessKeyPermission};
use near_primitives::errors::{ActionError, ActionErrorKind, TxExecutionError};
use near_primitives::transaction::{
    Action, AddKeyAction, CreateAccountAction, DeleteAccountAction, DeployContractAction,
    FunctionCallAction, Transaction, TransferAction,
};
use near_primitives::types::{AccountId, BlockReference, Finality, FunctionArgs};
use near_primitives::views::{FinalExecutionStatus, QueryRequest};
use tracing::{debug, info};

use crate::client::{ChainAction, ChainClient, Outcome};
use crate::error::ChainError;
use crate::keystore::StoredKey;
use crate::network::NetworkProfile;

/// Talks to one network's RPC endpoint. Every round trip is bounded by the
/// profile's timeout.
pub struct RpcClient {
    client: JsonRpcClient,
    rpc_url: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn connect(profile: &NetworkProfile) -> Self {
        debug!(network = %profile.network, url = %profile.rpc_url, "connecting to RPC");
        Self {
            client: JsonRpcClient::connect(profile.rpc_url.as_str()),
            rpc_url: profile.rpc_url.clone(),
            timeout: profile.timeout(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ChainError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ChainError::Timeout(self.timeout))?
    }

    /// Current nonce of the signer's access key and a recent block hash.
    async fn access_key_state(
        &self,
        signer: &StoredKey,
    ) -> Result<(u64, near_primitives::hash::CryptoHash), ChainError> {
        let response = self
            .client
            .call(methods::query::RpcQueryRequest {
                block_reference: BlockReference::Finality(Finality::Final),
                request: QueryRequest::ViewAccessKey {
                    account_id: signer.account_id.clone(),
                    public_key: signer.public_key.clone(),
                },
            })
            .await
            .map_err(|e| query_error(e, &signer.account_id))?;

        match response.kind {
            QueryResponseKind::AccessKey(access_key) => Ok((access_key.nonce, response.block_hash)),
            _ => Err(ChainError::Rpc(
                "unexpected response to access key query".into(),
            )),
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn view_call(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, ChainError> {
        self.bounded(async {
            let response = self
                .client
                .call(methods::query::RpcQueryRequest {
                    block_reference: BlockReference::Finality(Finality::Final),
                    request: QueryRequest::CallFunction {
                        account_id: contract_id.clone(),
                        method_name: method_name.to_string(),
                        args: FunctionArgs::from(args),
                    },
                })
                .await
                .map_err(|e| query_error(e, contract_id))?;

            match response.kind {
                QueryResponseKind::CallResult(result) => Ok(result.result),
                _ => Err(ChainError::Rpc(format!(
                    "unexpected response to view call {method_name}"
                ))),
            }
        })
        .await
    }

    async fn send_actions(
        &self,
        signer: &StoredKey,
        receiver_id: &AccountId,
        actions: Vec<ChainAction>,
    ) -> Result<Outcome, ChainError> {
        let action_names: Vec<&str> = actions.iter().map(ChainAction::name).collect();
        debug!(
            signer = %signer.account_id,
            receiver = %receiver_id,
            actions = ?action_names,
            "sending transaction"
        );

        let (nonce, block_hash) = self.bounded(self.access_key_state(signer)).await?;

        let transaction = Transaction {
            signer_id: signer.account_id.clone(),
            public_key: signer.public_key.clone(),
            nonce: nonce + 1,
            receiver_id: receiver_id.clone(),
            block_hash,
            actions: actions.into_iter().map(to_sdk_action).collect(),
        };
        let in_memory =
            InMemorySigner::from_secret_key(signer.account_id.clone(), signer.private_key.clone());
        let signed_transaction = transaction.sign(&in_memory);

        let outcome = self
            .bounded(async {
                self.client
                    .call(methods::broadcast_tx_commit::RpcBroadcastTxCommitRequest {
                        signed_transaction,
                    })
                    .await
                    .map_err(|e| ChainError::Rpc(format!("{e:?}")))
            })
            .await?;

        let transaction_hash = outcome.transaction.hash.to_string();
        match outcome.status {
            FinalExecutionStatus::SuccessValue(return_value) => {
                info!(tx = %transaction_hash, receiver = %receiver_id, "transaction succeeded");
                Ok(Outcome {
                    transaction_hash,
                    signer_id: signer.account_id.clone(),
                    receiver_id: receiver_id.clone(),
                    return_value,
                })
            }
            FinalExecutionStatus::Failure(err) => Err(execution_error(err, &transaction_hash)),
            FinalExecutionStatus::NotStarted | FinalExecutionStatus::Started => Err(
                ChainError::Rpc(format!("transaction {transaction_hash} did not finish")),
            ),
        }
    }

    async fn account_exists(&self, account_id: &AccountId) -> Result<bool, ChainError> {
        self.bounded(async {
            let result = self
                .client
                .call(methods::query::RpcQueryRequest {
                    block_reference: BlockReference::Finality(Finality::Final),
                    request: QueryRequest::ViewAccount {
                        account_id: account_id.clone(),
                    },
                })
                .await;
            match result {
                Ok(_) => Ok(true),
                Err(err) => match err.handler_error() {
                    Some(RpcQueryError::UnknownAccount { .. }) => Ok(false),
                    _ => Err(ChainError::Rpc(format!("{err:?}"))),
                },
            }
        })
        .await
    }
}

fn to_sdk_action(action: ChainAction) -> Action {
    match action {
        ChainAction::CreateAccount => Action::CreateAccount(CreateAccountAction {}),
        ChainAction::Transfer { deposit } => Action::Transfer(TransferAction { deposit }),
        ChainAction::AddFullAccessKey { public_key } => Action::AddKey(Box::new(AddKeyAction {
            public_key,
            access_key: AccessKey {
                nonce: 0,
                permission: AccessKeyPermission::FullAccess,
            },
        })),
        ChainAction::DeployContract { code } => {
            Action::DeployContract(DeployContractAction { code })
        }
        ChainAction::FunctionCall(call) => Action::FunctionCall(Box::new(FunctionCallAction {
            method_name: call.method_name,
            args: call.args,
            gas: call.gas,
            deposit: call.deposit,
        })),
        ChainAction::DeleteAccount { beneficiary_id } => {
            Action::DeleteAccount(DeleteAccountAction { beneficiary_id })
        }
    }
}

fn query_error(err: JsonRpcError<RpcQueryError>, account_id: &AccountId) -> ChainError {
    match err.handler_error() {
        Some(RpcQueryError::ContractExecutionError { vm_error, .. }) => {
            ChainError::Execution(vm_error.clone())
        }
        Some(RpcQueryError::UnknownAccount { .. }) => {
            ChainError::Rpc(format!("account {account_id} does not exist"))
        }
        Some(RpcQueryError::UnknownAccessKey { public_key, .. }) => ChainError::Rpc(format!(
            "access key {public_key} is not registered on {account_id}"
        )),
        _ => ChainError::Rpc(format!("{err:?}")),
    }
}

fn execution_error(err: TxExecutionError, transaction_hash: &str) -> ChainError {
    if let TxExecutionError::ActionError(ActionError {
        kind: ActionErrorKind::AccountAlreadyExists { account_id },
        ..
    }) = &err
    {
        return ChainError::AccountExists(account_id.to_string());
    }
    ChainError::Execution(format!("{err} (transaction {transaction_hash})"))
}
