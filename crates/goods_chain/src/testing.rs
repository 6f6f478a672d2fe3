//! In-memory [`ChainClient`] that records every outbound request.
//!
//! It keeps a set of existing accounts so that the rules the tool relies on
//! hold in tests: an account can only be created once, code can only be
//! deployed to an existing account, and a signer must exist to sign.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use near_primitives::types::AccountId;
use parking_lot::Mutex;

use crate::client::{CallDescriptor, ChainAction, ChainClient, Outcome};
use crate::error::ChainError;
use crate::keystore::StoredKey;

/// One request the client received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    View {
        contract_id: AccountId,
        method_name: String,
        args: serde_json::Value,
    },
    Send {
        signer_id: AccountId,
        receiver_id: AccountId,
        actions: Vec<ChainAction>,
    },
    AccountExists(AccountId),
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    accounts: HashSet<AccountId>,
    view_responses: HashMap<String, Vec<u8>>,
    call_responses: HashMap<String, Vec<u8>>,
    fail_next_send: Option<String>,
    failing_calls: HashMap<String, String>,
    tx_counter: u64,
}

#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<State>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RecordingClient::add_account`].
    pub fn with_account(self, account_id: &str) -> Self {
        self.add_account(account_id);
        self
    }

    /// Mark an account as existing on chain.
    ///
    /// # Panics
    /// Panics on an invalid account id; this is test scaffolding.
    pub fn add_account(&self, account_id: &str) {
        let id: AccountId = account_id.parse().unwrap_or_else(|e| panic!("{account_id}: {e}"));
        self.state.lock().accounts.insert(id);
    }

    pub fn has_account(&self, account_id: &str) -> bool {
        account_id
            .parse::<AccountId>()
            .map(|id| self.state.lock().accounts.contains(&id))
            .unwrap_or(false)
    }

    /// JSON returned by every view call of `method_name`.
    pub fn set_view_response(&self, method_name: &str, value: serde_json::Value) {
        self.set_raw_view_response(method_name, value.to_string().into_bytes());
    }

    /// Bytes returned verbatim by every view call of `method_name`.
    pub fn set_raw_view_response(&self, method_name: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .view_responses
            .insert(method_name.to_string(), bytes);
    }

    /// JSON returned by a transaction whose last action calls `method_name`.
    pub fn set_call_response(&self, method_name: &str, value: serde_json::Value) {
        self.set_raw_call_response(method_name, value.to_string().into_bytes());
    }

    /// Bytes returned verbatim by a transaction calling `method_name`.
    pub fn set_raw_call_response(&self, method_name: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .call_responses
            .insert(method_name.to_string(), bytes);
    }

    /// Make the next transaction fail on chain with `message`.
    pub fn fail_next_send(&self, message: &str) {
        self.state.lock().fail_next_send = Some(message.to_string());
    }

    /// Make the next transaction calling `method_name` fail with `message`.
    /// Other transactions, before or after, go through.
    pub fn fail_call(&self, method_name: &str, message: &str) {
        self.state
            .lock()
            .failing_calls
            .insert(method_name.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of requests of any kind.
    pub fn outbound_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Transactions sent, as `(receiver, actions)`.
    pub fn sends(&self) -> Vec<(AccountId, Vec<ChainAction>)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Send {
                    receiver_id,
                    actions,
                    ..
                } => Some((receiver_id.clone(), actions.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every function call action sent, in order.
    pub fn function_calls(&self) -> Vec<CallDescriptor> {
        self.sends()
            .into_iter()
            .flat_map(|(_, actions)| actions)
            .filter_map(|action| match action {
                ChainAction::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    fn next_hash(state: &mut State) -> String {
        state.tx_counter += 1;
        format!("FakeTx{}", state.tx_counter)
    }
}

#[async_trait]
impl ChainClient for RecordingClient {
    async fn view_call(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, ChainError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::View {
            contract_id: contract_id.clone(),
            method_name: method_name.to_string(),
            args: serde_json::from_slice(&args).unwrap_or(serde_json::Value::Null),
        });
        if !state.accounts.contains(contract_id) {
            return Err(ChainError::Rpc(format!("account {contract_id} does not exist")));
        }
        Ok(state
            .view_responses
            .get(method_name)
            .cloned()
            .unwrap_or_else(|| b"null".to_vec()))
    }

    async fn send_actions(
        &self,
        signer: &StoredKey,
        receiver_id: &AccountId,
        actions: Vec<ChainAction>,
    ) -> Result<Outcome, ChainError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall::Send {
            signer_id: signer.account_id.clone(),
            receiver_id: receiver_id.clone(),
            actions: actions.clone(),
        });

        if let Some(message) = state.fail_next_send.take() {
            return Err(ChainError::Execution(message));
        }
        if !state.accounts.contains(&signer.account_id) {
            return Err(ChainError::Rpc(format!(
                "account {} does not exist",
                signer.account_id
            )));
        }

        let mut return_value = Vec::new();
        for action in &actions {
            match action {
                ChainAction::CreateAccount => {
                    if !state.accounts.insert(receiver_id.clone()) {
                        return Err(ChainError::AccountExists(receiver_id.to_string()));
                    }
                }
                ChainAction::DeployContract { .. } => {
                    if !state.accounts.contains(receiver_id) {
                        return Err(ChainError::Execution(format!(
                            "can't deploy to {receiver_id}: account does not exist"
                        )));
                    }
                    if receiver_id != &signer.account_id {
                        return Err(ChainError::Execution(
                            "DeployContract must be signed by the receiver".into(),
                        ));
                    }
                }
                ChainAction::DeleteAccount { .. } => {
                    state.accounts.remove(receiver_id);
                }
                ChainAction::FunctionCall(call) => {
                    if let Some(message) = state.failing_calls.remove(&call.method_name) {
                        return Err(ChainError::Execution(message));
                    }
                    if !state.accounts.contains(receiver_id) {
                        return Err(ChainError::Execution(format!(
                            "{receiver_id} does not exist"
                        )));
                    }
                    if call.method_name == "create_account" {
                        // Registrar semantics: returns false when the account exists.
                        let created = call.args_json()["new_account_id"]
                            .as_str()
                            .and_then(|id| id.parse::<AccountId>().ok())
                            .is_some_and(|id| state.accounts.insert(id));
                        return_value = serde_json::to_vec(&created)?;
                    } else if let Some(bytes) = state.call_responses.get(&call.method_name) {
                        return_value = bytes.clone();
                    }
                }
                ChainAction::Transfer { .. } | ChainAction::AddFullAccessKey { .. } => {}
            }
        }

        Ok(Outcome {
            transaction_hash: Self::next_hash(&mut state),
            signer_id: signer.account_id.clone(),
            receiver_id: receiver_id.clone(),
            return_value,
        })
    }

    async fn account_exists(&self, account_id: &AccountId) -> Result<bool, ChainError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RecordedCall::AccountExists(account_id.clone()));
        Ok(state.accounts.contains(account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TGAS;

    fn key(id: &str) -> StoredKey {
        StoredKey::generate(id.parse().unwrap())
    }

    #[tokio::test]
    async fn create_account_twice_fails() {
        let client = RecordingClient::new().with_account("creator.testnet");
        let signer = key("creator.testnet");
        let new_id: AccountId = "sub.creator.testnet".parse().unwrap();

        client
            .send_actions(&signer, &new_id, vec![ChainAction::CreateAccount])
            .await
            .unwrap();
        let err = client
            .send_actions(&signer, &new_id, vec![ChainAction::CreateAccount])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::AccountExists(_)));
        assert_eq!(client.sends().len(), 2);
    }

    #[tokio::test]
    async fn deploy_needs_existing_account() {
        let client = RecordingClient::new();
        let signer = key("ghost.testnet");
        let err = client
            .send_actions(
                &signer,
                &signer.account_id,
                vec![ChainAction::DeployContract { code: vec![0] }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Rpc(_)));
    }

    #[tokio::test]
    async fn registrar_create_returns_false_for_existing() {
        let client = RecordingClient::new()
            .with_account("testnet")
            .with_account("funder.testnet")
            .with_account("taken.testnet");
        let call = CallDescriptor::json(
            "create_account",
            &serde_json::json!({ "new_account_id": "taken.testnet", "new_public_key": "x" }),
            0,
            300 * TGAS,
        )
        .unwrap();
        let outcome = client
            .send_actions(
                &key("funder.testnet"),
                &"testnet".parse().unwrap(),
                vec![ChainAction::FunctionCall(call)],
            )
            .await
            .unwrap();
        assert_eq!(outcome.json().unwrap(), serde_json::json!(false));
    }

    #[tokio::test]
    async fn view_responses_and_recording() {
        let client = RecordingClient::new().with_account("rocks.testnet");
        client.set_view_response("get_admin", serde_json::json!("alice.testnet"));

        let bytes = client
            .view_call(&"rocks.testnet".parse().unwrap(), "get_admin", b"{}".to_vec())
            .await
            .unwrap();
        assert_eq!(bytes, br#""alice.testnet""#.to_vec());
        assert!(matches!(
            &client.calls()[0],
            RecordedCall::View { method_name, .. } if method_name == "get_admin"
        ));
    }

    #[tokio::test]
    async fn fail_next_send_is_one_shot() {
        let client = RecordingClient::new().with_account("a.testnet");
        client.fail_next_send("Smart contract panicked: Unauthorized");
        let signer = key("a.testnet");
        let target = signer.account_id.clone();

        assert!(client.send_actions(&signer, &target, vec![]).await.is_err());
        assert!(client.send_actions(&signer, &target, vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn fail_call_only_hits_that_method() {
        let client = RecordingClient::new().with_account("a.testnet");
        client.fail_call("new", "Smart contract panicked: bad metadata");
        let signer = key("a.testnet");
        let target = signer.account_id.clone();
        let init = || {
            let call = CallDescriptor::json("new", &serde_json::json!({}), 0, TGAS).unwrap();
            vec![ChainAction::FunctionCall(call)]
        };

        let deploy = vec![ChainAction::DeployContract { code: vec![0] }];
        assert!(client.send_actions(&signer, &target, deploy).await.is_ok());
        let err = client.send_actions(&signer, &target, init()).await.unwrap_err();
        assert!(err.to_string().contains("bad metadata"));
        assert!(client.send_actions(&signer, &target, init()).await.is_ok());
        assert_eq!(client.sends().len(), 3);
    }

    #[tokio::test]
    async fn raw_call_response_is_returned_verbatim() {
        let client = RecordingClient::new().with_account("env.testnet");
        client.set_raw_call_response("nft_create", b"not json".to_vec());
        let signer = key("env.testnet");
        let call = CallDescriptor::json("nft_create", &serde_json::json!({}), 0, TGAS).unwrap();
        let outcome = client
            .send_actions(&signer, &signer.account_id, vec![ChainAction::FunctionCall(call)])
            .await
            .unwrap();
        assert_eq!(outcome.return_value, b"not json".to_vec());
        assert!(outcome.json().is_err());
    }
}
