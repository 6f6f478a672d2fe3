use std::path::PathBuf;

use near_primitives::types::AccountId;
use tracing::{info, warn};

use crate::client::{CallDescriptor, ChainAction, ChainClient, MAX_GAS, Outcome};
use crate::error::ChainError;
use crate::keystore::{KeyStore, StoredKey};
use crate::network::NetworkProfile;

/// A freshly created account and where its key was written.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub account_id: AccountId,
    pub public_key: String,
    pub key_path: PathBuf,
    pub outcome: Outcome,
}

/// Account lifecycle against one network and one key store.
pub struct AccountManager<'a> {
    client: &'a dyn ChainClient,
    keystore: &'a KeyStore,
    profile: &'a NetworkProfile,
}

impl<'a> AccountManager<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        keystore: &'a KeyStore,
        profile: &'a NetworkProfile,
    ) -> Self {
        Self {
            client,
            keystore,
            profile,
        }
    }

    /// Create `new_account_id` funded with `deposit` yoctoNEAR by `creator_id`.
    ///
    /// A direct sub-account of the creator is created with a batch of
    /// `CreateAccount + Transfer + AddKey`. Any other id goes through the
    /// network registrar's `create_account` method. The generated key is only
    /// written to the key store once the chain accepted the account.
    pub async fn create_account(
        &self,
        creator_id: &AccountId,
        new_account_id: &AccountId,
        deposit: u128,
    ) -> Result<CreatedAccount, ChainError> {
        let creator = self.keystore.require_key(creator_id)?;

        if self.client.account_exists(new_account_id).await? {
            return Err(ChainError::AccountExists(new_account_id.to_string()));
        }

        let new_key = StoredKey::generate(new_account_id.clone());
        let outcome = if is_direct_sub_account(new_account_id, creator_id) {
            info!(account = %new_account_id, creator = %creator_id, "creating sub-account");
            self.client
                .send_actions(
                    &creator,
                    new_account_id,
                    vec![
                        ChainAction::CreateAccount,
                        ChainAction::Transfer { deposit },
                        ChainAction::AddFullAccessKey {
                            public_key: new_key.public_key.clone(),
                        },
                    ],
                )
                .await?
        } else {
            self.create_via_registrar(&creator, &new_key, deposit).await?
        };

        let key_path = self.keystore.set_key(&new_key)?;
        info!(
            account = %new_account_id,
            network = %self.profile.network,
            tx = %outcome.transaction_hash,
            "account created"
        );
        Ok(CreatedAccount {
            account_id: new_account_id.clone(),
            public_key: new_key.public_key.to_string(),
            key_path,
            outcome,
        })
    }

    async fn create_via_registrar(
        &self,
        creator: &StoredKey,
        new_key: &StoredKey,
        deposit: u128,
    ) -> Result<Outcome, ChainError> {
        let registrar = self.profile.registrar_account_id.as_ref().ok_or_else(|| {
            ChainError::InvalidAccountId {
                id: new_key.account_id.to_string(),
                reason: format!(
                    "{} has no registrar; only sub-accounts of {} can be created",
                    self.profile.network, creator.account_id
                ),
            }
        })?;
        info!(
            account = %new_key.account_id,
            registrar = %registrar,
            "creating account through registrar"
        );

        let call = CallDescriptor::json(
            "create_account",
            &serde_json::json!({
                "new_account_id": new_key.account_id,
                "new_public_key": new_key.public_key.to_string(),
            }),
            deposit,
            MAX_GAS,
        )?;
        let outcome = self
            .client
            .send_actions(creator, registrar, vec![ChainAction::FunctionCall(call)])
            .await?;

        // The registrar refunds and returns false when it could not create the account.
        if outcome.json()? == serde_json::Value::Bool(false) {
            return Err(ChainError::AccountExists(new_key.account_id.to_string()));
        }
        Ok(outcome)
    }

    /// Delete `account_id` on chain, sending its balance to `beneficiary_id`.
    ///
    /// The local key is kept; remove it with [`AccountManager::delete_key`].
    pub async fn delete_account(
        &self,
        account_id: &AccountId,
        beneficiary_id: &AccountId,
    ) -> Result<Outcome, ChainError> {
        let key = self.keystore.require_key(account_id)?;
        if account_id == beneficiary_id {
            return Err(ChainError::InvalidAccountId {
                id: beneficiary_id.to_string(),
                reason: "beneficiary must differ from the deleted account".into(),
            });
        }
        info!(account = %account_id, beneficiary = %beneficiary_id, "deleting account");
        let outcome = self
            .client
            .send_actions(
                &key,
                account_id,
                vec![ChainAction::DeleteAccount {
                    beneficiary_id: beneficiary_id.clone(),
                }],
            )
            .await?;
        warn!(account = %account_id, "account deleted on chain; its local key is still stored");
        Ok(outcome)
    }

    /// Remove the local key file. Nothing is sent to the chain.
    pub fn delete_key(&self, account_id: &AccountId) -> Result<bool, ChainError> {
        let removed = self.keystore.remove_key(account_id)?;
        if !removed {
            warn!(account = %account_id, network = %self.profile.network, "no local key to remove");
        }
        Ok(removed)
    }
}

/// `child` is exactly one label below `parent` (`a.parent`, not `a.b.parent`).
pub fn is_direct_sub_account(child: &AccountId, parent: &AccountId) -> bool {
    child
        .as_str()
        .strip_suffix(parent.as_str())
        .and_then(|prefix| prefix.strip_suffix('.'))
        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ONE_NEAR;
    use crate::network::Network;
    use crate::testing::RecordingClient;
    use goods_core::GoodsConfig;

    fn account(id: &str) -> AccountId {
        id.parse().unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        keystore: KeyStore,
        profile: NetworkProfile,
    }

    fn fixture(network: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = GoodsConfig {
            key_store_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let profile = NetworkProfile::lookup(network, &config).unwrap();
        let keystore = KeyStore::for_profile(&profile);
        Fixture {
            _dir: dir,
            keystore,
            profile,
        }
    }

    fn with_creator(fx: &Fixture, id: &str) {
        fx.keystore.set_key(&StoredKey::generate(account(id))).unwrap();
    }

    #[tokio::test]
    async fn sub_account_is_created_with_a_batch() {
        let fx = fixture("testnet");
        with_creator(&fx, "goods.testnet");
        let client = RecordingClient::new().with_account("goods.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        let created = manager
            .create_account(
                &account("goods.testnet"),
                &account("rocks.goods.testnet"),
                5 * ONE_NEAR,
            )
            .await
            .unwrap();

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, account("rocks.goods.testnet"));
        assert!(matches!(
            &sends[0].1[..],
            [
                ChainAction::CreateAccount,
                ChainAction::Transfer { deposit },
                ChainAction::AddFullAccessKey { .. }
            ] if *deposit == 5 * ONE_NEAR
        ));

        let stored = fx.keystore.require_key(&account("rocks.goods.testnet")).unwrap();
        assert_eq!(stored.public_key.to_string(), created.public_key);
        assert_eq!(created.key_path, fx.keystore.key_path(&account("rocks.goods.testnet")));
    }

    #[tokio::test]
    async fn top_level_account_goes_through_registrar() {
        let fx = fixture("testnet");
        with_creator(&fx, "funder.testnet");
        let client = RecordingClient::new()
            .with_account("testnet")
            .with_account("funder.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        manager
            .create_account(&account("funder.testnet"), &account("fresh.testnet"), ONE_NEAR)
            .await
            .unwrap();

        let sends = client.sends();
        assert_eq!(sends[0].0, account("testnet"));
        let calls = client.function_calls();
        assert_eq!(calls[0].method_name, "create_account");
        assert_eq!(calls[0].gas, MAX_GAS);
        assert_eq!(calls[0].deposit, ONE_NEAR);
        assert_eq!(calls[0].args_json()["new_account_id"], "fresh.testnet");
        assert!(client.has_account("fresh.testnet"));
    }

    #[tokio::test]
    async fn creating_the_same_account_twice_fails() {
        let fx = fixture("testnet");
        with_creator(&fx, "goods.testnet");
        let client = RecordingClient::new().with_account("goods.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);
        let target = account("twice.goods.testnet");

        manager
            .create_account(&account("goods.testnet"), &target, ONE_NEAR)
            .await
            .unwrap();
        let first_key = fx.keystore.require_key(&target).unwrap();

        let err = manager
            .create_account(&account("goods.testnet"), &target, ONE_NEAR)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::AccountExists(_)));

        let still = fx.keystore.require_key(&target).unwrap();
        assert_eq!(still.public_key, first_key.public_key);
    }

    #[tokio::test]
    async fn registrar_refusal_stores_nothing() {
        let fx = fixture("testnet");
        with_creator(&fx, "funder.testnet");
        let client = RecordingClient::new()
            .with_account("testnet")
            .with_account("funder.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);
        client.fail_next_send("LackBalanceForState");

        let err = manager
            .create_account(&account("funder.testnet"), &account("broke.testnet"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Execution(_)));
        assert!(fx.keystore.get_key(&account("broke.testnet")).unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_creator_key_makes_no_calls() {
        let fx = fixture("testnet");
        let client = RecordingClient::new();
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        let err = manager
            .create_account(&account("ghost.testnet"), &account("a.ghost.testnet"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::KeyNotFound { .. }));
        assert_eq!(client.outbound_count(), 0);
    }

    #[tokio::test]
    async fn localnet_has_no_registrar() {
        let fx = fixture("localnet");
        with_creator(&fx, "node0");
        let client = RecordingClient::new().with_account("node0");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        let err = manager
            .create_account(&account("node0"), &account("alice"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidAccountId { .. }));
        assert!(client.sends().is_empty());
        assert_eq!(fx.profile.network, Network::Localnet);
    }

    #[tokio::test]
    async fn delete_account_keeps_local_key() {
        let fx = fixture("testnet");
        with_creator(&fx, "old.testnet");
        let client = RecordingClient::new().with_account("old.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        manager
            .delete_account(&account("old.testnet"), &account("heir.testnet"))
            .await
            .unwrap();
        assert!(!client.has_account("old.testnet"));
        assert!(fx.keystore.get_key(&account("old.testnet")).unwrap().is_some());

        assert!(manager.delete_key(&account("old.testnet")).unwrap());
        assert!(!manager.delete_key(&account("old.testnet")).unwrap());
    }

    #[tokio::test]
    async fn delete_account_rejects_self_beneficiary() {
        let fx = fixture("testnet");
        with_creator(&fx, "old.testnet");
        let client = RecordingClient::new().with_account("old.testnet");
        let manager = AccountManager::new(&client, &fx.keystore, &fx.profile);

        let err = manager
            .delete_account(&account("old.testnet"), &account("old.testnet"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidAccountId { .. }));
        assert_eq!(client.outbound_count(), 0);
    }

    #[test]
    fn direct_sub_accounts() {
        let parent = account("goods.testnet");
        assert!(is_direct_sub_account(&account("rocks.goods.testnet"), &parent));
        assert!(!is_direct_sub_account(&account("a.rocks.goods.testnet"), &parent));
        assert!(!is_direct_sub_account(&account("goods.testnet"), &parent));
        assert!(!is_direct_sub_account(&account("xgoods.testnet"), &parent));
    }
}
