//! Command execution: resolve parameters, guard the network, then hand off
//! to the account manager or the contract invoker.

mod account;
mod calls;
mod deploy;

use std::path::PathBuf;
use std::sync::Arc;

use goods_chain::contracts::read_json_file;
use goods_chain::{
    AccountId, ChainClient, ChainError, KeyStore, Network, NetworkProfile, ONE_NEAR, Outcome,
    StoredKey,
};
use goods_core::{GoodsConfig, GoodsError, Journal, JournalEntry};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::args::{ArgError, Env, Resolver, vars};
use crate::cli::{Command, Target};

/// Attached by default to calls that pay for storage.
pub const STORAGE_DEPOSIT: u128 = ONE_NEAR / 10;

/// Builds the chain client for a resolved network. Only called once the
/// network guard has passed.
pub type Connector<'c> = dyn Fn(&NetworkProfile) -> Arc<dyn ChainClient> + 'c;

/// A transaction and its explorer page.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRef {
    pub hash: String,
    pub url: String,
}

/// What a command did, for printing.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Transaction {
        method: String,
        contract_id: AccountId,
        tx: TxRef,
        value: serde_json::Value,
    },
    Deployment {
        contract_id: AccountId,
        code_size: usize,
        deploy: TxRef,
        init: Option<TxRef>,
    },
    AccountCreated {
        account_id: AccountId,
        public_key: String,
        key_path: PathBuf,
        tx: TxRef,
    },
    AccountDeleted {
        account_id: AccountId,
        beneficiary_id: AccountId,
        tx: TxRef,
    },
    View {
        contract_id: AccountId,
        method: String,
        value: serde_json::Value,
    },
    KeyRemoved {
        account_id: AccountId,
        removed: bool,
    },
    Keys {
        network: Network,
        dir: PathBuf,
        accounts: Vec<AccountId>,
    },
    Networks(Vec<NetworkProfile>),
}

/// Everything one command runs against.
pub struct Session<'a> {
    pub env: &'a Env,
    pub config: &'a GoodsConfig,
    pub profile: NetworkProfile,
    pub keystore: KeyStore,
    pub journal: &'a Journal,
}

impl<'a> Session<'a> {
    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.env)
    }

    pub fn gas(&self) -> Result<u64, ArgError> {
        self.resolver().gas(self.config.default_gas_tgas)
    }

    /// `DEPOSIT`, or `default` yoctoNEAR.
    pub fn deposit(&self, default: u128) -> Result<u128, ArgError> {
        self.resolver()
            .amount("deposit", None, &[vars::DEPOSIT], default)
    }

    pub fn contract_id(&self, positional: Option<&str>) -> Result<AccountId, ArgError> {
        self.resolver()
            .account("contract account", positional, &[vars::CONTRACT_ACCOUNT])
    }

    /// Resolve the signer and load its key.
    pub fn signer(&self, positional: Option<&str>) -> Result<StoredKey, GoodsError> {
        let signer_id =
            self.resolver()
                .account("signer account", positional, &[vars::SIGNER_ACCOUNT])?;
        Ok(self.keystore.require_key(&signer_id)?)
    }

    pub fn target(&self, target: &Target) -> Result<(AccountId, StoredKey), GoodsError> {
        let contract_id = self.contract_id(target.contract.as_deref())?;
        let signer = self.signer(target.signer.as_deref())?;
        Ok((contract_id, signer))
    }

    pub fn tx(&self, outcome: &Outcome) -> TxRef {
        TxRef {
            hash: outcome.transaction_hash.clone(),
            url: self.profile.transaction_url(&outcome.transaction_hash),
        }
    }

    /// Append the result of one outbound operation to the journal.
    ///
    /// Journal write failures are logged and otherwise ignored.
    pub fn record<T>(
        &self,
        operation: &str,
        target: &AccountId,
        result: &Result<T, ChainError>,
        tx_hash: impl FnOnce(&T) -> Option<String>,
    ) {
        let network = self.profile.id();
        let entry = match result {
            Ok(value) => {
                let entry = JournalEntry::success(network, operation, target.as_str());
                match tx_hash(value) {
                    Some(hash) => entry.with_transaction(hash),
                    None => entry,
                }
            }
            Err(err) => JournalEntry::failure(network, operation, target.as_str(), err.to_string()),
        };
        if let Err(e) = self.journal.record(&entry) {
            warn!("Failed to write journal entry: {e:#}");
        }
    }
}

/// Read a JSON input file named by a required positional argument.
pub(crate) fn required_file<T: DeserializeOwned>(
    session: &Session<'_>,
    name: &'static str,
    positional: Option<&std::path::Path>,
) -> Result<T, GoodsError> {
    let path = session.resolver().required_path(name, positional, &[])?;
    Ok(read_json_file(&path)?)
}

/// Read an optional JSON input file, falling back to `T::default()` with a warning.
pub(crate) fn optional_file<T: DeserializeOwned + Default>(
    session: &Session<'_>,
    name: &'static str,
    positional: Option<&std::path::Path>,
) -> Result<T, GoodsError> {
    match session.resolver().path(positional, &[]) {
        Some(path) => Ok(read_json_file(&path)?),
        None => {
            warn!("No {name} file given, using empty {name}");
            Ok(T::default())
        }
    }
}

/// Network from `NETWORK`, else the configured default. Unknown ids fail here,
/// before any key store or client exists.
pub fn resolve_profile(env: &Env, config: &GoodsConfig) -> Result<NetworkProfile, GoodsError> {
    let id = Resolver::new(env).string_or(None, &[vars::NETWORK], &config.default_network);
    Ok(NetworkProfile::lookup(&id, config)?)
}

/// Execute one command.
pub async fn run(
    command: Command,
    env: &Env,
    config: &GoodsConfig,
    journal: &Journal,
    connect: &Connector<'_>,
) -> Result<Report, GoodsError> {
    if let Command::Networks = command {
        let profiles = Network::ALL
            .iter()
            .map(|n| NetworkProfile::lookup(n.id(), config))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Report::Networks(profiles));
    }

    let profile = resolve_profile(env, config)?;
    info!(
        command = command.name(),
        network = %profile.network,
        rpc = %profile.rpc_url,
        "running command"
    );
    let session = Session {
        env,
        config,
        keystore: KeyStore::for_profile(&profile),
        profile,
        journal,
    };

    if command.is_local() {
        return match command {
            Command::DeleteKey { account_id } => {
                account::delete_key(&session, account_id.as_deref())
            }
            _ => account::list_keys(&session),
        };
    }

    let client = connect(&session.profile);
    dispatch(&session, client.as_ref(), command).await
}

async fn dispatch(
    session: &Session<'_>,
    client: &dyn ChainClient,
    command: Command,
) -> Result<Report, GoodsError> {
    match command {
        Command::CreateAccount {
            account_id,
            deposit,
        } => account::create_account(session, client, account_id, deposit).await,
        Command::DeleteAccount {
            account_id,
            beneficiary_id,
        } => account::delete_account(session, client, account_id, beneficiary_id).await,
        Command::DeployRocks { deploy } => deploy::deploy_rocks(session, client, deploy).await,
        Command::DeployCollectionHolder {
            deploy,
            init_imo_fee,
            rock_purchase_fee,
            init_imo_nft_holder_size,
        } => {
            deploy::deploy_collection_holder(
                session,
                client,
                deploy,
                init_imo_fee,
                rock_purchase_fee,
                init_imo_nft_holder_size,
            )
            .await
        }
        Command::DeployEnvironments {
            deploy,
            max_supply,
            token_price,
            token_metadata,
            royalties,
        } => {
            deploy::deploy_environments(
                session,
                client,
                deploy,
                max_supply,
                token_price,
                token_metadata,
                royalties,
            )
            .await
        }
        Command::Upgrade { wasm, contract } => {
            deploy::upgrade(session, client, wasm, contract).await
        }
        Command::View {
            kind,
            method,
            args,
            contract,
        } => calls::view(session, client, kind.into(), method, args, contract).await,
        other => calls::run_call(session, client, other).await,
    }
}

