use goods_chain::{AccountManager, ChainClient, ONE_NEAR};
use goods_core::GoodsError;

use super::{Report, Session};
use crate::args::vars;

pub(super) async fn create_account(
    session: &Session<'_>,
    client: &dyn ChainClient,
    account_id: Option<String>,
    deposit: Option<String>,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let new_account_id = r.account("new account id", account_id.as_deref(), &[])?;
    let creator_id = r.account("creator account", None, &[vars::CREATOR_ACCOUNT_ID])?;
    let deposit = r.amount("deposit", deposit.as_deref(), &[vars::DEPOSIT], ONE_NEAR)?;

    let manager = AccountManager::new(client, &session.keystore, &session.profile);
    let result = manager
        .create_account(&creator_id, &new_account_id, deposit)
        .await;
    session.record("create_account", &new_account_id, &result, |created| {
        Some(created.outcome.transaction_hash.clone())
    });
    let created = result?;

    Ok(Report::AccountCreated {
        tx: session.tx(&created.outcome),
        account_id: created.account_id,
        public_key: created.public_key,
        key_path: created.key_path,
    })
}

pub(super) async fn delete_account(
    session: &Session<'_>,
    client: &dyn ChainClient,
    account_id: Option<String>,
    beneficiary_id: Option<String>,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let account_id = r.account("account id", account_id.as_deref(), &[])?;
    let beneficiary_id = r.account(
        "beneficiary account",
        beneficiary_id.as_deref(),
        &[vars::BENEFICIARY_ID, vars::CREATOR_ACCOUNT_ID],
    )?;

    let manager = AccountManager::new(client, &session.keystore, &session.profile);
    let result = manager.delete_account(&account_id, &beneficiary_id).await;
    session.record("delete_account", &account_id, &result, |outcome| {
        Some(outcome.transaction_hash.clone())
    });
    let outcome = result?;

    Ok(Report::AccountDeleted {
        tx: session.tx(&outcome),
        account_id,
        beneficiary_id,
    })
}

pub(super) fn delete_key(
    session: &Session<'_>,
    account_id: Option<&str>,
) -> Result<Report, GoodsError> {
    let account_id = session.resolver().account("account id", account_id, &[])?;
    let removed = session.keystore.remove_key(&account_id)?;
    Ok(Report::KeyRemoved {
        account_id,
        removed,
    })
}

pub(super) fn list_keys(session: &Session<'_>) -> Result<Report, GoodsError> {
    Ok(Report::Keys {
        network: session.profile.network,
        dir: session.keystore.dir(),
        accounts: session.keystore.list_accounts()?,
    })
}
