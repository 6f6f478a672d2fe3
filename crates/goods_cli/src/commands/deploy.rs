use std::path::PathBuf;

use goods_chain::contracts::{
    CollectionHolderInit, EnvironmentsInit, NftContractMetadata, Roles, RocksInit, Royalties,
    TokenMetadata, U128, contract_metadata_or_placeholder, read_json_file,
};
use goods_chain::{ChainClient, InitArgs, deploy};
use goods_core::GoodsError;
use tracing::warn;

use super::{Report, Session, optional_file};
use crate::args::vars;
use crate::cli::DeployArgs;

pub(super) async fn deploy_rocks(
    session: &Session<'_>,
    client: &dyn ChainClient,
    args: DeployArgs,
) -> Result<Report, GoodsError> {
    deploy_with_init(session, client, &args, |roles, metadata| {
        Ok(InitArgs::Rocks(RocksInit { roles, metadata }))
    })
    .await
}

pub(super) async fn deploy_collection_holder(
    session: &Session<'_>,
    client: &dyn ChainClient,
    args: DeployArgs,
    init_imo_fee: Option<String>,
    rock_purchase_fee: Option<String>,
    init_imo_nft_holder_size: Option<String>,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let init_imo_fee = r.amount("init IMO fee", init_imo_fee.as_deref(), &[vars::INIT_IMO_FEE], 0)?;
    let rock_purchase_fee: u32 = r.number(
        "rock purchase fee",
        rock_purchase_fee.as_deref(),
        &[vars::ROCK_PURCHASE_FEE],
        0,
    )?;
    let init_imo_nft_holder_size: u32 = r.number(
        "init IMO NFT holder size",
        init_imo_nft_holder_size.as_deref(),
        &[vars::INIT_IMO_NFT_HOLDER_SIZE],
        0,
    )?;

    deploy_with_init(session, client, &args, |roles, metadata| {
        Ok(InitArgs::CollectionHolder(CollectionHolderInit {
            roles,
            init_imo_fee: U128(init_imo_fee),
            rock_purchase_fee,
            init_imo_nft_holder_size,
            metadata,
        }))
    })
    .await
}

pub(super) async fn deploy_environments(
    session: &Session<'_>,
    client: &dyn ChainClient,
    args: DeployArgs,
    max_supply: Option<String>,
    token_price: Option<String>,
    token_metadata: Option<PathBuf>,
    royalties: Option<PathBuf>,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let max_supply: u64 = r.number(
        "max supply",
        max_supply.as_deref(),
        &[vars::PUBLIC_TOTAL_SUPPLY],
        0,
    )?;
    if max_supply == 0 {
        warn!("Max supply is 0; nft_create will always fail on this contract");
    }
    let token_price = r.amount(
        "token price",
        token_price.as_deref(),
        &[vars::TOKEN_PRICE, vars::PUBLIC_PRICE],
        0,
    )?;
    let token_metadata: TokenMetadata =
        optional_file(session, "token metadata", token_metadata.as_deref())?;
    let init_royalties = match r.path(royalties.as_deref(), &[]) {
        Some(path) => Some(read_json_file::<Royalties>(&path)?),
        None => None,
    };

    deploy_with_init(session, client, &args, |roles, metadata| {
        Ok(InitArgs::Environments(EnvironmentsInit {
            roles,
            max_supply,
            metadata,
            token_price,
            token_metadata,
            init_royalties,
        }))
    })
    .await
}

/// Replace code only. The initializer is never called.
pub(super) async fn upgrade(
    session: &Session<'_>,
    client: &dyn ChainClient,
    wasm: Option<PathBuf>,
    contract: Option<String>,
) -> Result<Report, GoodsError> {
    let wasm = session
        .resolver()
        .required_path("contract wasm", wasm.as_deref(), &[])?;
    let contract_id = session.contract_id(contract.as_deref())?;
    let gas = session.gas()?;
    let signer = session.keystore.require_key(&contract_id)?;

    let result = deploy(client, &signer, &wasm, None, gas).await;
    session.record("upgrade", &contract_id, &result, |d| {
        Some(d.deploy.transaction_hash.clone())
    });
    let deployment = result?;

    Ok(Report::Deployment {
        deploy: session.tx(&deployment.deploy),
        init: None,
        contract_id: deployment.contract_id,
        code_size: deployment.code_size,
    })
}

/// Resolve the shared deploy arguments, build the init args, then deploy
/// and initialize. The contract account signs both transactions.
async fn deploy_with_init(
    session: &Session<'_>,
    client: &dyn ChainClient,
    args: &DeployArgs,
    build: impl FnOnce(Roles, NftContractMetadata) -> Result<InitArgs, GoodsError>,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let wasm = r.required_path("contract wasm", args.wasm.as_deref(), &[])?;
    let contract_id = session.contract_id(args.contract.as_deref())?;

    let admin_id = r.string_or(args.admin_id.as_deref(), &[vars::ADMIN_ID], "");
    let operator_id = r.string_or(args.operator_id.as_deref(), &[vars::OPERATOR_ID], "");
    let treasury_id = r.string_or(args.treasury_id.as_deref(), &[vars::TREASURY_ID], "");
    let roles = Roles::resolve(&admin_id, &operator_id, &treasury_id, &contract_id)?;

    let metadata_path = r.path(args.metadata.as_deref(), &[]);
    let metadata = contract_metadata_or_placeholder(metadata_path.as_deref(), &contract_id)?;
    let init = build(roles, metadata)?;

    let gas = session.gas()?;
    let signer = session.keystore.require_key(&contract_id)?;

    let result = deploy(client, &signer, &wasm, Some(&init), gas).await;
    session.record("deploy", &contract_id, &result, |d| {
        Some(d.deploy.transaction_hash.clone())
    });
    let deployment = result?;
    let deploy_tx = session.tx(&deployment.deploy);
    let init = match &deployment.init {
        Some(result) => {
            session.record("init", &contract_id, result, |o| Some(o.transaction_hash.clone()));
            match result {
                Ok(outcome) => Some(session.tx(outcome)),
                Err(e) => {
                    return Err(GoodsError::Execution(format!(
                        "code was deployed to {contract_id} in {} ({}) but initialization \
                         failed: {e}",
                        deploy_tx.hash, deploy_tx.url
                    )));
                }
            }
        }
        None => None,
    };

    Ok(Report::Deployment {
        deploy: deploy_tx,
        init,
        contract_id: deployment.contract_id,
        code_size: deployment.code_size,
    })
}
