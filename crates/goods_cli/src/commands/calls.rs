use serde::Serialize;

use goods_chain::contracts::{
    AddZone, ChangeRockPrice, InitHolderMetaverse, InitImoFee, InitRocksMetaverse, MintRock,
    NftContractMetadata, NftCreate, Role, RockPurchaseFee, Royalties, TokenMetadata, U128,
    UpdateContractMetadata, UpdateMintedTokenMetadata, UpdateRoyalties, UpdateTokenMetadata,
    UpdateTokenPrice, UserMint, Zone,
};
use goods_chain::{ChainClient, ContractKind, ContractProxy, ONE_YOCTO};
use goods_core::GoodsError;
use tracing::warn;

use super::{Report, STORAGE_DEPOSIT, Session, optional_file, required_file};
use crate::args::{ArgError, Resolver, vars};
use crate::cli::{Command, Target};

use ContractKind::{CollectionHolder, Environments, Rocks};

/// One change call against the command's target contract.
struct Call<'s, 'a> {
    session: &'s Session<'a>,
    client: &'s dyn ChainClient,
    target: Target,
}

impl Call<'_, '_> {
    /// Sign and send `method`. `DEPOSIT` overrides `default_deposit`.
    async fn send<A: Serialize + ?Sized>(
        &self,
        kind: ContractKind,
        method: &str,
        args: &A,
        default_deposit: u128,
    ) -> Result<Report, GoodsError> {
        let session = self.session;
        let deposit = session.deposit(default_deposit)?;
        let gas = session.gas()?;
        let (contract_id, signer) = session.target(&self.target)?;

        let proxy = ContractProxy::new(self.client, kind, contract_id.clone(), Some(&signer));
        let result = proxy.call(method, args, deposit, gas).await;
        session.record(method, &contract_id, &result, |outcome| {
            Some(outcome.transaction_hash.clone())
        });
        let outcome = result?;

        // The transaction has landed; an undecodable result is shown as text.
        let value = outcome.json().unwrap_or_else(|e| {
            warn!(
                method,
                tx = %outcome.transaction_hash,
                "call result is not JSON: {e}"
            );
            serde_json::Value::String(String::from_utf8_lossy(&outcome.return_value).into_owned())
        });

        Ok(Report::Transaction {
            method: method.to_string(),
            tx: session.tx(&outcome),
            value,
            contract_id,
        })
    }
}

/// Change calls. Gated setters attach 1 yoctoNEAR by default, calls that
/// store data attach [`STORAGE_DEPOSIT`].
pub(super) async fn run_call(
    session: &Session<'_>,
    client: &dyn ChainClient,
    command: Command,
) -> Result<Report, GoodsError> {
    let r = session.resolver();
    let call = |target: Target| Call {
        session,
        client,
        target,
    };

    match command {
        Command::ChangeRole {
            kind,
            role,
            new_account_id,
            target,
        } => {
            let role = Role::from(role);
            let var = match role {
                Role::Admin => vars::ADMIN_ID,
                Role::Operator => vars::OPERATOR_ID,
                Role::Treasury => vars::TREASURY_ID,
            };
            let new_id = r.account("new account id", new_account_id.as_deref(), &[var])?;
            call(target)
                .send(kind.into(), role.method(), &role.args(&new_id), ONE_YOCTO)
                .await
        }
        Command::UpdateContractMetadata {
            kind,
            metadata,
            target,
        } => {
            let metadata: NftContractMetadata =
                required_file(session, "contract metadata file", metadata.as_deref())?;
            let args = UpdateContractMetadata {
                updated_contract_metadata: metadata,
            };
            call(target)
                .send(kind.into(), "update_contract_metadata", &args, ONE_YOCTO)
                .await
        }
        Command::UpdateRoyalties {
            kind,
            nft_type_id,
            royalties,
            target,
        } => {
            let updated_royalties: Royalties =
                required_file(session, "royalties file", royalties.as_deref())?;
            let args = UpdateRoyalties {
                nft_type_id: r.require("NFT type id", nft_type_id.as_deref(), &[])?,
                updated_royalties,
            };
            call(target)
                .send(kind.into(), "update_royalties", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::InitMetaverse {
            metaverse_id,
            external_nft_contract,
            amount_center_rock,
            amount_public_rock,
            price_center_rock,
            price_public_rock,
            target,
        } => {
            let args = InitRocksMetaverse {
                metaverse_id: metaverse(&r, metaverse_id)?,
                external_nft_contract: r.require(
                    "external NFT contract",
                    external_nft_contract.as_deref(),
                    &[],
                )?,
                amount_center_rock: r.number(
                    "center rock amount",
                    amount_center_rock.as_deref(),
                    &[],
                    0,
                )?,
                amount_public_rock: r.number(
                    "public rock amount",
                    amount_public_rock.as_deref(),
                    &[vars::PUBLIC_TOTAL_SUPPLY],
                    0,
                )?,
                price_center_rock: U128(r.amount(
                    "center rock price",
                    price_center_rock.as_deref(),
                    &[],
                    0,
                )?),
                price_public_rock: U128(r.amount(
                    "public rock price",
                    price_public_rock.as_deref(),
                    &[vars::PUBLIC_PRICE],
                    0,
                )?),
            };
            call(target)
                .send(Rocks, "init_metaverse", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::InitMetaverseZone {
            metaverse_id,
            zone,
            target,
        } => {
            let args = InitHolderMetaverse {
                metaverse_id: metaverse(&r, metaverse_id)?,
                zone2: required_file::<Zone>(session, "zone file", zone.as_deref())?,
            };
            args.validate()
                .map_err(|reason| GoodsError::Input(format!("zone file: {reason}")))?;
            call(target)
                .send(CollectionHolder, "init_metaverse", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::AddZone {
            metaverse_id,
            zone,
            target,
        } => {
            let args = AddZone {
                metaverse_id: metaverse(&r, metaverse_id)?,
                zone: required_file(session, "zone file", zone.as_deref())?,
            };
            call(target)
                .send(CollectionHolder, "add_zone", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::MintRock {
            metaverse_id,
            zone_index,
            rock_index,
            receiver_id,
            token_metadata,
            target,
        } => {
            let args = MintRock {
                metaverse_id: metaverse(&r, metaverse_id)?,
                zone_index: r.required_number("zone index", zone_index.as_deref(), &[])?,
                rock_index: r.required_number("rock index", rock_index.as_deref(), &[])?,
                receiver_id: r.account("receiver account", receiver_id.as_deref(), &[])?,
                token_metadata: optional_file(
                    session,
                    "token metadata",
                    token_metadata.as_deref(),
                )?,
            };
            call(target)
                .send(CollectionHolder, "mint_rock", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::UserMint {
            metaverse_id,
            rock_id,
            receiver_id,
            token_metadata,
            target,
        } => {
            let args = UserMint {
                metaverse_id: metaverse(&r, metaverse_id)?,
                rock_id: r.require("rock id", rock_id.as_deref(), &[])?,
                receiver_id: r.account("receiver account", receiver_id.as_deref(), &[])?,
                token_metadata: optional_file(
                    session,
                    "token metadata",
                    token_metadata.as_deref(),
                )?,
            };
            call(target)
                .send(Rocks, "user_mint", &args, STORAGE_DEPOSIT)
                .await
        }
        Command::NftCreate {
            receiver_id,
            target,
        } => {
            let args = NftCreate {
                receiver_id: r.account("receiver account", receiver_id.as_deref(), &[])?,
            };
            // Buyers pay the token price on top of storage; operators mint for free.
            let price = r.amount("token price", None, &[vars::TOKEN_PRICE], 0)?;
            let deposit = price
                .checked_add(STORAGE_DEPOSIT)
                .ok_or_else(|| ArgError::InvalidAmount {
                    name: "token price",
                    reason: format!("{price} yoctoNEAR plus the storage deposit overflows"),
                })?;
            call(target)
                .send(Environments, "nft_create", &args, deposit)
                .await
        }
        Command::UpdateTokenPrice { price, target } => {
            let args = UpdateTokenPrice {
                updated_price: required_amount(&r, "token price", price, &[vars::TOKEN_PRICE])?,
            };
            call(target)
                .send(Environments, "update_token_price", &args, ONE_YOCTO)
                .await
        }
        Command::UpdateTokenMetadata {
            token_metadata,
            target,
        } => {
            let metadata: TokenMetadata =
                required_file(session, "token metadata file", token_metadata.as_deref())?;
            let args = UpdateTokenMetadata {
                updated_token_metadata: metadata,
            };
            call(target)
                .send(Environments, "update_token_metadata", &args, ONE_YOCTO)
                .await
        }
        Command::UpdateMintedTokenMetadata {
            token_id,
            token_metadata,
            target,
        } => {
            let args = UpdateMintedTokenMetadata {
                token_id: r.require("token id", token_id.as_deref(), &[])?,
                updated_token_metadata: required_file(
                    session,
                    "token metadata file",
                    token_metadata.as_deref(),
                )?,
            };
            call(target)
                .send(Environments, "update_minted_token_metadata", &args, ONE_YOCTO)
                .await
        }
        Command::UpdateInitImoFee { fee, target } => {
            let fee = required_amount(&r, "init IMO fee", fee, &[vars::INIT_IMO_FEE])?;
            let args = InitImoFee {
                init_imo_fee: U128(fee),
            };
            call(target)
                .send(CollectionHolder, "update_init_imo_fee", &args, ONE_YOCTO)
                .await
        }
        Command::ChangeRockPurchaseFee { fee, target } => {
            let args = RockPurchaseFee {
                rock_purchase_fee: r.required_number(
                    "rock purchase fee",
                    fee.as_deref(),
                    &[vars::ROCK_PURCHASE_FEE],
                )?,
            };
            call(target)
                .send(CollectionHolder, "change_rock_purchase_fee", &args, ONE_YOCTO)
                .await
        }
        Command::ChangeRockPrice {
            metaverse_id,
            zone_index,
            price,
            target,
        } => {
            let args = ChangeRockPrice {
                metaverse_id: metaverse(&r, metaverse_id)?,
                zone_index: r.required_number("zone index", zone_index.as_deref(), &[])?,
                price: U128(required_amount(&r, "rock price", price, &[vars::PUBLIC_PRICE])?),
            };
            call(target)
                .send(
                    CollectionHolder,
                    "change_nft_collection_rock_price",
                    &args,
                    ONE_YOCTO,
                )
                .await
        }
        other => Err(GoodsError::Internal(format!(
            "{} is not a contract call",
            other.name()
        ))),
    }
}

pub(super) async fn view(
    session: &Session<'_>,
    client: &dyn ChainClient,
    kind: ContractKind,
    method: String,
    args: Option<String>,
    contract: Option<String>,
) -> Result<Report, GoodsError> {
    let args = session
        .resolver()
        .json("view arguments", args.as_deref(), serde_json::json!({}))?;
    let contract_id = session.contract_id(contract.as_deref())?;

    let proxy = ContractProxy::new(client, kind, contract_id.clone(), None);
    let value = proxy.view(&method, &args).await?;
    Ok(Report::View {
        contract_id,
        method,
        value,
    })
}

fn metaverse(r: &Resolver<'_>, positional: Option<String>) -> Result<String, ArgError> {
    r.require("metaverse id", positional.as_deref(), &[vars::METAVERSE_ID])
}

fn required_amount(
    r: &Resolver<'_>,
    name: &'static str,
    positional: Option<String>,
    vars: &[&str],
) -> Result<u128, ArgError> {
    let raw = r.require(name, positional.as_deref(), vars)?;
    r.amount(name, Some(&raw), &[], 0)
}
