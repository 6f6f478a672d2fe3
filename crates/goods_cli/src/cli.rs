use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use goods_chain::ContractKind;
use goods_chain::contracts::Role;

/// Migration tooling for the goods NEAR contracts.
///
/// Every positional argument may be left out and supplied through the
/// environment variable named in its help text instead.
#[derive(Debug, Parser)]
#[command(name = "goods", author, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContractArg {
    Rocks,
    CollectionHolder,
    Environments,
}

impl From<ContractArg> for ContractKind {
    fn from(arg: ContractArg) -> Self {
        match arg {
            ContractArg::Rocks => ContractKind::Rocks,
            ContractArg::CollectionHolder => ContractKind::CollectionHolder,
            ContractArg::Environments => ContractKind::Environments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Operator,
    Treasury,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Operator => Role::Operator,
            RoleArg::Treasury => Role::Treasury,
        }
    }
}

/// Contract account and the account that signs the call.
#[derive(Debug, Clone, Default, Args)]
pub struct Target {
    /// Contract account [env: CONTRACT_ACCOUNT]
    pub contract: Option<String>,
    /// Signing account [env: SIGNER_ACCOUNT]
    pub signer: Option<String>,
}

/// Arguments shared by the deploy commands.
#[derive(Debug, Clone, Default, Args)]
pub struct DeployArgs {
    /// Compiled contract (.wasm)
    pub wasm: Option<PathBuf>,
    /// Account to deploy to; signs the deploy [env: CONTRACT_ACCOUNT]
    pub contract: Option<String>,
    /// Contract metadata JSON file
    pub metadata: Option<PathBuf>,
    /// [env: ADMIN_ID, default: contract account]
    pub admin_id: Option<String>,
    /// [env: OPERATOR_ID, default: contract account]
    pub operator_id: Option<String>,
    /// [env: TREASURY_ID, default: contract account]
    pub treasury_id: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account funded by CREATOR_ACCOUNT_ID and store its new key
    CreateAccount {
        /// Account to create
        account_id: Option<String>,
        /// Initial balance in NEAR, or yoctoNEAR with a `yocto` suffix [env: DEPOSIT, default: 1]
        deposit: Option<String>,
    },
    /// Delete an account on chain, sending its balance to a beneficiary
    DeleteAccount {
        account_id: Option<String>,
        /// [env: BENEFICIARY_ID, then CREATOR_ACCOUNT_ID]
        beneficiary_id: Option<String>,
    },
    /// Remove an account's key from the local key store
    DeleteKey { account_id: Option<String> },
    /// List accounts with a key in the local key store
    ListKeys,
    /// Deploy and initialize the rocks contract
    DeployRocks {
        #[command(flatten)]
        deploy: DeployArgs,
    },
    /// Deploy and initialize the rock NFT collection holder contract
    DeployCollectionHolder {
        #[command(flatten)]
        deploy: DeployArgs,
        /// Fee per IMO rock in NEAR [env: INIT_IMO_FEE, default: 0]
        init_imo_fee: Option<String>,
        /// Purchase fee in units of 0.01% [env: ROCK_PURCHASE_FEE, default: 0]
        rock_purchase_fee: Option<String>,
        /// NFT holder zone size [env: INIT_IMO_NFT_HOLDER_SIZE, default: 0]
        init_imo_nft_holder_size: Option<String>,
    },
    /// Deploy and initialize the environments contract
    DeployEnvironments {
        #[command(flatten)]
        deploy: DeployArgs,
        /// [env: PUBLIC_TOTAL_SUPPLY, default: 0]
        max_supply: Option<String>,
        /// Token price in NEAR [env: TOKEN_PRICE, then PUBLIC_PRICE, default: 0]
        token_price: Option<String>,
        /// Token metadata JSON file
        token_metadata: Option<PathBuf>,
        /// Royalties JSON file ({ "account": basis_points })
        royalties: Option<PathBuf>,
    },
    /// Replace a contract's code without calling its initializer
    Upgrade {
        wasm: Option<PathBuf>,
        /// [env: CONTRACT_ACCOUNT]
        contract: Option<String>,
    },
    /// Change the admin, operator or treasury of a contract
    ChangeRole {
        #[arg(value_enum)]
        kind: ContractArg,
        #[arg(value_enum)]
        role: RoleArg,
        new_account_id: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Replace a contract's NFT metadata from a JSON file
    UpdateContractMetadata {
        #[arg(value_enum)]
        kind: ContractArg,
        metadata: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Set the royalties of an NFT type from a JSON file
    UpdateRoyalties {
        #[arg(value_enum)]
        kind: ContractArg,
        nft_type_id: Option<String>,
        royalties: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Register a metaverse on the rocks contract
    InitMetaverse {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        external_nft_contract: Option<String>,
        amount_center_rock: Option<String>,
        /// [env: PUBLIC_TOTAL_SUPPLY]
        amount_public_rock: Option<String>,
        /// In NEAR
        price_center_rock: Option<String>,
        /// In NEAR [env: PUBLIC_PRICE]
        price_public_rock: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Register a metaverse and its NFT holder zone on the collection holder
    InitMetaverseZone {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        /// Zone JSON file
        zone: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Add a zone to a metaverse on the collection holder
    AddZone {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        /// Zone JSON file
        zone: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Mint a rock from a zone on the collection holder
    MintRock {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        zone_index: Option<String>,
        rock_index: Option<String>,
        receiver_id: Option<String>,
        /// Token metadata JSON file
        token_metadata: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Mint a rock on the rocks contract
    UserMint {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        rock_id: Option<String>,
        receiver_id: Option<String>,
        /// Token metadata JSON file
        token_metadata: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Mint the next environment NFT
    NftCreate {
        receiver_id: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Set the environments token price
    UpdateTokenPrice {
        /// In NEAR [env: TOKEN_PRICE]
        price: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Replace the metadata used for future environment tokens
    UpdateTokenMetadata {
        /// Token metadata JSON file
        token_metadata: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Replace the metadata of an already minted environment token
    UpdateMintedTokenMetadata {
        token_id: Option<String>,
        /// Token metadata JSON file
        token_metadata: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },
    /// Set the collection holder IMO fee
    UpdateInitImoFee {
        /// In NEAR [env: INIT_IMO_FEE]
        fee: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Set the collection holder rock purchase fee
    ChangeRockPurchaseFee {
        /// In units of 0.01% [env: ROCK_PURCHASE_FEE]
        fee: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Set the rock price of an NFT holder zone
    ChangeRockPrice {
        /// [env: METAVERSE_ID]
        metaverse_id: Option<String>,
        zone_index: Option<String>,
        /// In NEAR [env: PUBLIC_PRICE]
        price: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Call a view method and print its JSON result
    View {
        #[arg(value_enum)]
        kind: ContractArg,
        method: String,
        /// JSON arguments [default: {}]
        args: Option<String>,
        /// [env: CONTRACT_ACCOUNT]
        contract: Option<String>,
    },
    /// List known networks and their endpoints
    Networks,
}

impl Command {
    /// Name used in logs and the journal.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateAccount { .. } => "create-account",
            Command::DeleteAccount { .. } => "delete-account",
            Command::DeleteKey { .. } => "delete-key",
            Command::ListKeys => "list-keys",
            Command::DeployRocks { .. } => "deploy-rocks",
            Command::DeployCollectionHolder { .. } => "deploy-collection-holder",
            Command::DeployEnvironments { .. } => "deploy-environments",
            Command::Upgrade { .. } => "upgrade",
            Command::ChangeRole { .. } => "change-role",
            Command::UpdateContractMetadata { .. } => "update-contract-metadata",
            Command::UpdateRoyalties { .. } => "update-royalties",
            Command::InitMetaverse { .. } => "init-metaverse",
            Command::InitMetaverseZone { .. } => "init-metaverse-zone",
            Command::AddZone { .. } => "add-zone",
            Command::MintRock { .. } => "mint-rock",
            Command::UserMint { .. } => "user-mint",
            Command::NftCreate { .. } => "nft-create",
            Command::UpdateTokenPrice { .. } => "update-token-price",
            Command::UpdateTokenMetadata { .. } => "update-token-metadata",
            Command::UpdateMintedTokenMetadata { .. } => "update-minted-token-metadata",
            Command::UpdateInitImoFee { .. } => "update-init-imo-fee",
            Command::ChangeRockPurchaseFee { .. } => "change-rock-purchase-fee",
            Command::ChangeRockPrice { .. } => "change-rock-price",
            Command::View { .. } => "view",
            Command::Networks => "networks",
        }
    }

    /// Whether the command only touches local state.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Command::DeleteKey { .. } | Command::ListKeys | Command::Networks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_positionals_in_order() {
        let cli =
            Cli::try_parse_from(["goods", "deploy-rocks", "rocks.wasm", "demo-contract"]).unwrap();
        match cli.command {
            Command::DeployRocks { deploy } => {
                assert_eq!(deploy.wasm, Some(PathBuf::from("rocks.wasm")));
                assert_eq!(deploy.contract.as_deref(), Some("demo-contract"));
                assert!(deploy.metadata.is_none());
                assert!(deploy.admin_id.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn every_positional_is_optional() {
        let cli = Cli::try_parse_from(["goods", "init-metaverse"]).unwrap();
        assert_eq!(cli.command.name(), "init-metaverse");
    }

    #[test]
    fn change_role_parses_enums() {
        let cli = Cli::try_parse_from([
            "goods",
            "change-role",
            "collection-holder",
            "treasury",
            "vault.testnet",
            "holder.testnet",
            "admin.testnet",
        ])
        .unwrap();
        match cli.command {
            Command::ChangeRole {
                kind,
                role,
                new_account_id,
                target,
            } => {
                assert_eq!(kind, ContractArg::CollectionHolder);
                assert_eq!(role, RoleArg::Treasury);
                assert_eq!(new_account_id.as_deref(), Some("vault.testnet"));
                assert_eq!(target.contract.as_deref(), Some("holder.testnet"));
                assert_eq!(target.signer.as_deref(), Some("admin.testnet"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_contract_kind_is_rejected() {
        assert!(Cli::try_parse_from(["goods", "view", "bananas", "get_admin"]).is_err());
    }

    #[test]
    fn local_commands() {
        assert!(Command::ListKeys.is_local());
        assert!(!Command::Upgrade { wasm: None, contract: None }.is_local());
    }
}
