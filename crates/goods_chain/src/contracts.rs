//! The contract interfaces this tool drives, declared once.
//!
//! Every method a command may call is listed on its [`ContractKind`], split
//! into view and change methods. The argument structs serialize to exactly
//! the JSON the contracts' `near_bindgen` methods expect (`U128` values as
//! decimal strings, plain `u128` values as JSON numbers). A few views
//! return borsh instead of JSON; those carry their own decoder.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use borsh::{BorshDeserialize, BorshSerialize};
use near_primitives::types::AccountId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::client::decode_json;
use crate::error::ChainError;

/// NFT metadata spec version the contracts validate against.
pub const NFT_METADATA_SPEC: &str = "nft-1.0.0";

/// Name of the initializer on every contract.
pub const INIT_METHOD: &str = "new";

// ---------------------------------------------------------------------------
// Interface table
// ---------------------------------------------------------------------------

/// The three contracts of the rock/metaverse NFT suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractKind {
    /// Metaverse rocks (`init_metaverse`, `user_mint`).
    Rocks,
    /// Rock NFT collection holder with zones and IMO fees.
    CollectionHolder,
    /// Fixed-supply environment NFTs sold at a token price.
    Environments,
}

/// Turns a borsh view result into JSON for printing.
pub type BorshDecoder = fn(&[u8]) -> Result<serde_json::Value, ChainError>;

/// Method names a contract exposes to this tool.
#[derive(Debug)]
pub struct ContractInterface {
    /// Views returning JSON.
    pub views: &'static [&'static str],
    /// Views marked `#[result_serializer(borsh)]`.
    pub borsh_views: &'static [(&'static str, BorshDecoder)],
    pub changes: &'static [&'static str],
}

impl ContractInterface {
    pub fn has_view(&self, method: &str) -> bool {
        self.views.contains(&method) || self.borsh_decoder(method).is_some()
    }

    fn borsh_decoder(&self, method: &str) -> Option<BorshDecoder> {
        self.borsh_views
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, decoder)| *decoder)
    }

    /// Decode the raw result of a declared view.
    pub fn decode_view(&self, method: &str, bytes: &[u8]) -> Result<serde_json::Value, ChainError> {
        match self.borsh_decoder(method) {
            Some(decoder) => decoder(bytes),
            None => decode_json(bytes),
        }
    }

    pub fn has_change(&self, method: &str) -> bool {
        method == INIT_METHOD || self.changes.contains(&method)
    }
}

const ROCKS: ContractInterface = ContractInterface {
    views: &[
        "get_admin",
        "get_operator",
        "get_treasury",
        "nft_metadata",
        "nft_token",
        "nft_tokens_for_owner",
        "nft_total_supply",
    ],
    borsh_views: &[("get_metaverse_data", MetaverseData::decode)],
    changes: &[
        "change_admin",
        "change_operator",
        "change_treasury",
        "update_royalties",
        "init_metaverse",
        "user_mint",
        "update_contract_metadata",
    ],
};

const COLLECTION_HOLDER: ContractInterface = ContractInterface {
    views: &[
        "get_admin",
        "get_operator",
        "get_treasury",
        "get_zone_info",
        "get_init_imo_fee",
        "nft_metadata",
        "nft_token",
        "nft_tokens_for_owner",
        "nft_total_supply",
    ],
    borsh_views: &[],
    changes: &[
        "change_admin",
        "change_operator",
        "change_treasury",
        "change_rock_purchase_fee",
        "change_init_imo_fee",
        "update_init_imo_fee",
        "change_nft_collection_rock_price",
        "update_royalties",
        "init_metaverse",
        "add_zone",
        "mint_rock",
        "update_contract_metadata",
    ],
};

const ENVIRONMENTS: ContractInterface = ContractInterface {
    views: &[
        "get_admin",
        "get_operator",
        "get_treasury",
        "nft_metadata",
        "nft_token",
        "nft_tokens_for_owner",
        "nft_total_supply",
    ],
    borsh_views: &[],
    changes: &[
        "change_admin",
        "change_operator",
        "change_treasury",
        "nft_create",
        "update_token_price",
        "update_token_metadata",
        "update_minted_token_metadata",
    ],
};

impl ContractKind {
    pub const ALL: [ContractKind; 3] = [
        ContractKind::Rocks,
        ContractKind::CollectionHolder,
        ContractKind::Environments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::Rocks => "rocks",
            ContractKind::CollectionHolder => "collection-holder",
            ContractKind::Environments => "environments",
        }
    }

    pub fn interface(&self) -> &'static ContractInterface {
        match self {
            ContractKind::Rocks => &ROCKS,
            ContractKind::CollectionHolder => &COLLECTION_HOLDER,
            ContractKind::Environments => &ENVIRONMENTS,
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// A `u128` that travels as a decimal string, like `near_sdk::json_types::U128`.
/// In borsh it is a plain little-endian `u128`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, BorshSerialize, BorshDeserialize,
)]
pub struct U128(pub u128);

impl From<u128> for U128 {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for U128 {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for U128 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(d)?;
        s.parse().map(U128).map_err(serde::de::Error::custom)
    }
}

/// NEP-177 contract metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftContractMetadata {
    pub spec: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub base_uri: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub reference_hash: Option<String>,
}

impl NftContractMetadata {
    /// Metadata used when no metadata file was given: named after the contract account.
    pub fn placeholder(contract_id: &AccountId) -> Self {
        let name = contract_id.as_str().split('.').next().unwrap_or_default();
        Self {
            spec: NFT_METADATA_SPEC.into(),
            name: name.to_string(),
            symbol: name.to_ascii_uppercase(),
            icon: None,
            base_uri: None,
            reference: None,
            reference_hash: None,
        }
    }
}

/// NEP-177 token metadata. Every field is optional on chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub media: Option<String>,
    pub media_hash: Option<String>,
    pub copies: Option<u64>,
    pub issued_at: Option<String>,
    pub expires_at: Option<String>,
    pub starts_at: Option<String>,
    pub updated_at: Option<String>,
    pub extra: Option<String>,
    pub reference: Option<String>,
    pub reference_hash: Option<String>,
}

/// A zone of a metaverse on the collection holder contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub zone_index: u16,
    pub price: U128,
    #[serde(default)]
    pub core_team_addr: String,
    #[serde(default)]
    pub collection_addr: String,
    /// 1: core team, 2: NFT holder, 3: public.
    pub type_zone: u8,
    pub rock_index_from: u128,
    pub rock_index_to: u128,
}

/// Royalty split in basis points per account.
pub type Royalties = HashMap<AccountId, u16>;

/// Read and parse a JSON input file (metadata, zone, royalties).
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ChainError> {
    let content = std::fs::read_to_string(path).map_err(|e| ChainError::InputFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ChainError::InputFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read contract metadata from `path`, or fall back to [`NftContractMetadata::placeholder`]
/// with a warning when no path was given.
pub fn contract_metadata_or_placeholder(
    path: Option<&Path>,
    contract_id: &AccountId,
) -> Result<NftContractMetadata, ChainError> {
    match path {
        Some(path) => read_json_file(path),
        None => {
            warn!(
                contract = %contract_id,
                "no contract metadata file given, using placeholder metadata"
            );
            Ok(NftContractMetadata::placeholder(contract_id))
        }
    }
}

// ---------------------------------------------------------------------------
// Initializer arguments
// ---------------------------------------------------------------------------

/// Identities every contract is initialized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub admin_id: AccountId,
    pub operator_id: AccountId,
    pub treasury_id: AccountId,
}

impl Roles {
    /// Build roles from resolved strings. An empty role falls back to
    /// `fallback` (normally the contract account) with a warning naming it.
    pub fn resolve(
        admin_id: &str,
        operator_id: &str,
        treasury_id: &str,
        fallback: &AccountId,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            admin_id: role_or_fallback("admin_id", admin_id, fallback)?,
            operator_id: role_or_fallback("operator_id", operator_id, fallback)?,
            treasury_id: role_or_fallback("treasury_id", treasury_id, fallback)?,
        })
    }
}

fn role_or_fallback(
    role: &str,
    value: &str,
    fallback: &AccountId,
) -> Result<AccountId, ChainError> {
    if value.trim().is_empty() {
        warn!(role, fallback = %fallback, "role not set, defaulting to the contract account");
        return Ok(fallback.clone());
    }
    parse_account_id(value)
}

/// Parse a NEAR account id, mapping the failure to [`ChainError::InvalidAccountId`].
pub fn parse_account_id(value: &str) -> Result<AccountId, ChainError> {
    value
        .trim()
        .parse::<AccountId>()
        .map_err(|e| ChainError::InvalidAccountId {
            id: value.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RocksInit {
    #[serde(flatten)]
    pub roles: Roles,
    pub metadata: NftContractMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionHolderInit {
    #[serde(flatten)]
    pub roles: Roles,
    /// Fee in yoctoNEAR.
    pub init_imo_fee: U128,
    /// In units of 0.01%.
    pub rock_purchase_fee: u32,
    pub init_imo_nft_holder_size: u32,
    pub metadata: NftContractMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentsInit {
    #[serde(flatten)]
    pub roles: Roles,
    pub max_supply: u64,
    pub metadata: NftContractMetadata,
    /// Price in yoctoNEAR, a JSON number on this contract.
    pub token_price: u128,
    pub token_metadata: TokenMetadata,
    pub init_royalties: Option<Royalties>,
}

/// Arguments for a contract's `new` initializer. Serializes as the inner struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InitArgs {
    Rocks(RocksInit),
    CollectionHolder(CollectionHolderInit),
    Environments(EnvironmentsInit),
}

impl InitArgs {
    pub fn kind(&self) -> ContractKind {
        match self {
            InitArgs::Rocks(_) => ContractKind::Rocks,
            InitArgs::CollectionHolder(_) => ContractKind::CollectionHolder,
            InitArgs::Environments(_) => ContractKind::Environments,
        }
    }
}

/// What `get_metaverse_data` returns on the rocks contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, BorshSerialize, BorshDeserialize)]
pub struct MetaverseData {
    pub external_nft_contract: String,
    pub amount_center_rock: u32,
    pub amount_public_rock: u32,
    pub price_center_rock: U128,
    pub price_public_rock: U128,
    pub minted_center_rock: u32,
    pub minted_public_rock: u32,
}

impl MetaverseData {
    fn decode(bytes: &[u8]) -> Result<serde_json::Value, ChainError> {
        let data = Self::try_from_slice(bytes).map_err(|e| {
            ChainError::Execution(format!("undecodable get_metaverse_data result: {e}"))
        })?;
        Ok(serde_json::to_value(data)?)
    }
}

// ---------------------------------------------------------------------------
// Change method arguments
// ---------------------------------------------------------------------------

/// Which role a `change_*` call replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    Treasury,
}

impl Role {
    pub fn method(&self) -> &'static str {
        match self {
            Role::Admin => "change_admin",
            Role::Operator => "change_operator",
            Role::Treasury => "change_treasury",
        }
    }

    fn arg_name(&self) -> &'static str {
        match self {
            Role::Admin => "new_admin_id",
            Role::Operator => "new_operator_id",
            Role::Treasury => "new_treasury_id",
        }
    }

    pub fn args(&self, new_id: &AccountId) -> serde_json::Value {
        serde_json::json!({ self.arg_name(): new_id })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateContractMetadata {
    pub updated_contract_metadata: NftContractMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateRoyalties {
    pub nft_type_id: String,
    pub updated_royalties: Royalties,
}

/// `init_metaverse` on the rocks contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitRocksMetaverse {
    pub metaverse_id: String,
    pub external_nft_contract: String,
    pub amount_center_rock: u32,
    pub amount_public_rock: u32,
    pub price_center_rock: U128,
    pub price_public_rock: U128,
}

/// `init_metaverse` on the collection holder: zone 2 is the NFT-holder zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitHolderMetaverse {
    pub metaverse_id: String,
    #[serde(rename = "_zone2")]
    pub zone2: Zone,
}

impl InitHolderMetaverse {
    /// The checks the contract applies to zone 2, done before paying for a transaction.
    pub fn validate(&self) -> Result<(), String> {
        let zone = &self.zone2;
        if zone.zone_index != 2 {
            return Err("zone 2 must have zone_index 2".into());
        }
        if zone.type_zone != 2 {
            return Err("zone 2 must have type_zone 2".into());
        }
        if zone.price != U128(0) {
            return Err("zone 2 price must be 0".into());
        }
        if zone.rock_index_from != 2 || zone.rock_index_to < zone.rock_index_from {
            return Err("zone 2 rock range must start at 2 and not be empty".into());
        }
        if zone.collection_addr.is_empty() {
            return Err("zone 2 needs a collection_addr".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddZone {
    pub metaverse_id: String,
    #[serde(rename = "_zone")]
    pub zone: Zone,
}

#[derive(Debug, Clone, Serialize)]
pub struct MintRock {
    pub metaverse_id: String,
    pub zone_index: u16,
    pub rock_index: u128,
    pub receiver_id: AccountId,
    pub token_metadata: TokenMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMint {
    pub metaverse_id: String,
    pub rock_id: String,
    pub receiver_id: AccountId,
    pub token_metadata: TokenMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct NftCreate {
    pub receiver_id: AccountId,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTokenPrice {
    pub updated_price: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTokenMetadata {
    pub updated_token_metadata: TokenMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMintedTokenMetadata {
    pub token_id: String,
    pub updated_token_metadata: TokenMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitImoFee {
    pub init_imo_fee: U128,
}

#[derive(Debug, Clone, Serialize)]
pub struct RockPurchaseFee {
    pub rock_purchase_fee: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeRockPrice {
    pub metaverse_id: String,
    pub zone_index: u16,
    pub price: U128,
}
