use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Formats a chain id the way wallet methods expect it (`0x`-prefixed hex).
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// Native currency block of a `wallet_addEthereumChain` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Chain metadata handed to the wallet so it can register a chain it does not
/// know yet (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParameters {
    #[serde(with = "hex_chain_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

mod hex_chain_id {
    use super::*;

    pub fn serialize<S: Serializer>(chain_id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&chain_id_hex(*chain_id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = String::deserialize(deserializer)?;
        u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
    }
}
