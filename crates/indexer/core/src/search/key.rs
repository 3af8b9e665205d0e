use crate::SearchError;
use unitscan_types::{B256, hex};

/// A classified search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// An unsigned decimal integer, looked up as a block number.
    BlockNumber(u64),
    /// Decoded hex bytes, looked up as transaction hash, unit id and owner id.
    Bytes(Vec<u8>),
}

impl SearchKey {
    /// Classifies a raw key. Decimal integers win over hex, so `"10"` is a block number.
    ///
    /// # Errors
    /// Fails with [`SearchError::InvalidKey`] when the key is empty or not valid hex.
    pub fn parse(raw: &str) -> Result<Self, SearchError> {
        let raw = raw.trim();
        // `u64::from_str` tolerates a leading `+`, a block number is digits only.
        if raw.bytes().all(|b| b.is_ascii_digit()) &&
            let Ok(block_number) = raw.parse::<u64>()
        {
            return Ok(Self::BlockNumber(block_number));
        }

        let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
        if digits.is_empty() {
            return Err(SearchError::InvalidKey(raw.to_string()));
        }
        let bytes = hex::decode(digits).map_err(|_| SearchError::InvalidKey(raw.to_string()))?;
        Ok(Self::Bytes(bytes))
    }

    /// Returns `true` for keys shaped like a public key hash, which may identify an owner.
    pub fn is_owner_candidate(&self) -> bool {
        matches!(self, Self::Bytes(bytes) if bytes.len() == B256::len_bytes())
    }

    /// Metric label of the key kind.
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::BlockNumber(_) => "block_number",
            Self::Bytes(_) => "hex",
        }
    }
}
