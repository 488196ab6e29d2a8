//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use thiserror::Error;

/// Errors that can occur while querying balances.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The configured endpoint could not be turned into a client.
    #[error("Invalid RPC endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Address is not a syntactically valid account address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Parse an account address.
///
/// Accepts 40 hex digits with an optional `0x` prefix. All-lowercase and
/// all-uppercase forms are accepted as-is; mixed case must be a valid
/// EIP-55 checksum.
pub fn parse_address(raw: &str) -> BlockchainResult<Address> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BlockchainError::InvalidAddress(
            "expected 40 hexadecimal digits with an optional 0x prefix".to_string(),
        ));
    }

    let address: Address = digits
        .parse()
        .map_err(|e| BlockchainError::InvalidAddress(format!("{e}")))?;

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = address.to_checksum(None);
        if checksummed[2..] != *digits {
            return Err(BlockchainError::InvalidAddress(
                "mixed-case address does not match its EIP-55 checksum".to_string(),
            ));
        }
    }

    Ok(address)
}
