use std::fmt;
use std::str::FromStr;

use ethers_core::types::Address;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid wallet address format")]
    InvalidFormat,
}

/// A wallet identifier matching `^0x[a-fA-F0-9]{40}$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletAddress(Address);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, WalletError> {
        let hex = raw.strip_prefix("0x").ok_or(WalletError::InvalidFormat)?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidFormat);
        }
        Address::from_str(hex)
            .map(Self)
            .map_err(|_| WalletError::InvalidFormat)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl FromStr for WalletAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
