use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

/// One keyring as reported by the wallet backend. Hardware and HD keyrings
/// both flatten into the same account list, in keyring order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyring {
    pub kind: String,
    pub accounts: Vec<Address>,
}

impl Keyring {
    pub fn new(kind: impl Into<String>, accounts: Vec<Address>) -> Self {
        Self {
            kind: kind.into(),
            accounts,
        }
    }
}

/// A fully resolved row of the account list, ready for a host to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub index: usize,
    pub address: Address,
    pub name: String,
    pub balance_wei: U256,
    pub balance_text: String,
    pub selected: bool,
}

impl AccountRow {
    /// EIP-55 mixed-case form for display.
    pub fn checksummed_address(&self) -> String {
        to_checksum(&self.address, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAccount {
    pub index: usize,
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_render_checksummed_addresses() {
        let address: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
            .parse()
            .unwrap();
        let row = AccountRow {
            index: 0,
            address,
            name: "Account 1".to_string(),
            balance_wei: U256::zero(),
            balance_text: "0 ETH".to_string(),
            selected: true,
        };
        assert_eq!(
            row.checksummed_address(),
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
        );
    }
}
