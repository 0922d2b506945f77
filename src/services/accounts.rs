use crate::error::GasdeckError;
use crate::models::Keyring;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Wallet backend surface the account switcher drives. Real hosts bridge
/// this to their keyring and preferences controllers.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn keyrings(&self) -> Result<Vec<Keyring>, GasdeckError>;
    /// Address to display-name map. Accounts without an identity entry are
    /// hidden from the list.
    async fn identities(&self) -> Result<HashMap<Address, String>, GasdeckError>;
    async fn balances(&self) -> Result<HashMap<Address, U256>, GasdeckError>;
    async fn selected_address(&self) -> Result<Address, GasdeckError>;
    async fn select_address(&self, address: Address) -> Result<(), GasdeckError>;
    /// Derives the next account in the primary keyring and returns its
    /// address. Does not change the selected address.
    async fn create_account(&self) -> Result<Address, GasdeckError>;
}

const HD_KEYRING: &str = "HD Key Tree";

struct InMemoryState {
    keyrings: Vec<Keyring>,
    identities: HashMap<Address, String>,
    balances: HashMap<Address, U256>,
    selected: Option<Address>,
    next_index: usize,
    fail_next_select: bool,
    fail_next_create: bool,
}

/// Self-contained backend used by the probe binary and tests. Failures can
/// be injected one call at a time to exercise rollback paths.
pub struct InMemoryAccounts {
    state: Mutex<InMemoryState>,
}

impl InMemoryAccounts {
    /// Backend with `count` derived accounts named `Account 1..=count`, the
    /// first one selected.
    pub fn seeded(count: usize) -> Self {
        let mut accounts = Vec::with_capacity(count);
        let mut identities = HashMap::new();
        let mut balances = HashMap::new();
        for i in 0..count {
            let address = Address::from_low_u64_be(i as u64 + 1);
            accounts.push(address);
            identities.insert(address, format!("Account {}", i + 1));
            balances.insert(address, U256::exp10(18) * U256::from(i as u64));
        }
        Self {
            state: Mutex::new(InMemoryState {
                selected: accounts.first().copied(),
                keyrings: vec![Keyring::new(HD_KEYRING, accounts)],
                identities,
                balances,
                next_index: count,
                fail_next_select: false,
                fail_next_create: false,
            }),
        }
    }

    /// Backend with an explicit keyring layout, for exercising ordering and
    /// identity filtering.
    pub fn with_state(
        keyrings: Vec<Keyring>,
        identities: HashMap<Address, String>,
        balances: HashMap<Address, U256>,
        selected: Address,
    ) -> Self {
        // Derivation continues past the highest address any keyring holds,
        // never inside the existing layout.
        let next_index = keyrings
            .iter()
            .flat_map(|keyring| keyring.accounts.iter())
            .map(|address| address.to_low_u64_be() as usize)
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(InMemoryState {
                keyrings,
                identities,
                balances,
                selected: Some(selected),
                next_index,
                fail_next_select: false,
                fail_next_create: false,
            }),
        }
    }

    pub fn fail_next_select(&self) {
        self.state.lock().fail_next_select = true;
    }

    pub fn fail_next_create(&self) {
        self.state.lock().fail_next_create = true;
    }

    pub fn set_balance(&self, address: Address, wei: U256) {
        self.state.lock().balances.insert(address, wei);
    }
}

#[async_trait]
impl AccountService for InMemoryAccounts {
    async fn keyrings(&self) -> Result<Vec<Keyring>, GasdeckError> {
        Ok(self.state.lock().keyrings.clone())
    }

    async fn identities(&self) -> Result<HashMap<Address, String>, GasdeckError> {
        Ok(self.state.lock().identities.clone())
    }

    async fn balances(&self) -> Result<HashMap<Address, U256>, GasdeckError> {
        Ok(self.state.lock().balances.clone())
    }

    async fn selected_address(&self) -> Result<Address, GasdeckError> {
        self.state
            .lock()
            .selected
            .ok_or_else(|| GasdeckError::Backend("no account selected".to_string()))
    }

    async fn select_address(&self, address: Address) -> Result<(), GasdeckError> {
        let mut state = self.state.lock();
        if state.fail_next_select {
            state.fail_next_select = false;
            return Err(GasdeckError::Backend("injected select failure".to_string()));
        }
        if !state.identities.contains_key(&address) {
            return Err(GasdeckError::Backend(format!("unknown address {address:?}")));
        }
        state.selected = Some(address);
        Ok(())
    }

    async fn create_account(&self) -> Result<Address, GasdeckError> {
        let mut state = self.state.lock();
        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(GasdeckError::Backend("injected create failure".to_string()));
        }
        state.next_index += 1;
        let index = state.next_index;
        let address = Address::from_low_u64_be(index as u64);
        let keyring = state
            .keyrings
            .iter_mut()
            .find(|k| k.kind == HD_KEYRING)
            .ok_or_else(|| GasdeckError::Backend("no HD keyring to derive into".to_string()))?;
        keyring.accounts.push(address);
        state.identities.insert(address, format!("Account {index}"));
        state.balances.insert(address, U256::zero());
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_select_failure_fires_once() {
        let backend = InMemoryAccounts::seeded(2);
        let second = Address::from_low_u64_be(2);

        backend.fail_next_select();
        assert!(backend.select_address(second).await.is_err());
        backend.select_address(second).await.unwrap();
        assert_eq!(backend.selected_address().await.unwrap(), second);
    }

    #[tokio::test]
    async fn creation_never_reuses_a_keyring_address() {
        let named = Address::from_low_u64_be(1);
        let unnamed = Address::from_low_u64_be(2);
        let mut identities = HashMap::new();
        identities.insert(named, "Account 1".to_string());
        let backend = InMemoryAccounts::with_state(
            vec![
                Keyring::new(HD_KEYRING, vec![named]),
                Keyring::new("Ledger Hardware", vec![unnamed]),
            ],
            identities,
            HashMap::new(),
            named,
        );

        let created = backend.create_account().await.unwrap();
        assert_eq!(created, Address::from_low_u64_be(3));

        let held: Vec<Address> = backend
            .keyrings()
            .await
            .unwrap()
            .iter()
            .flat_map(|keyring| keyring.accounts.clone())
            .collect();
        assert_eq!(held.iter().filter(|a| **a == created).count(), 1);
    }

    #[tokio::test]
    async fn created_accounts_join_the_hd_keyring() {
        let backend = InMemoryAccounts::seeded(1);
        let address = backend.create_account().await.unwrap();

        let keyrings = backend.keyrings().await.unwrap();
        assert_eq!(keyrings.len(), 1);
        assert_eq!(keyrings[0].accounts.len(), 2);
        assert_eq!(keyrings[0].accounts[1], address);
        // Creation alone must not move the selection.
        assert_eq!(
            backend.selected_address().await.unwrap(),
            Address::from_low_u64_be(1)
        );
    }
}
