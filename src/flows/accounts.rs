//! Account list and switching: a flattened, keyring-ordered view of the
//! wallet's accounts with optimistic selection against the backend.

use super::OpGuard;
use crate::error::GasdeckError;
use crate::locale::{Localizer, MessageKey};
use crate::models::{AccountRow, ActiveAccount};
use crate::services::AccountService;
use crate::units;
use ethers::types::{Address, U256};
use futures::try_join;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

struct AccountEntry {
    address: Address,
    name: String,
    balance_wei: U256,
}

struct SwitcherState {
    entries: Vec<AccountEntry>,
    selected_index: usize,
    loaded: bool,
}

pub struct AccountSwitcher {
    service: Arc<dyn AccountService>,
    localizer: Arc<dyn Localizer>,
    state: Mutex<SwitcherState>,
    loading: AtomicBool,
    switching: AtomicBool,
    creating: AtomicBool,
    active_tx: watch::Sender<Option<ActiveAccount>>,
}

impl AccountSwitcher {
    pub fn new(service: Arc<dyn AccountService>, localizer: Arc<dyn Localizer>) -> Self {
        let (active_tx, _) = watch::channel(None);
        Self {
            service,
            localizer,
            state: Mutex::new(SwitcherState {
                entries: Vec::new(),
                selected_index: 0,
                loaded: false,
            }),
            loading: AtomicBool::new(false),
            switching: AtomicBool::new(false),
            creating: AtomicBool::new(false),
            active_tx,
        }
    }

    /// Pulls keyrings, identities, balances and the selected address from the
    /// backend and rebuilds the ordered list. Accounts without an identity
    /// entry are dropped; a selected address not in the list falls back to
    /// the first row.
    pub async fn load(&self) -> Result<(), GasdeckError> {
        let _guard = OpGuard::acquire(&self.loading, "account load")?;
        let (entries, selected) = self.fetch_entries().await?;
        let active = {
            let mut state = self.state.lock();
            state.selected_index = entries
                .iter()
                .position(|entry| entry.address == selected)
                .unwrap_or(0);
            state.entries = entries;
            state.loaded = true;
            active_of(&state)
        };
        self.active_tx.send_replace(active);
        Ok(())
    }

    /// Switches to the account at `index`. The local selection moves first so
    /// a host can render the change immediately; if the backend refuses, the
    /// previous selection is restored.
    pub async fn select_account(&self, index: usize) -> Result<ActiveAccount, GasdeckError> {
        let _guard = OpGuard::acquire(&self.switching, "account switch")?;
        let (previous, address) = {
            let mut state = self.state.lock();
            let address = state
                .entries
                .get(index)
                .ok_or(GasdeckError::UnknownAccountIndex(index))?
                .address;
            let previous = state.selected_index;
            state.selected_index = index;
            (previous, address)
        };

        if let Err(err) = self.service.select_address(address).await {
            // Never leave the list pointing at an account the backend did
            // not confirm.
            self.state.lock().selected_index = previous;
            error!("Error while trying to change the selected account: {err}");
            return Err(err);
        }

        let active = ActiveAccount { index, address };
        self.active_tx.send_replace(Some(active));
        Ok(active)
    }

    /// Derives a new account, selects it, and rebuilds the list from the
    /// backend. Any failure leaves the current list and selection in place.
    pub async fn create_account(&self) -> Result<ActiveAccount, GasdeckError> {
        let _guard = OpGuard::acquire(&self.creating, "account creation")?;
        let result = self.create_and_select().await;
        if let Err(err) = &result {
            error!("Error while trying to add a new account: {err}");
        }
        result
    }

    async fn create_and_select(&self) -> Result<ActiveAccount, GasdeckError> {
        let address = self.service.create_account().await?;
        self.service.select_address(address).await?;
        let (entries, _) = self.fetch_entries().await?;
        let active = {
            let mut state = self.state.lock();
            state.selected_index = entries
                .iter()
                .position(|entry| entry.address == address)
                .unwrap_or_else(|| entries.len().saturating_sub(1));
            state.entries = entries;
            active_of(&state)
        };
        self.active_tx.send_replace(active);
        active.ok_or_else(|| {
            GasdeckError::Backend("created account missing from backend state".to_string())
        })
    }

    async fn fetch_entries(&self) -> Result<(Vec<AccountEntry>, Address), GasdeckError> {
        let (keyrings, identities, balances, selected) = try_join!(
            self.service.keyrings(),
            self.service.identities(),
            self.service.balances(),
            self.service.selected_address(),
        )?;
        let entries = keyrings
            .into_iter()
            .flat_map(|keyring| keyring.accounts)
            .filter_map(|address| {
                identities.get(&address).map(|name| AccountEntry {
                    address,
                    name: name.clone(),
                    balance_wei: balances.get(&address).copied().unwrap_or_default(),
                })
            })
            .collect();
        Ok((entries, selected))
    }

    /// The list as a host renders it, top to bottom.
    pub fn rows(&self) -> Vec<AccountRow> {
        let state = self.state.lock();
        let unit = self.localizer.text(MessageKey::UnitEth);
        state
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| AccountRow {
                index,
                address: entry.address,
                name: entry.name.clone(),
                balance_wei: entry.balance_wei,
                balance_text: format!("{} {}", units::format_eth(entry.balance_wei), unit),
                selected: index == state.selected_index,
            })
            .collect()
    }

    pub fn active(&self) -> Option<ActiveAccount> {
        active_of(&self.state.lock())
    }

    pub fn selected_index(&self) -> usize {
        self.state.lock().selected_index
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn is_busy(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
            || self.switching.load(Ordering::SeqCst)
            || self.creating.load(Ordering::SeqCst)
    }

    pub fn title(&self) -> String {
        self.localizer.text(MessageKey::AccountsTitle)
    }

    pub fn create_account_label(&self) -> String {
        self.localizer.text(MessageKey::CreateNewAccount)
    }

    /// Watch the confirmed active account. Rollbacks never publish here; the
    /// channel only carries backend-acknowledged switches.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveAccount>> {
        self.active_tx.subscribe()
    }
}

fn active_of(state: &SwitcherState) -> Option<ActiveAccount> {
    state
        .entries
        .get(state.selected_index)
        .map(|entry| ActiveAccount {
            index: state.selected_index,
            address: entry.address,
        })
}
