// crates/fairshare-economics/src/ledger.rs
//
// The FAIR ledger.
//
// Every balance mutation goes through this module. An operation:
//   1. Takes the per-account locks of every wallet it touches, in sorted order.
//   2. Reads the current wallet images and checks its preconditions.
//   3. Builds the new wallet images plus exactly one transaction.
//   4. Commits them to the store as one atomic `LedgerWrite`.
// A failed precondition or commit leaves every balance unchanged and appends
// nothing. Nothing is retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::{
    Account, AccountId, AccountLocks, AccountStore, Clock, CommunityStore, Fair, IssuancePayout,
    LedgerStore, LedgerWrite, Micros, Month, NewAccount, Page, ProfileUpdate, Transaction,
    TransactionKind, Wallet,
};

use crate::fees::{fee_for, FeePolicy, BPS_DENOMINATOR, DEFAULT_FEE_BPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Transfer fee in basis points.
    pub fee_bps: u32,
    pub fee_policy: FeePolicy,
}

impl LedgerConfig {
    pub fn validate(&self) -> FairshareResult<()> {
        if self.fee_bps as u64 > BPS_DENOMINATOR {
            return Err(FairshareError::InvalidValue(format!(
                "fee_bps must be at most {}, got {}",
                BPS_DENOMINATOR, self.fee_bps
            )));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            fee_policy: FeePolicy::Burn,
        }
    }
}

/// Read-only view of one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub account: AccountId,
    pub balance: Fair,
    pub locked: Fair,
    pub spendable: Fair,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            account: wallet.account,
            balance: Fair::from_micros(wallet.balance),
            locked: Fair::from_micros(wallet.locked),
            spendable: Fair::from_micros(wallet.spendable()),
        }
    }
}

fn require_positive(amount: Micros) -> FairshareResult<()> {
    if amount == 0 {
        return Err(FairshareError::InvalidValue(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn insufficient(wallet: &Wallet, requested: Micros) -> FairshareError {
    FairshareError::InsufficientFunds {
        account: wallet.account,
        requested,
        available: wallet.spendable(),
    }
}

fn add_balance(wallet: &mut Wallet, amount: Micros) -> FairshareResult<()> {
    wallet.balance = wallet.balance.checked_add(amount).ok_or_else(|| {
        FairshareError::InvalidValue(format!("balance overflow for {}", wallet.account))
    })?;
    Ok(())
}

pub struct Ledger {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    locks: AccountLocks,
}

impl Ledger {
    pub fn new(store: Arc<dyn CommunityStore>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            locks: AccountLocks::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn require_wallet(&self, account: &AccountId) -> FairshareResult<Wallet> {
        self.store
            .get_wallet(account)
            .await?
            .ok_or(FairshareError::UnknownAccount(*account))
    }

    /// Register a new account with an empty wallet.
    pub async fn open_account(&self, request: NewAccount) -> FairshareResult<Account> {
        request.validate()?;
        let now = self.clock.now();
        let account = Account::new(request, now);
        let wallet = Wallet::new(account.id, now);
        self.store.insert_account(&account, &wallet).await?;
        tracing::info!(
            "Opened account {} ({}{})",
            account.username,
            account.id,
            if account.is_merchant { ", merchant" } else { "" }
        );
        Ok(account)
    }

    /// Change identity fields. Score fields are untouched apart from the
    /// merchant TFI floor following the merchant flag.
    pub async fn update_profile(
        &self,
        account: &AccountId,
        update: ProfileUpdate,
    ) -> FairshareResult<Account> {
        update.validate()?;
        self.store
            .update_profile(account, &update)
            .await?
            .ok_or(FairshareError::UnknownAccount(*account))
    }

    /// Move `amount` from one wallet to another, withholding the transfer fee
    /// from the recipient's side.
    pub async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Micros,
        description: &str,
    ) -> FairshareResult<Transaction> {
        require_positive(amount)?;
        if from == to {
            return Err(FairshareError::SelfReference(
                "cannot transfer to the same account".to_string(),
            ));
        }

        let treasury = self.config.fee_policy.treasury();
        let mut keys = vec![*from, *to];
        keys.extend(treasury);
        let _guards = self.locks.lock_many(&keys).await;

        let mut sender = self.require_wallet(from).await?;
        let mut recipient = self.require_wallet(to).await?;
        if sender.spendable() < amount {
            return Err(insufficient(&sender, amount));
        }

        let fee = fee_for(amount, self.config.fee_bps);
        let now = self.clock.now();
        sender.balance -= amount;
        sender.updated_at = now;
        add_balance(&mut recipient, amount - fee)?;
        recipient.updated_at = now;

        let mut wallets = vec![sender, recipient];
        if let Some(treasury) = treasury {
            if fee > 0 {
                match wallets.iter_mut().find(|w| w.account == treasury) {
                    Some(wallet) => add_balance(wallet, fee)?,
                    None => {
                        let mut wallet = self.require_wallet(&treasury).await?;
                        add_balance(&mut wallet, fee)?;
                        wallet.updated_at = now;
                        wallets.push(wallet);
                    }
                }
            }
        }

        let transaction = Transaction::transfer(*from, *to, amount, fee, description, now);
        self.store
            .commit_ledger(LedgerWrite {
                wallets,
                transaction: transaction.clone(),
                payout: None,
            })
            .await?;

        tracing::debug!(
            "Transfer {}: {} -> {} amount {} fee {}",
            transaction.id,
            from,
            to,
            Fair::from_micros(amount),
            Fair::from_micros(fee)
        );
        Ok(transaction)
    }

    /// Increase one wallet's balance with a completed credit entry.
    pub async fn credit(
        &self,
        account: &AccountId,
        amount: Micros,
        kind: TransactionKind,
        description: &str,
    ) -> FairshareResult<Transaction> {
        self.apply_credit(account, amount, kind, description, None)
            .await
    }

    /// Pay one account's monthly issuance share. The payout marker commits
    /// together with the credit, so a share is never paid twice.
    pub(crate) async fn credit_issuance(
        &self,
        month: Month,
        account: &AccountId,
        amount: Micros,
    ) -> FairshareResult<Transaction> {
        let description = format!("Monthly issuance for {}", month);
        self.apply_credit(
            account,
            amount,
            TransactionKind::MonthlyIssuance,
            &description,
            Some(month),
        )
        .await
    }

    async fn apply_credit(
        &self,
        account: &AccountId,
        amount: Micros,
        kind: TransactionKind,
        description: &str,
        issuance_month: Option<Month>,
    ) -> FairshareResult<Transaction> {
        require_positive(amount)?;
        if !kind.is_credit() {
            return Err(FairshareError::InvalidValue(format!(
                "{} is not a credit kind",
                kind.as_str()
            )));
        }

        let _guard = self.locks.lock(account).await;
        let mut wallet = self.require_wallet(account).await?;
        let now = self.clock.now();
        add_balance(&mut wallet, amount)?;
        wallet.updated_at = now;

        let transaction = Transaction::single(kind, *account, amount, description, now);
        let payout = issuance_month.map(|month| IssuancePayout {
            month,
            account: *account,
            amount,
            transaction: transaction.id,
            paid_at: now,
        });
        self.store
            .commit_ledger(LedgerWrite {
                wallets: vec![wallet],
                transaction: transaction.clone(),
                payout,
            })
            .await?;

        tracing::debug!(
            "Credit {} ({}) to {}: {}",
            transaction.id,
            kind.as_str(),
            account,
            Fair::from_micros(amount)
        );
        Ok(transaction)
    }

    /// Decrease one wallet's balance with a completed debit entry.
    pub async fn debit(
        &self,
        account: &AccountId,
        amount: Micros,
        kind: TransactionKind,
        description: &str,
    ) -> FairshareResult<Transaction> {
        require_positive(amount)?;
        if !kind.is_debit() {
            return Err(FairshareError::InvalidValue(format!(
                "{} is not a debit kind",
                kind.as_str()
            )));
        }

        let _guard = self.locks.lock(account).await;
        let mut wallet = self.require_wallet(account).await?;
        if wallet.spendable() < amount {
            return Err(insufficient(&wallet, amount));
        }
        let now = self.clock.now();
        wallet.balance -= amount;
        wallet.updated_at = now;

        let transaction = Transaction::single(kind, *account, amount, description, now);
        self.store
            .commit_ledger(LedgerWrite {
                wallets: vec![wallet],
                transaction: transaction.clone(),
                payout: None,
            })
            .await?;

        tracing::debug!(
            "Debit {} ({}) from {}: {}",
            transaction.id,
            kind.as_str(),
            account,
            Fair::from_micros(amount)
        );
        Ok(transaction)
    }

    /// Reserve part of the spendable balance.
    pub async fn lock_funds(&self, account: &AccountId, amount: Micros) -> FairshareResult<WalletView> {
        require_positive(amount)?;
        let _guard = self.locks.lock(account).await;
        let mut wallet = self.require_wallet(account).await?;
        if wallet.spendable() < amount {
            return Err(insufficient(&wallet, amount));
        }
        wallet.locked += amount;
        wallet.updated_at = self.clock.now();
        self.store.save_wallet(&wallet).await?;
        Ok(WalletView::from(&wallet))
    }

    /// Release part of a reservation.
    pub async fn release_funds(
        &self,
        account: &AccountId,
        amount: Micros,
    ) -> FairshareResult<WalletView> {
        require_positive(amount)?;
        let _guard = self.locks.lock(account).await;
        let mut wallet = self.require_wallet(account).await?;
        if wallet.locked < amount {
            return Err(FairshareError::InvalidValue(format!(
                "cannot release {} micros, only {} locked",
                amount, wallet.locked
            )));
        }
        wallet.locked -= amount;
        wallet.updated_at = self.clock.now();
        self.store.save_wallet(&wallet).await?;
        Ok(WalletView::from(&wallet))
    }

    /// Sum of all wallet balances from one consistent snapshot.
    pub async fn circulating_supply(&self) -> FairshareResult<Micros> {
        self.store.circulating_supply().await
    }

    pub async fn balance(&self, account: &AccountId) -> FairshareResult<WalletView> {
        let wallet = self.require_wallet(account).await?;
        Ok(WalletView::from(&wallet))
    }

    /// Transactions touching the account, newest first.
    pub async fn history(&self, account: &AccountId, page: Page) -> FairshareResult<Vec<Transaction>> {
        if self.store.get_account(account).await?.is_none() {
            return Err(FairshareError::UnknownAccount(*account));
        }
        self.store.transactions_for(account, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairshare_core::{SystemClock, TransactionStatus, MICROS_PER_FAIR};
    use fairshare_store::MemoryStore;

    const FAIR: Micros = MICROS_PER_FAIR;

    fn ledger_with(config: LedgerConfig) -> Ledger {
        Ledger::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), config)
    }

    async fn funded(ledger: &Ledger, username: &str, amount: Micros) -> Account {
        let account = ledger.open_account(NewAccount::member(username)).await.unwrap();
        if amount > 0 {
            ledger
                .credit(&account.id, amount, TransactionKind::MerchantIncentive, "seed")
                .await
                .unwrap();
        }
        account
    }

    #[tokio::test]
    async fn test_transfer_withholds_fee_from_recipient() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", 100 * FAIR).await;
        let b = funded(&ledger, "b", 0).await;

        let tx = ledger.transfer(&a.id, &b.id, 50 * FAIR, "rent").await.unwrap();
        assert_eq!(tx.amount, 50 * FAIR);
        assert_eq!(tx.fee, 50_000);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.to_account, Some(b.id));

        assert_eq!(ledger.balance(&a.id).await.unwrap().balance, Fair::from_fair(50.0));
        assert_eq!(ledger.balance(&b.id).await.unwrap().balance, Fair::from_fair(49.95));
        // Burned fee left circulation.
        assert_eq!(ledger.circulating_supply().await.unwrap(), 100 * FAIR - 50_000);
    }

    #[tokio::test]
    async fn test_overspend_changes_nothing() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", 10 * FAIR).await;
        let b = funded(&ledger, "b", 0).await;

        let err = ledger.transfer(&a.id, &b.id, 11 * FAIR, "").await.unwrap_err();
        assert_eq!(
            err,
            FairshareError::InsufficientFunds {
                account: a.id,
                requested: 11 * FAIR,
                available: 10 * FAIR,
            }
        );
        assert_eq!(ledger.balance(&a.id).await.unwrap().balance.micros, 10 * FAIR);
        assert_eq!(ledger.balance(&b.id).await.unwrap().balance.micros, 0);
        assert_eq!(ledger.history(&b.id, Page::default()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_transfer_preconditions() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", FAIR).await;

        let err = ledger.transfer(&a.id, &a.id, 1, "").await.unwrap_err();
        assert!(matches!(err, FairshareError::SelfReference(_)));

        let ghost = uuid::Uuid::now_v7();
        let err = ledger.transfer(&a.id, &ghost, 1, "").await.unwrap_err();
        assert_eq!(err, FairshareError::UnknownAccount(ghost));

        let b = funded(&ledger, "b", 0).await;
        let err = ledger.transfer(&a.id, &b.id, 0, "").await.unwrap_err();
        assert!(matches!(err, FairshareError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn test_collect_policy_credits_treasury() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let bootstrap = Ledger::new(store.clone(), Arc::new(SystemClock), LedgerConfig::default());
        let treasury = bootstrap.open_account(NewAccount::admin("treasury")).await.unwrap();

        let ledger = Ledger::new(
            store,
            Arc::new(SystemClock),
            LedgerConfig {
                fee_bps: 100,
                fee_policy: FeePolicy::Collect {
                    treasury: treasury.id,
                },
            },
        );
        let a = funded(&ledger, "a", 100 * FAIR).await;
        let b = funded(&ledger, "b", 0).await;
        ledger.transfer(&a.id, &b.id, 10 * FAIR, "").await.unwrap();

        assert_eq!(ledger.balance(&b.id).await.unwrap().balance.micros, 9_900_000);
        assert_eq!(ledger.balance(&treasury.id).await.unwrap().balance.micros, 100_000);
        // Collected fees stay in circulation.
        assert_eq!(ledger.circulating_supply().await.unwrap(), 100 * FAIR);
    }

    #[tokio::test]
    async fn test_credit_and_debit_kinds() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", 5 * FAIR).await;

        let err = ledger
            .credit(&a.id, FAIR, TransactionKind::Burn, "")
            .await
            .unwrap_err();
        assert!(matches!(err, FairshareError::InvalidValue(_)));
        let err = ledger
            .debit(&a.id, FAIR, TransactionKind::FairnessReward, "")
            .await
            .unwrap_err();
        assert!(matches!(err, FairshareError::InvalidValue(_)));

        ledger.debit(&a.id, 2 * FAIR, TransactionKind::Burn, "burn").await.unwrap();
        assert_eq!(ledger.balance(&a.id).await.unwrap().balance.micros, 3 * FAIR);

        let err = ledger
            .debit(&a.id, 4 * FAIR, TransactionKind::Fee, "")
            .await
            .unwrap_err();
        assert!(matches!(err, FairshareError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_locked_funds_are_not_spendable() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", 10 * FAIR).await;
        let b = funded(&ledger, "b", 0).await;

        let view = ledger.lock_funds(&a.id, 8 * FAIR).await.unwrap();
        assert_eq!(view.spendable.micros, 2 * FAIR);

        let err = ledger.transfer(&a.id, &b.id, 3 * FAIR, "").await.unwrap_err();
        assert!(matches!(err, FairshareError::InsufficientFunds { .. }));
        let err = ledger.lock_funds(&a.id, 3 * FAIR).await.unwrap_err();
        assert!(matches!(err, FairshareError::InsufficientFunds { .. }));

        let err = ledger.release_funds(&a.id, 9 * FAIR).await.unwrap_err();
        assert!(matches!(err, FairshareError::InvalidValue(_)));
        let view = ledger.release_funds(&a.id, 8 * FAIR).await.unwrap();
        assert_eq!(view.spendable.micros, 10 * FAIR);
        assert_eq!(view.locked.micros, 0);
    }

    #[tokio::test]
    async fn test_supply_is_conserved_across_operations() {
        let ledger = ledger_with(LedgerConfig::default());
        let a = funded(&ledger, "a", 0).await;
        let b = funded(&ledger, "b", 0).await;
        let c = funded(&ledger, "c", 0).await;

        let mut credits: Micros = 0;
        let mut debits: Micros = 0;
        let mut burned: Micros = 0;

        for (account, amount) in [(&a, 300 * FAIR), (&b, 120 * FAIR), (&c, 7 * FAIR)] {
            ledger
                .credit(&account.id, amount, TransactionKind::FairnessReward, "")
                .await
                .unwrap();
            credits += amount;
        }
        for (from, to, amount) in [(&a, &b, 40 * FAIR), (&b, &c, 33_333_333), (&c, &a, 1_234)] {
            let tx = ledger.transfer(&from.id, &to.id, amount, "").await.unwrap();
            burned += tx.fee;
        }
        ledger.debit(&b.id, 5 * FAIR, TransactionKind::Burn, "").await.unwrap();
        debits += 5 * FAIR;
        // Failed operations are excluded from the accounting.
        assert!(ledger.transfer(&c.id, &a.id, 10_000 * FAIR, "").await.is_err());

        assert_eq!(
            ledger.circulating_supply().await.unwrap(),
            credits - debits - burned
        );
    }

    #[tokio::test]
    async fn test_concurrent_opposite_transfers() {
        let ledger = Arc::new(ledger_with(LedgerConfig {
            fee_bps: 0,
            fee_policy: FeePolicy::Burn,
        }));
        let a = funded(&ledger, "a", 1_000).await;
        let b = funded(&ledger, "b", 1_000).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let ledger = ledger.clone();
            let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            handles.push(tokio::spawn(async move {
                ledger.transfer(&from, &to, 10, "ping").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let total = ledger.balance(&a.id).await.unwrap().balance.micros
            + ledger.balance(&b.id).await.unwrap().balance.micros;
        assert_eq!(total, 2_000);
        assert_eq!(ledger.circulating_supply().await.unwrap(), 2_000);
    }

    #[tokio::test]
    async fn test_open_account_and_profile_update() {
        let ledger = ledger_with(LedgerConfig::default());
        let shop = ledger.open_account(NewAccount::member("shop")).await.unwrap();
        assert_eq!(shop.tfi, 0);

        let err = ledger.open_account(NewAccount::member("shop")).await.unwrap_err();
        assert_eq!(err, FairshareError::DuplicateUsername("shop".to_string()));

        let updated = ledger
            .update_profile(
                &shop.id,
                ProfileUpdate {
                    is_merchant: Some(true),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_merchant);
        assert_eq!(updated.tfi, 30);

        let err = ledger
            .update_profile(
                &shop.id,
                ProfileUpdate {
                    community_service_hours: Some(-1.0),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FairshareError::InvalidValue(_)));
    }
}
