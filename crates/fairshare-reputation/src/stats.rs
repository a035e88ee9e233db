// crates/fairshare-reputation/src/stats.rs
//
// Community-wide score statistics and the council ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use fairshare_core::{Account, Micros};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PfiBucket {
    Excellent,
    Good,
    Average,
    Poor,
}

impl PfiBucket {
    pub fn of(pfi: u8) -> Self {
        match pfi {
            90..=u8::MAX => PfiBucket::Excellent,
            70..=89 => PfiBucket::Good,
            50..=69 => PfiBucket::Average,
            _ => PfiBucket::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TfiBucket {
    Excellent,
    Good,
    Fair,
    /// At or near the merchant floor.
    Base,
    Unscored,
}

impl TfiBucket {
    pub fn of(tfi: u8) -> Self {
        match tfi {
            80..=u8::MAX => TfiBucket::Excellent,
            60..=79 => TfiBucket::Good,
            40..=59 => TfiBucket::Fair,
            1..=39 => TfiBucket::Base,
            0 => TfiBucket::Unscored,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PfiBuckets {
    pub excellent: u64,
    pub good: u64,
    pub average: u64,
    pub poor: u64,
}

impl PfiBuckets {
    fn add(&mut self, pfi: u8) {
        match PfiBucket::of(pfi) {
            PfiBucket::Excellent => self.excellent += 1,
            PfiBucket::Good => self.good += 1,
            PfiBucket::Average => self.average += 1,
            PfiBucket::Poor => self.poor += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfiBuckets {
    pub excellent: u64,
    pub good: u64,
    pub fair: u64,
    pub base: u64,
    pub unscored: u64,
}

impl TfiBuckets {
    fn add(&mut self, tfi: u8) {
        match TfiBucket::of(tfi) {
            TfiBucket::Excellent => self.excellent += 1,
            TfiBucket::Good => self.good += 1,
            TfiBucket::Fair => self.fair += 1,
            TfiBucket::Base => self.base += 1,
            TfiBucket::Unscored => self.unscored += 1,
        }
    }
}

/// Snapshot of community totals and score distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub total_accounts: u64,
    pub merchants: u64,
    pub admins: u64,
    pub circulating_supply: Micros,
    pub total_transactions: u64,
    /// Mean PFI over scored (non-admin) accounts.
    pub average_pfi: f64,
    /// Mean TFI over scored merchants.
    pub average_tfi: f64,
    pub pfi_buckets: PfiBuckets,
    pub tfi_buckets: TfiBuckets,
}

impl CommunityStats {
    pub fn from_accounts(
        accounts: &[Account],
        circulating_supply: Micros,
        total_transactions: u64,
    ) -> Self {
        let mut pfi_buckets = PfiBuckets::default();
        let mut tfi_buckets = TfiBuckets::default();
        let mut tfi_sum = 0.0;
        let mut scored_merchants = 0u64;

        for account in accounts.iter().filter(|a| a.is_scored()) {
            pfi_buckets.add(account.pfi);
            if account.is_merchant {
                tfi_buckets.add(account.tfi);
                tfi_sum += account.tfi as f64;
                scored_merchants += 1;
            }
        }

        Self {
            total_accounts: accounts.len() as u64,
            merchants: accounts.iter().filter(|a| a.is_merchant).count() as u64,
            admins: accounts.iter().filter(|a| a.is_admin).count() as u64,
            circulating_supply,
            total_transactions,
            average_pfi: average_pfi(accounts),
            average_tfi: if scored_merchants == 0 {
                0.0
            } else {
                tfi_sum / scored_merchants as f64
            },
            pfi_buckets,
            tfi_buckets,
        }
    }
}

/// Mean PFI over non-admin accounts; 0.0 when there are none.
pub fn average_pfi(accounts: &[Account]) -> f64 {
    let scored: Vec<f64> = accounts
        .iter()
        .filter(|a| a.is_scored())
        .map(|a| a.pfi as f64)
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f64>() / scored.len() as f64
}

/// Council order: PFI desc, then TFI desc, then username asc.
pub fn council_order(a: &Account, b: &Account) -> Ordering {
    b.pfi
        .cmp(&a.pfi)
        .then_with(|| b.tfi.cmp(&a.tfi))
        .then_with(|| a.username.cmp(&b.username))
}

/// The top `limit` non-admin accounts in council order.
pub fn rank_council(accounts: Vec<Account>, limit: usize) -> Vec<Account> {
    let mut members: Vec<Account> = accounts.into_iter().filter(|a| a.is_scored()).collect();
    members.sort_by(council_order);
    members.truncate(limit);
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fairshare_core::NewAccount;

    fn member(name: &str, pfi: u8) -> Account {
        let mut account = Account::new(NewAccount::member(name), Utc::now());
        account.pfi = pfi;
        account
    }

    fn merchant(name: &str, pfi: u8, tfi: u8) -> Account {
        let mut account = Account::new(NewAccount::merchant(name), Utc::now());
        account.pfi = pfi;
        account.tfi = tfi;
        account
    }

    #[test]
    fn test_bucket_edges() {
        assert_eq!(PfiBucket::of(90), PfiBucket::Excellent);
        assert_eq!(PfiBucket::of(89), PfiBucket::Good);
        assert_eq!(PfiBucket::of(50), PfiBucket::Average);
        assert_eq!(PfiBucket::of(49), PfiBucket::Poor);
        assert_eq!(TfiBucket::of(80), TfiBucket::Excellent);
        assert_eq!(TfiBucket::of(78), TfiBucket::Good);
        assert_eq!(TfiBucket::of(40), TfiBucket::Fair);
        assert_eq!(TfiBucket::of(30), TfiBucket::Base);
        assert_eq!(TfiBucket::of(0), TfiBucket::Unscored);
    }

    #[test]
    fn test_average_pfi_skips_admins() {
        let mut admin = Account::new(NewAccount::admin("root"), Utc::now());
        admin.pfi = 100;
        let accounts = vec![member("a", 20), member("b", 60), admin];
        assert!((average_pfi(&accounts) - 40.0).abs() < 1e-9);
        assert_eq!(average_pfi(&[]), 0.0);
    }

    #[test]
    fn test_stats_bucket_counts() {
        let accounts = vec![
            member("a", 95),
            member("b", 20),
            merchant("c", 72, 78),
            merchant("d", 20, 30),
            Account::new(NewAccount::admin("root"), Utc::now()),
        ];
        let stats = CommunityStats::from_accounts(&accounts, 5_000, 12);
        assert_eq!(stats.total_accounts, 5);
        assert_eq!(stats.merchants, 2);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.pfi_buckets.excellent, 1);
        assert_eq!(stats.pfi_buckets.good, 1);
        assert_eq!(stats.pfi_buckets.poor, 2);
        assert_eq!(stats.tfi_buckets.good, 1);
        assert_eq!(stats.tfi_buckets.base, 1);
        assert!((stats.average_tfi - 54.0).abs() < 1e-9);
    }

    #[test]
    fn test_council_ordering() {
        let accounts = vec![
            member("zed", 80),
            merchant("amy", 80, 60),
            member("bob", 80),
            member("low", 10),
            Account::new(NewAccount::admin("root"), Utc::now()),
        ];
        let council = rank_council(accounts, 3);
        let names: Vec<&str> = council.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "bob", "zed"]);
    }
}
