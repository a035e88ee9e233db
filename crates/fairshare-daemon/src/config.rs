// crates/fairshare-daemon/src/config.rs
//
// Runtime configuration for the Fairshare daemon.
// Loaded from a TOML file or populated with sensible defaults.
//
// Example:
//
//   data_dir = "~/.fairshare/data"
//   store = "rocksdb"
//
//   [ledger]
//   fee_bps = 10
//   fee_policy = "collect"
//   treasury_username = "treasury"
//
//   [monetary]
//   base_monthly_issuance = 10000.0
//
//   [scheduler]
//   interval_secs = 3600

use serde::Deserialize;
use std::fs;

use fairshare_core::{AccountId, Fair, SCORE_MAX};
use fairshare_economics::{FeePolicy, LedgerConfig, MonetaryConfig};
use fairshare_governance::{GovernanceConfig, VotingWeights};
use fairshare_reputation::{FairnessConfig, PfiWeights};

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level used when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Storage backend: "rocksdb" or "memory".
    #[serde(default = "default_store")]
    pub store: String,

    #[serde(default)]
    pub ledger: LedgerSection,

    #[serde(default)]
    pub monetary: MonetarySection,

    #[serde(default)]
    pub fairness: FairnessSection,

    #[serde(default)]
    pub governance: GovernanceSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Transfer fee in basis points (10 = 0.1%).
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,

    /// "burn" removes fees from circulation; "collect" credits the treasury.
    #[serde(default = "default_fee_policy")]
    pub fee_policy: String,

    /// Admin account receiving collected fees. Created on startup if missing.
    #[serde(default = "default_treasury_username")]
    pub treasury_username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonetarySection {
    /// Base monthly issuance in FAIR.
    #[serde(default = "default_base_monthly_issuance")]
    pub base_monthly_issuance: f64,

    #[serde(default = "default_expected_transactions")]
    pub expected_transactions: u64,

    #[serde(default = "default_max_growth_rate")]
    pub max_growth_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FairnessSection {
    #[serde(default = "default_attestation_weight")]
    pub attestation_weight: f64,

    #[serde(default = "default_service_weight")]
    pub service_weight: f64,

    #[serde(default = "default_baseline_weight")]
    pub baseline_weight: f64,

    #[serde(default = "default_service_hours_cap")]
    pub service_hours_cap: f64,

    #[serde(default = "default_dispute_resolution_multiplier")]
    pub dispute_resolution_multiplier: f64,

    #[serde(default = "default_community_service_multiplier")]
    pub community_service_multiplier: f64,

    #[serde(default = "default_peer_rating_multiplier")]
    pub peer_rating_multiplier: f64,

    #[serde(default = "default_tfi_floor")]
    pub tfi_floor: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GovernanceSection {
    #[serde(default = "default_stake_weight")]
    pub stake_weight: f64,

    #[serde(default = "default_reputation_weight")]
    pub reputation_weight: f64,

    #[serde(default = "default_min_voting_period_secs")]
    pub min_voting_period_secs: i64,

    #[serde(default = "default_max_voting_period_secs")]
    pub max_voting_period_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Seconds between scheduler cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_data_dir() -> String {
    "~/.fairshare/data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store() -> String {
    "rocksdb".to_string()
}

fn default_fee_bps() -> u32 {
    fairshare_economics::DEFAULT_FEE_BPS
}

fn default_fee_policy() -> String {
    "burn".to_string()
}

fn default_treasury_username() -> String {
    "treasury".to_string()
}

fn default_base_monthly_issuance() -> f64 {
    10_000.0
}

fn default_expected_transactions() -> u64 {
    1_000
}

fn default_max_growth_rate() -> f64 {
    0.5
}

fn default_attestation_weight() -> f64 {
    0.5
}

fn default_service_weight() -> f64 {
    0.3
}

fn default_baseline_weight() -> f64 {
    0.2
}

fn default_service_hours_cap() -> f64 {
    100.0
}

fn default_dispute_resolution_multiplier() -> f64 {
    1.5
}

fn default_community_service_multiplier() -> f64 {
    1.0
}

fn default_peer_rating_multiplier() -> f64 {
    0.75
}

fn default_tfi_floor() -> u8 {
    fairshare_core::MERCHANT_BASE_TFI
}

fn default_stake_weight() -> f64 {
    0.6
}

fn default_reputation_weight() -> f64 {
    0.4
}

fn default_min_voting_period_secs() -> i64 {
    24 * 3600
}

fn default_max_voting_period_secs() -> i64 {
    30 * 24 * 3600
}

fn default_interval_secs() -> u64 {
    3600
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            store: default_store(),
            ledger: LedgerSection::default(),
            monetary: MonetarySection::default(),
            fairness: FairnessSection::default(),
            governance: GovernanceSection::default(),
            scheduler: SchedulerSection::default(),
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            fee_bps: default_fee_bps(),
            fee_policy: default_fee_policy(),
            treasury_username: default_treasury_username(),
        }
    }
}

impl Default for MonetarySection {
    fn default() -> Self {
        Self {
            base_monthly_issuance: default_base_monthly_issuance(),
            expected_transactions: default_expected_transactions(),
            max_growth_rate: default_max_growth_rate(),
        }
    }
}

impl Default for FairnessSection {
    fn default() -> Self {
        Self {
            attestation_weight: default_attestation_weight(),
            service_weight: default_service_weight(),
            baseline_weight: default_baseline_weight(),
            service_hours_cap: default_service_hours_cap(),
            dispute_resolution_multiplier: default_dispute_resolution_multiplier(),
            community_service_multiplier: default_community_service_multiplier(),
            peer_rating_multiplier: default_peer_rating_multiplier(),
            tfi_floor: default_tfi_floor(),
        }
    }
}

impl Default for GovernanceSection {
    fn default() -> Self {
        Self {
            stake_weight: default_stake_weight(),
            reputation_weight: default_reputation_weight(),
            min_voting_period_secs: default_min_voting_period_secs(),
            max_voting_period_secs: default_max_voting_period_secs(),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        match self.store.as_str() {
            "rocksdb" | "memory" => {}
            other => return Err(format!("unknown store backend: {}", other)),
        }
        match self.ledger.fee_policy.as_str() {
            "burn" | "collect" => {}
            other => return Err(format!("unknown fee policy: {}", other)),
        }
        if self.ledger.fee_bps > 10_000 {
            return Err(format!("fee_bps must be at most 10000, got {}", self.ledger.fee_bps));
        }
        if !self.monetary.base_monthly_issuance.is_finite()
            || self.monetary.base_monthly_issuance < 0.0
        {
            return Err("base_monthly_issuance must be a non-negative number".to_string());
        }
        if !self.monetary.max_growth_rate.is_finite() || self.monetary.max_growth_rate < 0.0 {
            return Err("max_growth_rate must be a non-negative number".to_string());
        }
        if self.fairness.tfi_floor > SCORE_MAX {
            return Err(format!(
                "tfi_floor must be at most {}, got {}",
                SCORE_MAX, self.fairness.tfi_floor
            ));
        }
        if self.governance.min_voting_period_secs <= 0
            || self.governance.min_voting_period_secs > self.governance.max_voting_period_secs
        {
            return Err("voting period bounds must satisfy 0 < min <= max".to_string());
        }
        if self.scheduler.interval_secs == 0 {
            return Err("scheduler interval_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn collects_fees(&self) -> bool {
        self.ledger.fee_policy == "collect"
    }

    /// Ledger settings. `treasury` is the resolved treasury account when fees
    /// are collected.
    pub fn ledger_config(&self, treasury: Option<AccountId>) -> LedgerConfig {
        let fee_policy = match treasury {
            Some(treasury) if self.collects_fees() => FeePolicy::Collect { treasury },
            _ => FeePolicy::Burn,
        };
        LedgerConfig {
            fee_bps: self.ledger.fee_bps,
            fee_policy,
        }
    }

    pub fn monetary_config(&self) -> MonetaryConfig {
        MonetaryConfig {
            base_monthly_issuance: Fair::from_fair(self.monetary.base_monthly_issuance).micros,
            expected_transactions: self.monetary.expected_transactions,
            max_growth_rate: self.monetary.max_growth_rate,
        }
    }

    pub fn fairness_config(&self) -> FairnessConfig {
        let f = &self.fairness;
        FairnessConfig {
            pfi: PfiWeights {
                attestation: f.attestation_weight,
                service: f.service_weight,
                baseline: f.baseline_weight,
                service_hours_cap: f.service_hours_cap,
                dispute_resolution: f.dispute_resolution_multiplier,
                community_service: f.community_service_multiplier,
                peer_rating: f.peer_rating_multiplier,
                ..PfiWeights::default()
            },
            tfi_floor: f.tfi_floor,
            ..FairnessConfig::default()
        }
    }

    pub fn governance_config(&self) -> GovernanceConfig {
        GovernanceConfig {
            weights: VotingWeights {
                stake: self.governance.stake_weight,
                reputation: self.governance.reputation_weight,
            },
            min_voting_period: chrono::Duration::seconds(self.governance.min_voting_period_secs),
            max_voting_period: chrono::Duration::seconds(self.governance.max_voting_period_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DaemonConfig::parse("").unwrap();
        assert_eq!(config.store, "rocksdb");
        assert_eq!(config.ledger.fee_bps, 10);
        assert_eq!(config.scheduler.interval_secs, 3600);
        assert_eq!(config.monetary_config(), MonetaryConfig::default());
        assert_eq!(config.fairness_config(), FairnessConfig::default());
        assert_eq!(config.ledger_config(None), LedgerConfig::default());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = DaemonConfig::parse(
            r#"
            store = "memory"

            [ledger]
            fee_bps = 25
            fee_policy = "collect"

            [monetary]
            base_monthly_issuance = 500.5
            max_growth_rate = 0.25

            [governance]
            min_voting_period_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.store, "memory");
        assert_eq!(config.monetary_config().base_monthly_issuance, 500_500_000);
        assert_eq!(config.monetary_config().expected_transactions, 1_000);
        assert_eq!(
            config.governance_config().min_voting_period,
            chrono::Duration::seconds(60)
        );

        let treasury = uuid::Uuid::now_v7();
        assert_eq!(
            config.ledger_config(Some(treasury)).fee_policy,
            FeePolicy::Collect { treasury }
        );
        assert_eq!(config.ledger_config(Some(treasury)).fee_bps, 25);
    }

    #[test]
    fn test_boundary_values_are_accepted() {
        let config = DaemonConfig::parse(
            "[ledger]\nfee_bps = 10000\n[fairness]\ntfi_floor = 100\n[monetary]\nmax_growth_rate = 0.0",
        )
        .unwrap();
        assert_eq!(config.ledger_config(None).fee_bps, 10_000);
        assert_eq!(config.fairness_config().tfi_floor, 100);
        assert_eq!(config.monetary_config().max_growth_rate, 0.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(DaemonConfig::parse("store = \"postgres\"").is_err());
        assert!(DaemonConfig::parse("[ledger]\nfee_policy = \"redistribute\"").is_err());
        assert!(DaemonConfig::parse("[ledger]\nfee_bps = 20000").is_err());
        assert!(DaemonConfig::parse("[scheduler]\ninterval_secs = 0").is_err());
        assert!(DaemonConfig::parse("[fairness]\ntfi_floor = 101").is_err());
        assert!(DaemonConfig::parse("[monetary]\nmax_growth_rate = -0.5").is_err());
        assert!(DaemonConfig::parse("[monetary]\nmax_growth_rate = nan").is_err());
        assert!(DaemonConfig::parse(
            "[governance]\nmin_voting_period_secs = 100\nmax_voting_period_secs = 10"
        )
        .is_err());
    }
}
