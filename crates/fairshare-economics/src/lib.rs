// crates/fairshare-economics/src/lib.rs
//
// fairshare-economics: the FAIR ledger, transfer fees, and monthly issuance.
//
// All monetary values are tracked in micros (the smallest unit of FAIR).
// 1 FAIR = 1,000,000 micros (10^6). The `Ledger` is the only component that
// mutates wallet balances or appends transactions; the monetary policy pays
// issuance through it.

pub mod fees;
pub mod ledger;
pub mod monetary;

// Re-export key types for ergonomic access from downstream crates.
pub use fees::{fee_for, FeePolicy, BPS_DENOMINATOR, DEFAULT_FEE_BPS};
pub use ledger::{Ledger, LedgerConfig, WalletView};
pub use monetary::{
    activity_factor, allocate_shares, IssuanceOutcome, MonetaryConfig, MonetaryPolicy,
};
