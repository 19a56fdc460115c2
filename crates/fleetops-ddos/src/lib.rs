//! # fleetops-ddos
//!
//! The DDoS Protection Engine (§4.5/C6): IP reputation, whitelist/blacklist
//! admission, threat-score auto-bans, a bounded attack event ring, and the
//! overall threat level derived from recent activity.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod engine;
pub mod error;

pub use engine::{DdosConfig, DdosEngine};
pub use error::{DdosError, Result};
