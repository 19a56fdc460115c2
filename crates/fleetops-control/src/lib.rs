//! # fleetops-control
//!
//! The unified control plane facade (§2/C8) and the single required
//! external interface, `GET /dashboard` (§6).

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod facade;

pub use facade::FleetOpsControlPlane;
