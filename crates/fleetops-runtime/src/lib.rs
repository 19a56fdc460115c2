//! # fleetops-runtime
//!
//! Run Supervisor primitives shared by every engine that drives a
//! cancellable state machine to a terminal status: scoped cancellation
//! tokens and the [`SupervisedRun`] wrapper around status + history.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod cancel;
pub mod supervisor;

pub use cancel::CancelToken;
pub use supervisor::SupervisedRun;
