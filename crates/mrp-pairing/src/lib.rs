//! # mrp-pairing
//!
//! Pairing handshakes for both legs of the MRP proxy.
//!
//! This crate implements:
//! - Pair-setup and pair-verify in the accessory role, toward the app
//! - Pair-verify in the controller role, toward the genuine device
//! - Pair-setup in the controller role, which yields [`Credentials`]

mod accessory;
mod client;
mod config;
mod credentials;
mod pair_setup;
mod pair_verify;
mod session;

pub use accessory::AccessoryIdentity;
pub use client::{SetupClient, SetupClientState, VerifyClient, VerifyClientState};
pub use config::{PairingConfig, DEFAULT_PIN, DEFAULT_SIGNING_SEED};
pub use credentials::Credentials;
pub use pair_setup::{PairSetupServer, PairSetupState, SetupStep, SRP_USERNAME};
pub use pair_verify::{PairVerifyServer, PairVerifyState, VerifyStep};
pub use session::{Effect, PairingSession, StepOutcome};
