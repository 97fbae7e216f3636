#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! License verification for the audiobook core
//!
//! A [`LicenseCheck`] runs a caller-supplied list of check providers against
//! a [`LicenseManifest`] and reports one verdict per check plus an overall
//! result. Progress is streamed as [`audiobook_events::LicenseCheckEvent`]s.

pub mod check;
pub mod checks;
pub mod manifest;
pub mod orchestrator;
pub mod status;

pub use check::{
    CheckStatus, SingleLicenseCheck, SingleLicenseCheckParameters, SingleLicenseCheckProvider,
    SingleLicenseCheckResult, StatusCallback,
};
pub use checks::{
    standard_providers, RightsCheckProvider, SignatureCheckProvider, StatusCheckProvider,
};
pub use manifest::LicenseManifest;
pub use orchestrator::{LicenseCheck, LicenseCheckResult};
pub use status::{LicenseStatus, LicenseStatusDocument};
