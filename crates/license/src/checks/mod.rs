//! Built-in license checks

mod rights;
mod signature;
mod status;

pub use rights::{RightsCheckProvider, RIGHTS_END_FIELD, RIGHTS_START_FIELD};
pub use signature::{SignatureCheckProvider, SIGNATURE_FIELD};
pub use status::{StatusCheckProvider, STATUS_DOCUMENT_FIELD};

use crate::check::SingleLicenseCheckProvider;
use audiobook_config::LicenseConfig;
use std::sync::Arc;

/// Signature, rights and status checks, in that order
#[must_use]
pub fn standard_providers(config: &LicenseConfig) -> Vec<Arc<dyn SingleLicenseCheckProvider>> {
    vec![
        Arc::new(SignatureCheckProvider::from_config(config)),
        Arc::new(RightsCheckProvider),
        Arc::new(StatusCheckProvider),
    ]
}
