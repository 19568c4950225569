//! Fuzz target for catalog.json parsing and validation.

#![no_main]

use ap_config::{validate_catalog, CatalogConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(catalog) = serde_json::from_slice::<CatalogConfig>(data) {
        let _ = validate_catalog(&catalog);
    }
});
