use std::path::Path;

use anyhow::{Context, Result};

use crate::parsers::{Vendor, VendorPayload};

/// Read a vendor transcript file and deserialize it into the schema
/// for the given vendor
pub fn read_vendor_file(path: &Path, vendor: Vendor) -> Result<VendorPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {path:?}"))?;
    VendorPayload::from_json(vendor, &content)
        .with_context(|| format!("Failed to parse {vendor} payload from {path:?}"))
}
