use std::path::Path;

use racesync_core::checksum;
use serde_json::Value;

use crate::commands::common::read_json;
use crate::error::CliError;

pub fn run_verify(file: &Path) -> Result<String, CliError> {
    let raw: Value = read_json(file)?;
    let digest = verify_package(&raw)?;
    println!("Checksum OK: {digest}");
    Ok(digest)
}

/// Check a package's declared checksum against its payload
pub fn verify_package(raw: &Value) -> Result<String, CliError> {
    let declared = raw
        .get("checksum")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::Rejected("package has no checksum".to_string()))?;
    let payload = raw
        .get("data")
        .or_else(|| raw.get("raceConfig"))
        .ok_or_else(|| CliError::Rejected("package has no data".to_string()))?;

    let actual = checksum::fingerprint_value(payload);
    if actual.eq_ignore_ascii_case(declared) {
        Ok(actual)
    } else {
        Err(racesync_core::Error::ChecksumMismatch {
            expected: declared.to_string(),
            actual,
        }
        .into())
    }
}
