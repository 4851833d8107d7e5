//! Package envelope validation
//!
//! Order matters: the checksum is verified before any schema rule runs, so a
//! tampered package is always reported as a checksum mismatch.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::entities::{
    schema_for, LEGACY_CHECKPOINT, LEGACY_CHECKPOINT_RUNNER, LEGACY_RACE_CONFIG, LEGACY_RUNNER,
};
use super::rules::{EntitySchema, FieldKind, FieldRule};
use super::{validate_array, FieldError};
use crate::checksum;
use crate::error::{Error, Result};
use crate::models::Collection;
use crate::package::{ExportPackage, ExportType, LegacyPackage};

static ENVELOPE: EntitySchema = EntitySchema {
    name: "package",
    fields: &[
        FieldRule::required("version", FieldKind::Text),
        FieldRule::required("exportDate", FieldKind::Timestamp),
        FieldRule::required("checksum", FieldKind::Checksum),
        FieldRule::optional("deviceId", FieldKind::FreeText),
        FieldRule::required("exportType", FieldKind::Enumeration(&ExportType::VALUES)),
        FieldRule::optional("data", FieldKind::Object),
        FieldRule::optional("raceConfig", FieldKind::Object),
        FieldRule::optional("metadata", FieldKind::Object),
    ],
    refine: None,
};

const LEGACY_ARRAYS: [(&str, &EntitySchema); 3] = [
    ("checkpoints", &LEGACY_CHECKPOINT),
    ("runners", &LEGACY_RUNNER),
    ("checkpointRunners", &LEGACY_CHECKPOINT_RUNNER),
];

/// A package that passed checksum and schema validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidatedPackage {
    Current(ExportPackage),
    Legacy(LegacyPackage),
}

impl ValidatedPackage {
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Current(package) => &package.version,
            Self::Legacy(package) => &package.version,
        }
    }

    #[must_use]
    pub fn checksum(&self) -> &str {
        match self {
            Self::Current(package) => &package.checksum,
            Self::Legacy(package) => &package.checksum,
        }
    }

    #[must_use]
    pub const fn export_type(&self) -> ExportType {
        match self {
            Self::Current(package) => package.export_type,
            Self::Legacy(package) => package.export_type,
        }
    }

    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Current(package) => package.device_id.as_deref(),
            Self::Legacy(package) => package.device_id.as_deref(),
        }
    }
}

/// Non-failing validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ValidatedPackage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// Validate a raw package, reporting problems as data rather than an error
pub fn validate_package(raw: &Value) -> PackageValidation {
    match check_package(raw) {
        Ok(package) => PackageValidation {
            valid: true,
            data: Some(package),
            errors: Vec::new(),
        },
        Err(error) => PackageValidation {
            valid: false,
            data: None,
            errors: error.field_errors(),
        },
    }
}

/// Verify the checksum, then the envelope, then every nested entity array
pub fn check_package(raw: &Value) -> Result<ValidatedPackage> {
    let Some(envelope) = raw.as_object() else {
        return Err(Error::MalformedPackage("package must be a JSON object".into()));
    };

    let legacy = !envelope.contains_key("data") && envelope.contains_key("raceConfig");
    let payload_field = if legacy { "raceConfig" } else { "data" };

    let (Some(declared), Some(payload)) = (
        envelope.get("checksum").and_then(Value::as_str),
        envelope.get(payload_field),
    ) else {
        let mut errors = ENVELOPE.check(raw);
        if !envelope.contains_key(payload_field) {
            errors.push(FieldError::new(payload_field, "is required"));
        }
        return Err(Error::SchemaValidation(errors));
    };

    let actual = checksum::fingerprint_value(payload);
    if !actual.eq_ignore_ascii_case(declared) {
        warn!(declared, actual = %actual, "Package checksum mismatch");
        return Err(Error::ChecksumMismatch {
            expected: declared.to_string(),
            actual,
        });
    }

    let mut errors = ENVELOPE.check(raw);
    if envelope.get("exportType").and_then(Value::as_str)
        == Some(ExportType::CheckpointResults.as_str())
    {
        errors.push(FieldError::new(
            "exportType",
            "checkpoint-results packages must be imported as checkpoint results",
        ));
    }
    if !errors.is_empty() {
        return Err(Error::SchemaValidation(errors));
    }

    if legacy {
        check_legacy_config(payload)?;
        let package: LegacyPackage = serde_json::from_value(raw.clone()).map_err(shape_error)?;
        Ok(ValidatedPackage::Legacy(package))
    } else {
        check_collections(payload)?;
        let package: ExportPackage = serde_json::from_value(raw.clone()).map_err(shape_error)?;
        Ok(ValidatedPackage::Current(package))
    }
}

fn check_collections(data: &Value) -> Result<()> {
    let Some(collections) = data.as_object() else {
        return Err(Error::SchemaValidation(vec![FieldError::new(
            "data",
            "must be an object",
        )]));
    };

    let mut errors = Vec::new();
    for collection in Collection::ALL {
        let path = format!("data.{collection}");
        check_array(
            collections,
            collection.as_str(),
            &path,
            schema_for(collection),
            &mut errors,
        );
    }
    finish(errors)
}

fn check_legacy_config(config: &Value) -> Result<()> {
    let mut errors: Vec<_> = LEGACY_RACE_CONFIG
        .check(config)
        .into_iter()
        .map(|error| error.nested("raceConfig"))
        .collect();

    if let Some(fields) = config.as_object() {
        for (field, schema) in LEGACY_ARRAYS {
            let path = format!("raceConfig.{field}");
            check_array(fields, field, &path, schema, &mut errors);
        }
    }
    finish(errors)
}

fn check_array(
    object: &Map<String, Value>,
    field: &str,
    path: &str,
    schema: &EntitySchema,
    errors: &mut Vec<FieldError>,
) {
    match object.get(field) {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let result = validate_array::<Value>(items, schema);
            errors.extend(result.field_errors(path));
        }
        Some(_) => errors.push(FieldError::new(path, "must be an array")),
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::SchemaValidation(errors))
    }
}

fn shape_error(error: serde_json::Error) -> Error {
    Error::SchemaValidation(vec![FieldError::new("", error.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn signed(mut package: Value) -> Value {
        let payload = if package.get("data").is_some() {
            &package["data"]
        } else {
            &package["raceConfig"]
        };
        package["checksum"] = json!(checksum::fingerprint_value(payload));
        package
    }

    fn full_package() -> Value {
        signed(json!({
            "version": "3.0.0",
            "exportDate": "2024-06-01T12:00:00Z",
            "checksum": "",
            "deviceId": "device-1",
            "exportType": "full-race-data",
            "data": {
                "races": [{
                    "id": 1,
                    "name": "Ridge Ultra",
                    "date": "2024-06-01",
                    "startTime": "06:30",
                    "minRunner": 1,
                    "maxRunner": 10,
                    "createdAt": "2024-05-01T08:00:00Z"
                }],
                "runners": [
                    {"id": 1, "raceId": 1, "number": 1, "status": "not-started"},
                    {"id": 2, "raceId": 1, "number": 2, "status": "passed"}
                ],
                "checkpoints": [{"id": 1, "raceId": 1, "number": 1, "name": "Hut"}]
            },
            "metadata": {"totalRaces": 1, "totalRunners": 2, "totalCheckpoints": 1}
        }))
    }

    #[test]
    fn accepts_signed_package() {
        let result = validate_package(&full_package());

        assert!(result.valid, "{:?}", result.errors);
        let Some(ValidatedPackage::Current(package)) = result.data else {
            panic!("expected a current package");
        };
        assert_eq!(package.data.runners.len(), 2);
        assert_eq!(package.device_id.as_deref(), Some("device-1"));
    }

    #[test]
    fn accepts_uppercase_checksum() {
        let mut package = full_package();
        let upper = package["checksum"].as_str().unwrap().to_ascii_uppercase();
        package["checksum"] = json!(upper);

        let result = validate_package(&package);

        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn corrupted_checksum_reports_checksum_path() {
        let mut package = full_package();
        package["checksum"] = json!("0".repeat(64));

        let result = validate_package(&package);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "checksum");
        assert!(result.errors[0].message.contains("Checksum mismatch"));
    }

    #[test]
    fn tampered_data_fails_before_schema() {
        let mut package = full_package();
        package["data"]["runners"][1]["status"] = json!("bogus");

        let error = check_package(&package).unwrap_err();
        assert!(matches!(error, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn nested_errors_carry_full_paths() {
        let mut package = full_package();
        package["data"]["runners"][1]["status"] = json!("bogus");
        package["data"]["checkpoints"][0]["name"] = json!("");
        let package = signed(package);

        let result = validate_package(&package);

        let paths: Vec<_> = result.errors.iter().map(|error| error.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["data.runners[1].status", "data.checkpoints[0].name"]
        );
    }

    #[test]
    fn missing_checksum_is_a_schema_error() {
        let mut package = full_package();
        package.as_object_mut().unwrap().remove("checksum");

        let result = validate_package(&package);
        assert_eq!(result.errors, vec![FieldError::new("checksum", "is required")]);
    }

    #[test]
    fn checkpoint_results_are_not_full_packages() {
        let mut package = full_package();
        package["exportType"] = json!("checkpoint-results");

        let result = validate_package(&package);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "exportType");
    }

    #[test]
    fn accepts_legacy_race_config() {
        let package = signed(json!({
            "version": "2.0.0",
            "exportDate": "2023-04-01T09:00:00Z",
            "checksum": "",
            "exportType": "race-config",
            "raceConfig": {
                "name": "Valley 50",
                "date": "2023-04-02",
                "startTime": "07:00",
                "minRunner": 1,
                "maxRunner": 50,
                "checkpoints": [{"number": 1, "name": "Bridge"}],
                "runners": [{"number": 1}, {"number": 2, "status": "dnf"}],
                "checkpointRunners": [{"checkpointNumber": 1, "number": 2, "status": "passed"}]
            }
        }));

        let package = check_package(&package).unwrap();
        let ValidatedPackage::Legacy(legacy) = package else {
            panic!("expected a legacy package");
        };
        assert_eq!(legacy.race_config.runners.len(), 2);
        assert_eq!(legacy.race_config.checkpoint_runners[0].checkpoint_number, 1);
    }

    #[test]
    fn legacy_errors_are_rooted_at_race_config() {
        let package = signed(json!({
            "version": "2.0.0",
            "exportDate": "2023-04-01T09:00:00Z",
            "checksum": "",
            "exportType": "race-config",
            "raceConfig": {
                "name": "Valley 50",
                "date": "2023-04-02",
                "startTime": "7am",
                "minRunner": 1,
                "maxRunner": 50,
                "runners": [{"number": -1}]
            }
        }));

        let result = validate_package(&package);
        let paths: Vec<_> = result.errors.iter().map(|error| error.path.as_str()).collect();
        assert_eq!(paths, vec!["raceConfig.startTime", "raceConfig.runners[0].number"]);
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            check_package(&json!([1, 2])),
            Err(Error::MalformedPackage(_))
        ));
    }
}
