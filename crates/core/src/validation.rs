//! Structural validation of incoming Patient payloads.
//!
//! Rules run against the raw JSON so that every violation is reported, not
//! just the first one a typed deserializer would trip over.

use serde_json::Value as JsonValue;

use crate::error::FhirError;
use crate::patient::{BirthDate, Gender, PATIENT_RESOURCE_TYPE, PatientResource};

/// Check a candidate Patient payload. Returns an empty list when valid.
pub fn validate(resource: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();

    if resource.get("resourceType").and_then(JsonValue::as_str) != Some(PATIENT_RESOURCE_TYPE) {
        violations.push(format!("resourceType must be \"{}\"", PATIENT_RESOURCE_TYPE));
    }

    let names = resource
        .get("name")
        .and_then(JsonValue::as_array)
        .filter(|names| !names.is_empty());
    match names {
        None => violations.push("At least one name is required".to_string()),
        Some(names) => {
            if !primary_family_present(names) {
                violations.push("Patient name must include a family name".to_string());
            }
        }
    }

    if let Some(gender) = present(resource, "gender") {
        let valid = gender
            .as_str()
            .is_some_and(|g| g.parse::<Gender>().is_ok());
        if !valid {
            let allowed: Vec<&str> = Gender::ALL.iter().map(Gender::as_str).collect();
            violations.push(format!("gender must be one of: {}", allowed.join(", ")));
        }
    }

    if let Some(birth_date) = present(resource, "birthDate") {
        if birth_date.as_str().and_then(BirthDate::parse).is_none() {
            violations.push("birthDate must be in format YYYY, YYYY-MM, or YYYY-MM-DD".to_string());
        }
    }

    violations
}

/// Validate and then deserialize into the typed resource
pub fn parse_patient(resource: JsonValue) -> Result<PatientResource, FhirError> {
    let violations = validate(&resource);
    if !violations.is_empty() {
        return Err(FhirError::Invalid(violations));
    }

    serde_json::from_value(resource)
        .map_err(|e| FhirError::invalid(format!("Invalid Patient resource: {}", e)))
}

/// Logical ids: 1-64 letters, digits, '-' or '.'
pub fn validate_id(id: &str) -> Option<String> {
    let valid = (1..=64).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.');

    (!valid).then(|| format!("Invalid resource id '{}'", id))
}

fn present<'a>(resource: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    resource.get(key).filter(|v| !v.is_null())
}

fn primary_family_present(names: &[JsonValue]) -> bool {
    let primary = names
        .iter()
        .find(|n| n.get("use").and_then(JsonValue::as_str) == Some("official"))
        .or_else(|| names.first());

    primary
        .and_then(|n| n.get("family"))
        .and_then(JsonValue::as_str)
        .is_some_and(|family| !family.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_patient_is_valid() {
        let patient = json!({"resourceType": "Patient", "name": [{"family": "Test"}]});
        assert!(validate(&patient).is_empty());
    }

    #[test]
    fn missing_name_is_reported() {
        let patient = json!({"resourceType": "Patient", "gender": "male"});
        assert_eq!(validate(&patient), vec!["At least one name is required"]);

        let empty = json!({"resourceType": "Patient", "name": []});
        assert_eq!(validate(&empty), vec!["At least one name is required"]);
    }

    #[test]
    fn all_violations_are_collected() {
        let patient = json!({
            "resourceType": "Observation",
            "gender": "robot",
            "birthDate": "15/03/1985"
        });

        let violations = validate(&patient);
        assert_eq!(violations.len(), 4);
        assert_eq!(violations[0], "resourceType must be \"Patient\"");
        assert_eq!(violations[1], "At least one name is required");
        assert_eq!(violations[2], "gender must be one of: male, female, other, unknown");
        assert_eq!(violations[3], "birthDate must be in format YYYY, YYYY-MM, or YYYY-MM-DD");
    }

    #[test]
    fn partial_birth_dates_are_accepted() {
        for date in ["1985", "1985-03", "1985-03-15"] {
            let patient = json!({
                "resourceType": "Patient",
                "name": [{"family": "Test"}],
                "birthDate": date
            });
            assert!(validate(&patient).is_empty(), "{} should be accepted", date);
        }
    }

    #[test]
    fn official_name_needs_family() {
        let patient = json!({
            "resourceType": "Patient",
            "name": [{"family": "Fallback"}, {"use": "official", "given": ["Only"]}]
        });
        assert_eq!(validate(&patient), vec!["Patient name must include a family name"]);
    }

    #[test]
    fn ids_follow_fhir_id_rules() {
        assert!(validate_id("test-patient-001").is_none());
        assert!(validate_id("a.b-C9").is_none());
        assert!(validate_id("").is_some());
        assert!(validate_id("has/slash").is_some());
        assert!(validate_id(&"x".repeat(65)).is_some());
    }

    #[test]
    fn parse_rejects_before_deserializing() {
        let err = parse_patient(json!({"resourceType": "Patient"})).unwrap_err();
        match err {
            FhirError::Invalid(messages) => {
                assert_eq!(messages, vec!["At least one name is required"])
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parse_reports_structural_errors() {
        let err = parse_patient(json!({
            "resourceType": "Patient",
            "name": [{"family": "Test"}],
            "telecom": [{"system": "carrier-pigeon", "value": "coo"}]
        }))
        .unwrap_err();
        assert!(matches!(err, FhirError::Invalid(_)));
    }
}
