//! Reference patients loaded into an empty in-memory store.

use serde_json::{Value as JsonValue, json};

/// Five reference patients, in insertion order
pub fn reference_patients() -> Vec<JsonValue> {
    vec![
        json!({
            "resourceType": "Patient",
            "id": "test-patient-001",
            "identifier": [{
                "use": "official",
                "system": "https://fhir.infoway-inforoute.ca/NamingSystem/ca-on-patient-hcn",
                "value": "1234-567-890-ON"
            }],
            "name": [{"use": "official", "family": "Tremblay", "given": ["Marie", "Claire"]}],
            "gender": "female",
            "birthDate": "1985-03-15",
            "telecom": [
                {"system": "phone", "value": "416-555-0101", "use": "home"},
                {"system": "email", "value": "marie.tremblay@example.com"}
            ],
            "address": [{
                "use": "home",
                "type": "physical",
                "line": ["123 Maple Street", "Apt 4B"],
                "city": "Toronto",
                "state": "ON",
                "postalCode": "M5V 2T6",
                "country": "CA"
            }]
        }),
        json!({
            "resourceType": "Patient",
            "id": "test-patient-002",
            "identifier": [{
                "use": "official",
                "system": "https://fhir.infoway-inforoute.ca/NamingSystem/ca-on-patient-hcn",
                "value": "9876-543-210-ON"
            }],
            "name": [{"use": "official", "family": "Singh", "given": ["Rajiv"]}],
            "gender": "male",
            "birthDate": "1978-11-22",
            "telecom": [
                {"system": "phone", "value": "905-555-0202", "use": "mobile"},
                {"system": "email", "value": "rajiv.singh@example.com"}
            ],
            "address": [{
                "use": "home",
                "line": ["456 Oak Avenue"],
                "city": "Mississauga",
                "state": "ON",
                "postalCode": "L5B 3C7",
                "country": "CA"
            }]
        }),
        json!({
            "resourceType": "Patient",
            "id": "test-patient-003",
            "identifier": [{
                "use": "official",
                "system": "https://fhir.infoway-inforoute.ca/NamingSystem/ca-bc-patient-phn",
                "value": "9123-456-789-BC"
            }],
            "name": [{"use": "official", "family": "Chen", "given": ["Wei", "Lin"]}],
            "gender": "female",
            "birthDate": "1992-07-08",
            "telecom": [{"system": "phone", "value": "604-555-0303", "use": "home"}],
            "address": [{
                "use": "home",
                "line": ["789 Pine Road"],
                "city": "Vancouver",
                "state": "BC",
                "postalCode": "V6B 1A1",
                "country": "CA"
            }]
        }),
        json!({
            "resourceType": "Patient",
            "id": "test-patient-004",
            "name": [{"use": "official", "family": "MacDonald", "given": ["James", "Robert"]}],
            "gender": "male",
            "birthDate": "1965-01-30",
            "telecom": [{"system": "phone", "value": "514-555-0404", "use": "home"}],
            "address": [{
                "use": "home",
                "line": ["321 Birch Lane"],
                "city": "Montreal",
                "state": "QC",
                "postalCode": "H3B 2Y5",
                "country": "CA"
            }]
        }),
        json!({
            "resourceType": "Patient",
            "id": "test-patient-005",
            "identifier": [{
                "use": "official",
                "system": "https://fhir.infoway-inforoute.ca/NamingSystem/ca-ab-patient-phn",
                "value": "5678-901-234-AB"
            }],
            "name": [
                {"use": "official", "family": "Wilson", "given": ["Sarah"]},
                {"use": "nickname", "given": ["Sally"]}
            ],
            "gender": "female",
            "birthDate": "2001-12-05",
            "telecom": [
                {"system": "phone", "value": "403-555-0505", "use": "mobile"},
                {"system": "email", "value": "s.wilson@example.com"}
            ],
            "address": [{
                "use": "home",
                "line": ["555 Cedar Boulevard"],
                "city": "Calgary",
                "state": "AB",
                "postalCode": "T2P 1J9",
                "country": "CA"
            }]
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    #[test]
    fn reference_patients_are_valid() {
        for patient in reference_patients() {
            assert!(validate(&patient).is_empty(), "{}", patient["id"]);
        }
    }
}
