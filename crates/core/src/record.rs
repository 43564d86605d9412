//! Persisted patient record and its mapping to the public resource.
//!
//! `to_public` and `to_fields` are inverses on every field they both cover:
//! the official name (first given only), the health card number, the first
//! phone and email, and the first address.

use chrono::{DateTime, Utc};

use crate::patient::{
    Address, AddressType, AddressUse, BirthDate, CA_BASELINE_PATIENT_PROFILE, ContactPoint,
    ContactPointSystem, ContactPointUse, DEFAULT_COUNTRY, Gender, HEALTH_CARD_SYSTEM, HumanName,
    Identifier, IdentifierUse, Meta, NameUse, PATIENT_RESOURCE_TYPE, PatientResource,
};

/// Demographic columns of a stored patient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    pub health_card_number: Option<String>,
    pub family_name: String,
    pub given_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<BirthDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

impl PatientFields {
    fn has_address(&self) -> bool {
        self.address_line.is_some()
            || self.city.is_some()
            || self.province.is_some()
            || self.postal_code.is_some()
    }
}

/// One row of patient storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    pub id: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: PatientFields,
}

impl PatientRecord {
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn to_public(&self) -> PatientResource {
        to_public(self)
    }
}

/// Map a stored record to its public shape, omitting empty collections
pub fn to_public(record: &PatientRecord) -> PatientResource {
    let f = &record.fields;

    let identifier = f
        .health_card_number
        .iter()
        .map(|value| Identifier {
            use_: Some(IdentifierUse::Official),
            system: Some(HEALTH_CARD_SYSTEM.to_string()),
            value: Some(value.clone()),
        })
        .collect();

    let name = vec![HumanName {
        use_: Some(NameUse::Official),
        family: Some(f.family_name.clone()),
        given: f.given_name.iter().cloned().collect(),
    }];

    let mut telecom = Vec::new();
    if let Some(phone) = &f.phone {
        telecom.push(ContactPoint {
            system: ContactPointSystem::Phone,
            value: phone.clone(),
            use_: Some(ContactPointUse::Home),
        });
    }
    if let Some(email) = &f.email {
        telecom.push(ContactPoint {
            system: ContactPointSystem::Email,
            value: email.clone(),
            use_: None,
        });
    }

    let address = if f.has_address() {
        vec![Address {
            use_: Some(AddressUse::Home),
            type_: Some(AddressType::Physical),
            line: f.address_line.iter().cloned().collect(),
            city: f.city.clone(),
            state: f.province.clone(),
            postal_code: f.postal_code.clone(),
            country: Some(DEFAULT_COUNTRY.to_string()),
        }]
    } else {
        Vec::new()
    };

    PatientResource {
        resource_type: PATIENT_RESOURCE_TYPE.to_string(),
        id: Some(record.id.clone()),
        meta: Some(Meta {
            version_id: Some(record.version.to_string()),
            last_updated: Some(record.last_updated()),
            profile: vec![CA_BASELINE_PATIENT_PROFILE.to_string()],
        }),
        identifier,
        name,
        gender: f.gender,
        birth_date: f.birth_date.clone(),
        telecom,
        address,
    }
}

/// Extract the persisted columns from a public resource.
///
/// Fields absent from the resource stay unset. Callers validate first, so a
/// missing family name only occurs for resources that never reach storage.
pub fn to_fields(resource: &PatientResource) -> PatientFields {
    let name = resource.primary_name();
    let address = resource.address.first();

    PatientFields {
        health_card_number: resource.health_card().and_then(|i| i.value.clone()),
        family_name: name.and_then(|n| n.family.clone()).unwrap_or_default(),
        given_name: name.and_then(|n| n.given.first().cloned()),
        gender: resource.gender,
        birth_date: resource.birth_date.clone(),
        phone: resource
            .telecom_value(ContactPointSystem::Phone)
            .map(str::to_string),
        email: resource
            .telecom_value(ContactPointSystem::Email)
            .map(str::to_string),
        address_line: address.and_then(|a| a.line.first().cloned()),
        city: address.and_then(|a| a.city.clone()),
        province: address.and_then(|a| a.state.clone()),
        postal_code: address.and_then(|a| a.postal_code.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn full_record() -> PatientRecord {
        PatientRecord {
            id: "test-patient-001".into(),
            version: 3,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            updated_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            fields: PatientFields {
                health_card_number: Some("1234-567-890-ON".into()),
                family_name: "Tremblay".into(),
                given_name: Some("Marie".into()),
                gender: Some(Gender::Female),
                birth_date: BirthDate::parse("1985-03-15"),
                phone: Some("416-555-0101".into()),
                email: Some("marie.tremblay@example.com".into()),
                address_line: Some("123 Maple Street".into()),
                city: Some("Toronto".into()),
                province: Some("ON".into()),
                postal_code: Some("M5V 2T6".into()),
            },
        }
    }

    #[test]
    fn public_shape_mirrors_record() {
        let record = full_record();
        let json = serde_json::to_value(to_public(&record)).unwrap();

        assert_eq!(json["resourceType"], "Patient");
        assert_eq!(json["id"], "test-patient-001");
        assert_eq!(json["meta"]["versionId"], "3");
        assert_eq!(json["meta"]["profile"], json!([CA_BASELINE_PATIENT_PROFILE]));
        assert_eq!(json["identifier"][0]["system"], HEALTH_CARD_SYSTEM);
        assert_eq!(json["identifier"][0]["value"], "1234-567-890-ON");
        assert_eq!(json["name"][0]["use"], "official");
        assert_eq!(json["name"][0]["given"], json!(["Marie"]));
        assert_eq!(json["birthDate"], "1985-03-15");
        assert_eq!(json["telecom"][0]["system"], "phone");
        assert_eq!(json["telecom"][0]["use"], "home");
        assert_eq!(json["telecom"][1]["system"], "email");
        assert!(json["telecom"][1].get("use").is_none());
        assert_eq!(json["address"][0]["postalCode"], "M5V 2T6");
        assert_eq!(json["address"][0]["country"], "CA");
    }

    #[test]
    fn last_updated_falls_back_to_created_at() {
        let mut record = full_record();
        record.updated_at = None;

        let meta = to_public(&record).meta.unwrap();
        assert_eq!(meta.last_updated, Some(record.created_at));
    }

    #[test]
    fn sparse_record_omits_collections() {
        let mut record = full_record();
        record.fields = PatientFields {
            family_name: "Solo".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(to_public(&record)).unwrap();

        assert!(json.get("identifier").is_none());
        assert!(json.get("telecom").is_none());
        assert!(json.get("address").is_none());
        assert!(json.get("gender").is_none());
        assert_eq!(json["name"][0]["given"], json!([]));
    }

    #[test]
    fn fields_round_trip_through_public_shape() {
        let record = full_record();
        assert_eq!(to_fields(&to_public(&record)), record.fields);
    }

    #[test]
    fn public_shape_is_stable_under_round_trip() {
        let record = full_record();
        let public = to_public(&record);
        let again = PatientRecord {
            fields: to_fields(&public),
            ..record.clone()
        };

        assert_eq!(to_public(&again), public);
    }

    #[test]
    fn to_fields_selects_first_matches() {
        let resource: PatientResource = serde_json::from_value(json!({
            "resourceType": "Patient",
            "identifier": [
                {"system": "urn:example:mrn", "value": "MRN-1"},
                {"use": "official", "system": "urn:example:hcn", "value": "HC-1"}
            ],
            "name": [
                {"use": "nickname", "given": ["Sally"]},
                {"use": "official", "family": "Wilson", "given": ["Sarah", "Jane"]}
            ],
            "telecom": [
                {"system": "email", "value": "first@example.com"},
                {"system": "phone", "value": "403-555-0505", "use": "mobile"},
                {"system": "phone", "value": "403-555-9999"},
                {"system": "email", "value": "second@example.com"}
            ],
            "address": [
                {"line": ["555 Cedar Boulevard", "Unit 2"], "city": "Calgary", "state": "AB", "postalCode": "T2P 1J9"},
                {"city": "Edmonton"}
            ]
        }))
        .unwrap();

        let fields = to_fields(&resource);
        assert_eq!(fields.health_card_number.as_deref(), Some("HC-1"));
        assert_eq!(fields.family_name, "Wilson");
        assert_eq!(fields.given_name.as_deref(), Some("Sarah"));
        assert_eq!(fields.phone.as_deref(), Some("403-555-0505"));
        assert_eq!(fields.email.as_deref(), Some("first@example.com"));
        assert_eq!(fields.address_line.as_deref(), Some("555 Cedar Boulevard"));
        assert_eq!(fields.city.as_deref(), Some("Calgary"));
        assert_eq!(fields.province.as_deref(), Some("AB"));
    }

    #[test]
    fn absent_fields_stay_unset() {
        let resource: PatientResource = serde_json::from_value(json!({
            "resourceType": "Patient",
            "name": [{"family": "Bare"}]
        }))
        .unwrap();

        let fields = to_fields(&resource);
        assert_eq!(
            fields,
            PatientFields {
                family_name: "Bare".into(),
                ..Default::default()
            }
        );
    }
}
