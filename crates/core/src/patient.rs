//! Public Patient resource shape.
//!
//! Every collection element carries an explicit discriminant (`use`,
//! `system`) so selection rules are plain first-match lookups.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const PATIENT_RESOURCE_TYPE: &str = "Patient";

/// Canadian baseline Patient profile every stored patient conforms to
pub const CA_BASELINE_PATIENT_PROFILE: &str =
    "http://hl7.org/fhir/ca/baseline/StructureDefinition/profile-patient";

/// Identifier system emitted for the persisted health card number
pub const HEALTH_CARD_SYSTEM: &str =
    "https://fhir.infoway-inforoute.ca/NamingSystem/ca-on-patient-hcn";

/// Country emitted on every address
pub const DEFAULT_COUNTRY: &str = "CA";

/// Administrative gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Male, Gender::Female, Gender::Other, Gender::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown gender '{}'", s))
    }
}

/// A partial date: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BirthDate {
    value: String,
}

impl BirthDate {
    pub fn parse(value: &str) -> Option<Self> {
        Self::is_partial_date(value).then(|| Self {
            value: value.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    fn is_partial_date(value: &str) -> bool {
        let parts: Vec<&str> = value.split('-').collect();
        let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());

        match parts.as_slice() {
            [y] => digits(y, 4),
            [y, m] => digits(y, 4) && digits(m, 2),
            [y, m, d] => digits(y, 4) && digits(m, 2) && digits(d, 2),
            _ => false,
        }
    }
}

impl fmt::Display for BirthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for BirthDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BirthDate::parse(s).ok_or_else(|| format!("invalid partial date '{}'", s))
    }
}

impl Serialize for BirthDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for BirthDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Resource metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierUse {
    Usual,
    Official,
    Temp,
    Secondary,
    Old,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<IdentifierUse>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Identifier {
    /// Official use, or a provincial health card / health number system
    pub fn is_health_card(&self) -> bool {
        self.use_ == Some(IdentifierUse::Official)
            || self
                .system
                .as_deref()
                .is_some_and(|s| s.ends_with("-hcn") || s.ends_with("-phn"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    Usual,
    Official,
    Temp,
    Nickname,
    Anonymous,
    Old,
    Maiden,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<NameUse>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactPointSystem {
    Phone,
    Fax,
    Email,
    Pager,
    Url,
    Sms,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactPointUse {
    Home,
    Work,
    Temp,
    Old,
    Mobile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactPoint {
    pub system: ContactPointSystem,
    pub value: String,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<ContactPointUse>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AddressUse {
    Home,
    Work,
    Temp,
    Old,
    Billing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Postal,
    Physical,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<AddressUse>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<AddressType>,

    #[serde(default)]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// FHIR Patient resource (demographic subset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientResource {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<BirthDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
}

impl PatientResource {
    /// The name that round-trips into storage: first `official`, else first
    pub fn primary_name(&self) -> Option<&HumanName> {
        self.name
            .iter()
            .find(|n| n.use_ == Some(NameUse::Official))
            .or_else(|| self.name.first())
    }

    pub fn health_card(&self) -> Option<&Identifier> {
        self.identifier.iter().find(|i| i.is_health_card())
    }

    pub fn telecom_value(&self, system: ContactPointSystem) -> Option<&str> {
        self.telecom
            .iter()
            .find(|t| t.system == system)
            .map(|t| t.value.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.version_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn birth_date_accepts_partial_precision() {
        for good in ["1985", "1985-03", "1985-03-15"] {
            assert_eq!(BirthDate::parse(good).unwrap().as_str(), good);
        }
    }

    #[test]
    fn birth_date_rejects_other_shapes() {
        for bad in ["85", "1985-3", "1985/03/15", "1985-03-15T00:00", "", "abcd"] {
            assert!(BirthDate::parse(bad).is_none(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn primary_name_prefers_official() {
        let patient: PatientResource = serde_json::from_value(json!({
            "resourceType": "Patient",
            "name": [
                {"use": "nickname", "given": ["Sally"]},
                {"use": "official", "family": "Wilson", "given": ["Sarah"]}
            ]
        }))
        .unwrap();

        assert_eq!(patient.primary_name().unwrap().family.as_deref(), Some("Wilson"));
    }

    #[test]
    fn primary_name_falls_back_to_first() {
        let patient: PatientResource = serde_json::from_value(json!({
            "resourceType": "Patient",
            "name": [{"family": "Chen"}, {"family": "Other"}]
        }))
        .unwrap();

        assert_eq!(patient.primary_name().unwrap().family.as_deref(), Some("Chen"));
    }

    #[test]
    fn health_card_matches_provincial_systems() {
        let id = Identifier {
            use_: None,
            system: Some("https://fhir.infoway-inforoute.ca/NamingSystem/ca-bc-patient-phn".into()),
            value: Some("9123-456-789-BC".into()),
        };
        assert!(id.is_health_card());

        let mrn = Identifier {
            use_: Some(IdentifierUse::Usual),
            system: Some("urn:example:mrn".into()),
            value: Some("42".into()),
        };
        assert!(!mrn.is_health_card());
    }

    #[test]
    fn empty_collections_are_omitted() {
        let patient = PatientResource {
            resource_type: PATIENT_RESOURCE_TYPE.to_string(),
            id: Some("p1".into()),
            meta: None,
            identifier: vec![],
            name: vec![],
            gender: Some(Gender::Other),
            birth_date: None,
            telecom: vec![],
            address: vec![],
        };
        let json = serde_json::to_value(&patient).unwrap();

        assert!(json.get("identifier").is_none());
        assert!(json.get("telecom").is_none());
        assert!(json.get("address").is_none());
        assert_eq!(json["gender"], "other");
    }
}
