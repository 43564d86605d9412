use serde::{Deserialize, Serialize};

use crate::patient::CA_BASELINE_PATIENT_PROFILE;

/// FHIR CapabilityStatement resource (simplified)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatement {
    pub resource_type: String,
    pub status: String,
    pub date: String,
    pub kind: String,
    pub fhir_version: String,
    pub format: Vec<String>,
    pub rest: Vec<CapabilityRest>,
}

impl CapabilityStatement {
    /// Create the capability statement for this server
    pub fn new() -> Self {
        Self {
            resource_type: "CapabilityStatement".to_string(),
            status: "active".to_string(),
            date: "2026-02-02".to_string(),
            kind: "instance".to_string(),
            fhir_version: "4.0.1".to_string(), // R4
            format: vec!["json".to_string(), "application/fhir+json".to_string()],
            rest: vec![CapabilityRest::default()],
        }
    }
}

impl Default for CapabilityStatement {
    fn default() -> Self {
        Self::new()
    }
}

/// REST capability declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRest {
    pub mode: String,
    pub resource: Vec<CapabilityResource>,
}

impl Default for CapabilityRest {
    fn default() -> Self {
        Self {
            mode: "server".to_string(),
            resource: vec![CapabilityResource::patient()],
        }
    }
}

/// Per-resource capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub profile: String,
    pub supported_profile: Vec<String>,
    pub interaction: Vec<Interaction>,
    pub versioning: String,
    pub read_history: bool,
    pub update_create: bool,
    pub search_param: Vec<SearchParamDef>,
    pub operation: Vec<OperationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub documentation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDef {
    pub name: String,
    pub definition: String,
}

/// Search parameters understood by `GET /Patient`
pub const PATIENT_SEARCH_PARAMS: &[(&str, &str, &str)] = &[
    ("_id", "token", "Logical ID of the patient"),
    ("identifier", "token", "Patient identifier (e.g., health card number)"),
    ("family", "string", "Family (last) name"),
    ("given", "string", "Given (first) name"),
    ("name", "string", "Any part of the name"),
    ("birthdate", "date", "Date of birth"),
    ("gender", "token", "Gender (male | female | other | unknown)"),
    ("phone", "token", "Phone number"),
    ("email", "token", "Email address"),
    ("address", "string", "Any part of the address"),
    ("address-city", "string", "City"),
    ("address-state", "string", "Province/State"),
    ("address-postalcode", "string", "Postal/ZIP code"),
];

impl CapabilityResource {
    pub fn patient() -> Self {
        let interaction = ["read", "search-type", "create", "update", "delete"]
            .into_iter()
            .map(|code| Interaction {
                code: code.to_string(),
            })
            .collect();

        let search_param = PATIENT_SEARCH_PARAMS
            .iter()
            .map(|(name, param_type, documentation)| SearchParamDef {
                name: name.to_string(),
                param_type: param_type.to_string(),
                documentation: documentation.to_string(),
            })
            .collect();

        Self {
            resource_type: "Patient".to_string(),
            profile: "http://hl7.org/fhir/StructureDefinition/Patient".to_string(),
            supported_profile: vec![CA_BASELINE_PATIENT_PROFILE.to_string()],
            interaction,
            versioning: "versioned".to_string(),
            read_history: false,
            update_create: false,
            search_param,
            operation: vec![
                OperationDef {
                    name: "everything".to_string(),
                    definition: "http://hl7.org/fhir/OperationDefinition/Patient-everything"
                        .to_string(),
                },
                OperationDef {
                    name: "validate".to_string(),
                    definition: "http://hl7.org/fhir/OperationDefinition/Resource-validate"
                        .to_string(),
                },
            ],
        }
    }
}
