use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::form_urlencoded;

use crate::error::FhirError;
use crate::patient::{PATIENT_RESOURCE_TYPE, PatientResource};
use crate::search::SearchParams;

/// FHIR Bundle types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Searchset,
}

/// FHIR Bundle resource (simplified for search responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    pub id: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

/// Link relation on a Bundle (self, next, previous)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

impl BundleLink {
    pub fn new(relation: &str, url: String) -> Self {
        Self {
            relation: relation.to_string(),
            url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchEntryMode {
    Match,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleEntrySearch {
    pub mode: SearchEntryMode,
}

/// Single entry within a Bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    pub resource: JsonValue,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,
}

impl BundleEntry {
    pub fn new(full_url: Option<String>, resource: JsonValue) -> Self {
        Self {
            full_url,
            resource,
            search: None,
        }
    }

    pub fn matched(mut self) -> Self {
        self.search = Some(BundleEntrySearch {
            mode: SearchEntryMode::Match,
        });
        self
    }
}

impl Bundle {
    fn new(
        bundle_type: BundleType,
        total: u32,
        link: Vec<BundleLink>,
        entry: Vec<BundleEntry>,
    ) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            bundle_type,
            timestamp: Utc::now(),
            total: Some(total),
            link,
            entry,
        }
    }

    pub fn link(&self, relation: &str) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == relation)
            .map(|l| l.url.as_str())
    }
}

fn patient_url(base_url: &str, id: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), PATIENT_RESOURCE_TYPE, id)
}

/// Canonical type-level search URL with every supplied parameter
pub fn search_url(base_url: &str, params: &SearchParams) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.query_pairs())
        .finish();

    format!("{}/{}?{}", base_url.trim_end_matches('/'), PATIENT_RESOURCE_TYPE, query)
}

fn entry_for(base_url: &str, resource: &PatientResource) -> Result<BundleEntry, FhirError> {
    let full_url = resource.id.as_deref().map(|id| patient_url(base_url, id));
    Ok(BundleEntry::new(full_url, serde_json::to_value(resource)?))
}

/// Wrap a search result window into a `searchset` Bundle.
///
/// Adds `next`/`previous` links when the window does not cover the whole
/// filtered set.
pub fn build_search_bundle(
    resources: &[PatientResource],
    total: usize,
    params: &SearchParams,
    base_url: &str,
) -> Result<Bundle, FhirError> {
    let mut link = vec![BundleLink::new("self", search_url(base_url, params))];

    if params.offset + resources.len() < total && !resources.is_empty() {
        let next = params.at_offset(params.offset + params.count);
        link.push(BundleLink::new("next", search_url(base_url, &next)));
    }
    if params.offset > 0 {
        let previous = params.at_offset(params.offset.saturating_sub(params.count));
        link.push(BundleLink::new("previous", search_url(base_url, &previous)));
    }

    let entry = resources
        .iter()
        .map(|r| entry_for(base_url, r).map(BundleEntry::matched))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Bundle::new(
        BundleType::Searchset,
        u32::try_from(total).unwrap_or(u32::MAX),
        link,
        entry,
    ))
}

/// Wrap a patient plus related resources for `$everything`.
///
/// Related resources carry their own `resourceType` and `id`.
pub fn build_aggregate_bundle(
    primary: &PatientResource,
    related: &[JsonValue],
    base_url: &str,
) -> Result<Bundle, FhirError> {
    let base = base_url.trim_end_matches('/');
    let primary_id = primary.id.as_deref().unwrap_or_default();

    let mut entry = Vec::with_capacity(1 + related.len());
    entry.push(entry_for(base, primary)?);
    for resource in related {
        let full_url = match (
            resource.get("resourceType").and_then(JsonValue::as_str),
            resource.get("id").and_then(JsonValue::as_str),
        ) {
            (Some(kind), Some(id)) => Some(format!("{}/{}/{}", base, kind, id)),
            _ => None,
        };
        entry.push(BundleEntry::new(full_url, resource.clone()));
    }

    let self_link = BundleLink::new(
        "self",
        format!("{}/$everything", patient_url(base, primary_id)),
    );
    let total = u32::try_from(entry.len()).unwrap_or(u32::MAX);

    Ok(Bundle::new(BundleType::Searchset, total, vec![self_link], entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::PatientFilter;
    use serde_json::json;

    const BASE: &str = "https://example.org/fhir";

    fn patient(id: &str) -> PatientResource {
        serde_json::from_value(json!({
            "resourceType": "Patient",
            "id": id,
            "name": [{"family": "Test"}]
        }))
        .unwrap()
    }

    #[test]
    fn search_bundle_carries_total_and_full_urls() {
        let params = SearchParams::new(PatientFilter {
            family: Some("trem".into()),
            ..Default::default()
        });
        let bundle = build_search_bundle(&[patient("a"), patient("b")], 2, &params, BASE).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();

        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "searchset");
        assert_eq!(json["total"], 2);
        assert_eq!(json["entry"][0]["fullUrl"], "https://example.org/fhir/Patient/a");
        assert_eq!(json["entry"][1]["search"]["mode"], "match");
        assert_eq!(
            bundle.link("self"),
            Some("https://example.org/fhir/Patient?family=trem&_count=20&_offset=0")
        );
        assert!(bundle.link("next").is_none());
        assert!(bundle.link("previous").is_none());
    }

    #[test]
    fn self_link_encodes_values() {
        let params = SearchParams::new(PatientFilter {
            postal_code: Some("M5V 2T6".into()),
            ..Default::default()
        });
        let url = search_url(BASE, &params);
        assert_eq!(
            url,
            "https://example.org/fhir/Patient?address-postalcode=M5V+2T6&_count=20&_offset=0"
        );
    }

    #[test]
    fn paging_links_when_window_is_partial() {
        let params = SearchParams::default().with_page(Some(2), Some(2));
        let bundle = build_search_bundle(&[patient("c"), patient("d")], 5, &params, BASE).unwrap();

        assert_eq!(
            bundle.link("next"),
            Some("https://example.org/fhir/Patient?_count=2&_offset=4")
        );
        assert_eq!(
            bundle.link("previous"),
            Some("https://example.org/fhir/Patient?_count=2&_offset=0")
        );
    }

    #[test]
    fn empty_search_is_still_a_bundle() {
        let bundle = build_search_bundle(&[], 0, &SearchParams::default(), BASE).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();

        assert_eq!(json["total"], 0);
        assert!(json.get("entry").is_none());
    }

    #[test]
    fn aggregate_bundle_counts_primary_and_related() {
        let related = vec![json!({"resourceType": "Observation", "id": "obs-1"})];
        let bundle =
            build_aggregate_bundle(&patient("p1"), &related, "https://example.org/fhir/").unwrap();

        assert_eq!(bundle.total, Some(2));
        assert_eq!(bundle.entry.len(), 2);
        assert_eq!(
            bundle.entry[1].full_url.as_deref(),
            Some("https://example.org/fhir/Observation/obs-1")
        );
        assert_eq!(
            bundle.link("self"),
            Some("https://example.org/fhir/Patient/p1/$everything")
        );
    }

    #[test]
    fn aggregate_bundle_with_no_related() {
        let bundle = build_aggregate_bundle(&patient("p1"), &[], BASE).unwrap();
        assert_eq!(bundle.total, Some(1));
        assert!(bundle.entry[0].search.is_none());
    }
}
