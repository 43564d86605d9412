//! Patient search: filter predicates and pagination.
//!
//! Every supplied filter must hold (logical AND). `total` is the filtered
//! count; the offset/limit window is applied to the filtered set afterwards.

use crate::record::PatientRecord;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Independently optional filter predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilter {
    /// Exact logical id
    pub id: Option<String>,
    /// Substring of the health card number
    pub identifier: Option<String>,
    /// Case-insensitive substring of the family name
    pub family: Option<String>,
    /// Case-insensitive substring of the given name
    pub given: Option<String>,
    /// Case-insensitive substring of family or given name
    pub name: Option<String>,
    /// Exact partial date
    pub birthdate: Option<String>,
    /// Exact gender code
    pub gender: Option<String>,
    /// Substring of the phone number
    pub phone: Option<String>,
    /// Case-insensitive substring of the email
    pub email: Option<String>,
    /// Case-insensitive substring of any address part
    pub address: Option<String>,
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    /// Exact region (province / state)
    pub state: Option<String>,
    /// Whitespace-stripped, case-insensitive prefix of the postal code
    pub postal_code: Option<String>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Strip all whitespace and upper-case, so "m5v 2t6" compares as "M5V2T6"
pub fn normalize_postal_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

impl PatientFilter {
    /// Drop blank values; a blank filter is the same as no filter
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            id: keep(self.id),
            identifier: keep(self.identifier),
            family: keep(self.family),
            given: keep(self.given),
            name: keep(self.name),
            birthdate: keep(self.birthdate),
            gender: keep(self.gender),
            phone: keep(self.phone),
            email: keep(self.email),
            address: keep(self.address),
            city: keep(self.city),
            state: keep(self.state),
            postal_code: keep(self.postal_code),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate every supplied predicate against a record
    pub fn matches(&self, record: &PatientRecord) -> bool {
        let f = &record.fields;

        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }
        if let Some(identifier) = &self.identifier {
            if !f
                .health_card_number
                .as_deref()
                .is_some_and(|hcn| hcn.contains(identifier.as_str()))
            {
                return false;
            }
        }
        if let Some(family) = &self.family {
            if !contains_ci(Some(f.family_name.as_str()), family) {
                return false;
            }
        }
        if let Some(given) = &self.given {
            if !contains_ci(f.given_name.as_deref(), given) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !contains_ci(Some(f.family_name.as_str()), name)
                && !contains_ci(f.given_name.as_deref(), name)
            {
                return false;
            }
        }
        if let Some(birthdate) = &self.birthdate {
            if f.birth_date.as_ref().map(|d| d.as_str()) != Some(birthdate.as_str()) {
                return false;
            }
        }
        if let Some(gender) = &self.gender {
            if f.gender.map(|g| g.as_str()) != Some(gender.as_str()) {
                return false;
            }
        }
        if let Some(phone) = &self.phone {
            if !f.phone.as_deref().is_some_and(|p| p.contains(phone.as_str())) {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if !contains_ci(f.email.as_deref(), email) {
                return false;
            }
        }
        if let Some(address) = &self.address {
            let parts = [&f.address_line, &f.city, &f.province, &f.postal_code];
            if !parts.iter().any(|part| contains_ci(part.as_deref(), address)) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !contains_ci(f.city.as_deref(), city) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if f.province.as_deref() != Some(state.as_str()) {
                return false;
            }
        }
        if let Some(prefix) = &self.postal_code {
            let prefix = normalize_postal_code(prefix);
            if !f
                .postal_code
                .as_deref()
                .is_some_and(|code| normalize_postal_code(code).starts_with(&prefix))
            {
                return false;
            }
        }

        true
    }
}

/// A complete search request: predicates plus the result window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub filter: PatientFilter,
    pub offset: usize,
    pub count: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            filter: PatientFilter::default(),
            offset: 0,
            count: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchParams {
    pub fn new(filter: PatientFilter) -> Self {
        Self {
            filter: filter.normalized(),
            ..Self::default()
        }
    }

    /// Normalize raw paging inputs.
    ///
    /// A missing, zero or negative `_count` falls back to the default page
    /// size; a negative `_offset` becomes 0.
    pub fn with_page(mut self, offset: Option<i64>, count: Option<i64>) -> Self {
        self.offset = offset.and_then(|o| usize::try_from(o).ok()).unwrap_or(0);
        self.count = count
            .and_then(|c| usize::try_from(c).ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        self
    }

    /// Bound the page size
    pub fn capped(mut self, max_count: Option<usize>) -> Self {
        if let Some(max) = max_count {
            self.count = self.count.min(max.max(1));
        }
        self
    }

    /// Supplied parameters in canonical order, as they appear in links
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let f = &self.filter;
        let named = [
            ("_id", &f.id),
            ("identifier", &f.identifier),
            ("family", &f.family),
            ("given", &f.given),
            ("name", &f.name),
            ("birthdate", &f.birthdate),
            ("gender", &f.gender),
            ("phone", &f.phone),
            ("email", &f.email),
            ("address", &f.address),
            ("address-city", &f.city),
            ("address-state", &f.state),
            ("address-postalcode", &f.postal_code),
        ];

        let mut pairs: Vec<(&'static str, String)> = named
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v.clone())))
            .collect();
        pairs.push(("_count", self.count.to_string()));
        pairs.push(("_offset", self.offset.to_string()));
        pairs
    }

    /// The same search moved to another offset
    pub fn at_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

/// Apply a filter and window to an ordered candidate set
pub fn apply<'a, I>(
    candidates: I,
    filter: &PatientFilter,
    offset: usize,
    limit: usize,
) -> (Vec<PatientRecord>, usize)
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    let matched: Vec<&PatientRecord> = candidates
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    let total = matched.len();
    let window = matched
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    (window, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{BirthDate, Gender};
    use crate::record::PatientFields;
    use chrono::Utc;

    fn record(id: &str, family: &str, given: &str, postal: &str) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            version: 1,
            created_at: Utc::now(),
            updated_at: None,
            fields: PatientFields {
                family_name: family.into(),
                given_name: Some(given.into()),
                gender: Some(Gender::Female),
                birth_date: BirthDate::parse("1985-03-15"),
                city: Some("Toronto".into()),
                province: Some("ON".into()),
                postal_code: Some(postal.into()),
                health_card_number: Some("1234-567-890-ON".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn family_is_case_insensitive_substring() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        let filter = PatientFilter {
            family: Some("trem".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));
    }

    #[test]
    fn name_matches_family_or_given() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        let by_given = PatientFilter {
            name: Some("MAR".into()),
            ..Default::default()
        };
        let miss = PatientFilter {
            name: Some("singh".into()),
            ..Default::default()
        };
        assert!(by_given.matches(&r));
        assert!(!miss.matches(&r));
    }

    #[test]
    fn given_is_case_insensitive_and_ignores_family() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        let given = |v: &str| PatientFilter {
            given: Some(v.into()),
            ..Default::default()
        };
        assert!(given("MAR").matches(&r));
        assert!(given("rie").matches(&r));
        assert!(!given("trem").matches(&r));
    }

    #[test]
    fn address_matches_any_address_part() {
        let mut r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        r.fields.address_line = Some("123 Maple Street".into());

        // line, city, province, postal code
        for needle in ["maple", "TORON", "on", "2t6"] {
            let filter = PatientFilter {
                address: Some(needle.into()),
                ..Default::default()
            };
            assert!(filter.matches(&r), "{} should match", needle);
        }

        let miss = PatientFilter {
            address: Some("vancouver".into()),
            ..Default::default()
        };
        assert!(!miss.matches(&r));
    }

    #[test]
    fn postal_code_is_whitespace_insensitive_prefix() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        for prefix in ["M5V", "m5v2", "M5V 2T6", " m5v "] {
            let filter = PatientFilter {
                postal_code: Some(prefix.into()),
                ..Default::default()
            };
            assert!(filter.matches(&r), "{} should match", prefix);
        }

        let suffix = PatientFilter {
            postal_code: Some("2T6".into()),
            ..Default::default()
        };
        assert!(!suffix.matches(&r));
    }

    #[test]
    fn region_and_gender_are_exact() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        let on = PatientFilter {
            state: Some("ON".into()),
            gender: Some("female".into()),
            ..Default::default()
        };
        let lower = PatientFilter {
            state: Some("on".into()),
            ..Default::default()
        };
        assert!(on.matches(&r));
        assert!(!lower.matches(&r));
    }

    #[test]
    fn filters_combine_with_and() {
        let r = record("p1", "Tremblay", "Marie", "M5V 2T6");
        let filter = PatientFilter {
            family: Some("trem".into()),
            birthdate: Some("1990-01-01".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }

    #[test]
    fn blank_filters_are_ignored() {
        let filter = PatientFilter {
            family: Some("  ".into()),
            city: Some(String::new()),
            ..Default::default()
        }
        .normalized();
        assert!(filter.is_empty());
    }

    #[test]
    fn paging_defaults_and_cap() {
        let params = SearchParams::default().with_page(Some(-3), Some(0));
        assert_eq!((params.offset, params.count), (0, DEFAULT_PAGE_SIZE));

        let capped = SearchParams::default()
            .with_page(Some(5), Some(5000))
            .capped(Some(100));
        assert_eq!((capped.offset, capped.count), (5, 100));
    }

    #[test]
    fn total_counts_filtered_set_before_window() {
        let records = vec![
            record("p1", "Tremblay", "Marie", "M5V 2T6"),
            record("p2", "Singh", "Rajiv", "L5B 3C7"),
            record("p3", "Tremblay", "Luc", "H3B 2Y5"),
        ];
        let filter = PatientFilter {
            family: Some("tremblay".into()),
            ..Default::default()
        };

        let (window, total) = apply(&records, &filter, 1, 1);
        assert_eq!(total, 2);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "p3");
    }

    #[test]
    fn query_pairs_follow_canonical_order() {
        let params = SearchParams::new(PatientFilter {
            postal_code: Some("M5V".into()),
            family: Some("trem".into()),
            id: Some("abc".into()),
            ..Default::default()
        });

        let keys: Vec<&str> = params.query_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["_id", "family", "address-postalcode", "_count", "_offset"]);
    }
}
