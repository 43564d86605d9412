use std::fmt::Display;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use patient_core::search::normalize_postal_code;
use patient_core::store::{Expected, PatientStore, QueryPage};
use patient_core::{
    BirthDate, Gender, PatientFields, PatientFilter, PatientRecord, StoreError, StoreResult,
};
use tokio_postgres::{IsolationLevel, Row};
use tokio_postgres::types::ToSql;

const COLUMNS: &str = "id, version, health_card_number, family_name, given_name, gender, \
     birth_date, phone, email, address_line, city, province, postal_code, created_at, updated_at";

fn backend(err: impl Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Escape special characters for LIKE patterns
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like(s))
}

type Param = Box<dyn ToSql + Sync + Send>;

/// WHERE clause assembled from the supplied filters
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl Conditions {
    /// Add a clause; every `{}` in `template` becomes the new placeholder
    fn push(&mut self, template: &str, value: impl ToSql + Sync + Send + 'static) {
        self.params.push(Box::new(value));
        let placeholder = format!("${}", self.params.len());
        self.clauses.push(template.replace("{}", &placeholder));
    }

    fn from_filter(filter: &PatientFilter) -> Self {
        let mut c = Self::default();

        if let Some(id) = &filter.id {
            c.push("id = {}", id.clone());
        }
        if let Some(identifier) = &filter.identifier {
            c.push("health_card_number LIKE {}", contains_pattern(identifier));
        }
        if let Some(family) = &filter.family {
            c.push("family_name ILIKE {}", contains_pattern(family));
        }
        if let Some(given) = &filter.given {
            c.push("given_name ILIKE {}", contains_pattern(given));
        }
        if let Some(name) = &filter.name {
            c.push("(family_name ILIKE {} OR given_name ILIKE {})", contains_pattern(name));
        }
        if let Some(birthdate) = &filter.birthdate {
            c.push("birth_date = {}", birthdate.clone());
        }
        if let Some(gender) = &filter.gender {
            c.push("gender = {}", gender.clone());
        }
        if let Some(phone) = &filter.phone {
            c.push("phone LIKE {}", contains_pattern(phone));
        }
        if let Some(email) = &filter.email {
            c.push("email ILIKE {}", contains_pattern(email));
        }
        if let Some(address) = &filter.address {
            c.push(
                "(address_line ILIKE {} OR city ILIKE {} OR province ILIKE {} OR postal_code ILIKE {})",
                contains_pattern(address),
            );
        }
        if let Some(city) = &filter.city {
            c.push("city ILIKE {}", contains_pattern(city));
        }
        if let Some(state) = &filter.state {
            c.push("province = {}", state.clone());
        }
        if let Some(postal_code) = &filter.postal_code {
            let prefix = format!("{}%", escape_like(&normalize_postal_code(postal_code)));
            c.push(
                r"upper(regexp_replace(postal_code, '\s', '', 'g')) LIKE {}",
                prefix,
            );
        }

        c
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Map a row to a record; a stored code the domain no longer accepts is a
/// backend failure rather than a silently cleared field
fn from_row(row: &Row) -> StoreResult<PatientRecord> {
    let gender: Option<String> = row.try_get("gender").map_err(backend)?;
    let birth_date: Option<String> = row.try_get("birth_date").map_err(backend)?;

    Ok(PatientRecord {
        id: row.try_get("id").map_err(backend)?,
        version: row.try_get("version").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
        fields: PatientFields {
            health_card_number: row.try_get("health_card_number").map_err(backend)?,
            family_name: row.try_get("family_name").map_err(backend)?,
            given_name: row.try_get("given_name").map_err(backend)?,
            gender: gender.map(|g| g.parse::<Gender>()).transpose().map_err(backend)?,
            birth_date: birth_date.map(|d| d.parse::<BirthDate>()).transpose().map_err(backend)?,
            phone: row.try_get("phone").map_err(backend)?,
            email: row.try_get("email").map_err(backend)?,
            address_line: row.try_get("address_line").map_err(backend)?,
            city: row.try_get("city").map_err(backend)?,
            province: row.try_get("province").map_err(backend)?,
            postal_code: row.try_get("postal_code").map_err(backend)?,
        },
    })
}

/// PostgreSQL-backed patient store
#[derive(Clone)]
pub struct PatientRepository {
    pool: Pool,
}

impl PatientRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &PatientRecord) -> StoreResult<u64> {
        let client = self.pool.get().await.map_err(backend)?;
        let f = &record.fields;
        let gender = f.gender.map(|g| g.as_str());
        let birth_date = f.birth_date.as_ref().map(|d| d.as_str());

        // Retired ids and live ids both leave the insert with zero rows
        client
            .execute(
                "INSERT INTO patients (id, version, health_card_number, family_name, given_name, \
                 gender, birth_date, phone, email, address_line, city, province, postal_code, \
                 created_at, updated_at) \
                 SELECT $1::text, $2::int4, $3::text, $4::text, $5::text, $6::text, $7::text, \
                 $8::text, $9::text, $10::text, $11::text, $12::text, $13::text, \
                 $14::timestamptz, $15::timestamptz \
                 WHERE NOT EXISTS (SELECT 1 FROM retired_patient_ids WHERE id = $1) \
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &record.id,
                    &record.version,
                    &f.health_card_number,
                    &f.family_name,
                    &f.given_name,
                    &gender,
                    &birth_date,
                    &f.phone,
                    &f.email,
                    &f.address_line,
                    &f.city,
                    &f.province,
                    &f.postal_code,
                    &record.created_at,
                    &record.updated_at,
                ],
            )
            .await
            .map_err(backend)
    }

    async fn replace(&self, record: &PatientRecord, expected: i32) -> StoreResult<u64> {
        let client = self.pool.get().await.map_err(backend)?;
        let f = &record.fields;
        let gender = f.gender.map(|g| g.as_str());
        let birth_date = f.birth_date.as_ref().map(|d| d.as_str());

        client
            .execute(
                "UPDATE patients SET version = $2, health_card_number = $3, family_name = $4, \
                 given_name = $5, gender = $6, birth_date = $7, phone = $8, email = $9, \
                 address_line = $10, city = $11, province = $12, postal_code = $13, \
                 updated_at = $14 \
                 WHERE id = $1 AND version = $15",
                &[
                    &record.id,
                    &record.version,
                    &f.health_card_number,
                    &f.family_name,
                    &f.given_name,
                    &gender,
                    &birth_date,
                    &f.phone,
                    &f.email,
                    &f.address_line,
                    &f.city,
                    &f.province,
                    &f.postal_code,
                    &record.updated_at,
                    &expected,
                ],
            )
            .await
            .map_err(backend)
    }

    async fn current_version(&self, id: &str) -> StoreResult<Option<i32>> {
        let client = self.pool.get().await.map_err(backend)?;
        let row = client
            .query_opt("SELECT version FROM patients WHERE id = $1", &[&id])
            .await
            .map_err(backend)?;
        Ok(row.map(|r| r.get(0)))
    }
}

#[async_trait]
impl PatientStore for PatientRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, id: &str) -> StoreResult<Option<PatientRecord>> {
        let client = self.pool.get().await.map_err(backend)?;
        let sql = format!("SELECT {} FROM patients WHERE id = $1", COLUMNS);
        let row = client.query_opt(sql.as_str(), &[&id]).await.map_err(backend)?;

        row.as_ref().map(from_row).transpose()
    }

    async fn put(&self, record: PatientRecord, expected: Expected) -> StoreResult<()> {
        match expected {
            Expected::Absent => {
                if self.insert(&record).await? == 0 {
                    return Err(StoreError::AlreadyExists(record.id));
                }
            }
            Expected::Version(version) => {
                if self.replace(&record, version).await? == 0 {
                    let actual = self.current_version(&record.id).await?;
                    return Err(StoreError::VersionConflict {
                        id: record.id,
                        expected: version,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut client = self.pool.get().await.map_err(backend)?;
        let tx = client.transaction().await.map_err(backend)?;

        let deleted = tx
            .execute("DELETE FROM patients WHERE id = $1", &[&id])
            .await
            .map_err(backend)?;
        if deleted > 0 {
            tx.execute(
                "INSERT INTO retired_patient_ids (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
                &[&id],
            )
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;

        Ok(deleted > 0)
    }

    async fn query(
        &self,
        filter: &PatientFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<QueryPage> {
        let mut client = self.pool.get().await.map_err(backend)?;
        let conditions = Conditions::from_filter(filter);
        let where_sql = conditions.where_sql();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let mut params = conditions.refs();

        // One snapshot for both statements so `total` agrees with the window
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await
            .map_err(backend)?;

        let count_sql = format!("SELECT COUNT(*) FROM patients{}", where_sql);
        let total: i64 = tx
            .query_one(count_sql.as_str(), &params)
            .await
            .map_err(backend)?
            .get(0);

        let n = params.len();
        params.push(&limit);
        params.push(&offset);

        let sql = format!(
            "SELECT {} FROM patients{} ORDER BY created_at, id LIMIT ${} OFFSET ${}",
            COLUMNS,
            where_sql,
            n + 1,
            n + 2
        );
        let rows = tx.query(sql.as_str(), &params).await.map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        let records = rows.iter().map(from_row).collect::<StoreResult<Vec<_>>>()?;

        Ok(QueryPage {
            records,
            total: usize::try_from(total).unwrap_or(0),
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        let client = self.pool.get().await.map_err(backend)?;
        client.query_one("SELECT 1", &[]).await.map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(contains_pattern("trem"), "%trem%");
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let c = Conditions::from_filter(&PatientFilter::default());
        assert_eq!(c.where_sql(), "");
        assert!(c.params.is_empty());
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        let filter = PatientFilter {
            family: Some("trem".into()),
            name: Some("mar".into()),
            postal_code: Some("m5v 2".into()),
            ..Default::default()
        };
        let c = Conditions::from_filter(&filter);

        assert_eq!(
            c.where_sql(),
            " WHERE family_name ILIKE $1 AND (family_name ILIKE $2 OR given_name ILIKE $2) \
             AND upper(regexp_replace(postal_code, '\\s', '', 'g')) LIKE $3"
        );
        assert_eq!(c.params.len(), 3);
    }
}
