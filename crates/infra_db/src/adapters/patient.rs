//! PostgreSQL Patient Adapter

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, HmoProviderId, PatientId, PortError, ServicePackageId, UserId};
use domain_patient::{EmergencyContact, Gender, HmoEnrollment, Patient, PatientPort, PatientQuery};

use crate::error::{db_err, decode_json, encode_json, parse_column, DatabaseError};

const PATIENT_COLUMNS: &str = "id, mrn, first_name, last_name, date_of_birth, gender, phone, email, \
    address, emergency_contact, hmo_provider_id, hmo_package_id, policy_start_date, \
    policy_end_date, nhis_number, registered_by, created_at, updated_at";

const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    mrn: String,
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    emergency_contact: Option<String>,
    hmo_provider_id: Option<Uuid>,
    hmo_package_id: Option<Uuid>,
    policy_start_date: Option<NaiveDate>,
    policy_end_date: Option<NaiveDate>,
    nhis_number: Option<String>,
    registered_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = PortError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(|g| parse_column::<Gender>(g, "gender"))
            .transpose()?;
        let emergency_contact = row
            .emergency_contact
            .as_deref()
            .map(|c| decode_json::<EmergencyContact>(c, "emergency_contact"))
            .transpose()?;

        Ok(Patient {
            id: PatientId::from(row.id),
            mrn: row.mrn,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender,
            phone: row.phone,
            email: row.email,
            address: row.address,
            emergency_contact,
            enrollment: HmoEnrollment {
                hmo_provider_id: row.hmo_provider_id.map(HmoProviderId::from),
                hmo_package_id: row.hmo_package_id.map(ServicePackageId::from),
                policy_start_date: row.policy_start_date,
                policy_end_date: row.policy_end_date,
                nhis_number: row.nhis_number,
            },
            registered_by: UserId::from(row.registered_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Builds a substring `ILIKE` pattern in which the term matches literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// PostgreSQL-backed implementation of the PatientPort trait
#[derive(Debug, Clone)]
pub struct PostgresPatientAdapter {
    pool: PgPool,
}

impl PostgresPatientAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresPatientAdapter {}

#[async_trait]
impl PatientPort for PostgresPatientAdapter {
    #[instrument(skip(self), fields(patient_id = %id))]
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
        let sql = format!("SELECT {} FROM patients WHERE id = $1", PATIENT_COLUMNS);
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("Patient", id))?;
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn find_patients(&self, query: PatientQuery) -> Result<Vec<Patient>, PortError> {
        debug!(search = ?query.search, "Finding patients");
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM patients WHERE 1 = 1", PATIENT_COLUMNS));

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            builder.push(" AND (first_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR last_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR (first_name || ' ' || last_name) ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR mrn ILIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\')");
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(i64::from(query.limit.unwrap_or(DEFAULT_LIMIT)));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(query.offset.unwrap_or(0)));

        let rows = builder
            .build_query_as::<PatientRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    #[instrument(skip(self, patient), fields(patient_id = %patient.id))]
    async fn create_patient(&self, patient: Patient) -> Result<Patient, PortError> {
        let emergency_contact = patient
            .emergency_contact
            .as_ref()
            .map(|c| encode_json(c, "emergency_contact"))
            .transpose()?;
        let sql = format!(
            "INSERT INTO patients ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {}",
            PATIENT_COLUMNS, PATIENT_COLUMNS
        );
        let e = &patient.enrollment;
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(*patient.id.as_uuid())
            .bind(&patient.mrn)
            .bind(&patient.first_name)
            .bind(&patient.last_name)
            .bind(patient.date_of_birth)
            .bind(patient.gender.map(|g| g.as_str()))
            .bind(&patient.phone)
            .bind(&patient.email)
            .bind(&patient.address)
            .bind(emergency_contact)
            .bind(e.hmo_provider_id.map(Uuid::from))
            .bind(e.hmo_package_id.map(Uuid::from))
            .bind(e.policy_start_date)
            .bind(e.policy_end_date)
            .bind(&e.nhis_number)
            .bind(*patient.registered_by.as_uuid())
            .bind(patient.created_at)
            .bind(patient.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    #[instrument(skip(self, enrollment), fields(patient_id = %id))]
    async fn update_enrollment(
        &self,
        id: PatientId,
        enrollment: HmoEnrollment,
    ) -> Result<Patient, PortError> {
        let sql = format!(
            "UPDATE patients SET hmo_provider_id = $2, hmo_package_id = $3, \
             policy_start_date = $4, policy_end_date = $5, nhis_number = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            PATIENT_COLUMNS
        );
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(*id.as_uuid())
            .bind(enrollment.hmo_provider_id.map(Uuid::from))
            .bind(enrollment.hmo_package_id.map(Uuid::from))
            .bind(enrollment.policy_start_date)
            .bind(enrollment.policy_end_date)
            .bind(&enrollment.nhis_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("Patient", id))?;
        row.try_into()
    }
}
