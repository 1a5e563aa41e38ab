//! PostgreSQL Referral Adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{DomainPort, HmoProviderId, PatientId, PortError, ReferralId, UserId};
use domain_referral::{Referral, ReferralPort, ReferralQuery, ReferralStatus, Urgency};

use crate::error::{db_err, parse_column, DatabaseError};

const REFERRAL_COLUMNS: &str = "id, referral_code, patient_id, referring_provider_id, \
    destination_facility, specialist, specialty, reason_for_referral, clinical_summary, urgency, \
    hmo_provider_id, pre_authorization_code, status, appointment_date, feedback, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ReferralRow {
    id: Uuid,
    referral_code: String,
    patient_id: Uuid,
    referring_provider_id: Uuid,
    destination_facility: String,
    specialist: Option<String>,
    specialty: Option<String>,
    reason_for_referral: String,
    clinical_summary: Option<String>,
    urgency: String,
    hmo_provider_id: Option<Uuid>,
    pre_authorization_code: Option<String>,
    status: String,
    appointment_date: Option<DateTime<Utc>>,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = PortError;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        Ok(Referral {
            id: ReferralId::from(row.id),
            referral_code: row.referral_code,
            patient_id: PatientId::from(row.patient_id),
            referring_provider_id: UserId::from(row.referring_provider_id),
            destination_facility: row.destination_facility,
            specialist: row.specialist,
            specialty: row.specialty,
            reason_for_referral: row.reason_for_referral,
            clinical_summary: row.clinical_summary,
            urgency: parse_column::<Urgency>(&row.urgency, "urgency")?,
            hmo_provider_id: row.hmo_provider_id.map(HmoProviderId::from),
            pre_authorization_code: row.pre_authorization_code,
            status: parse_column::<ReferralStatus>(&row.status, "status")?,
            appointment_date: row.appointment_date,
            feedback: row.feedback,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed implementation of the ReferralPort trait
#[derive(Debug, Clone)]
pub struct PostgresReferralAdapter {
    pool: PgPool,
}

impl PostgresReferralAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresReferralAdapter {}

#[async_trait]
impl ReferralPort for PostgresReferralAdapter {
    #[instrument(skip(self, referral), fields(code = %referral.referral_code))]
    async fn insert_referral(&self, referral: Referral) -> Result<Referral, PortError> {
        let sql = format!(
            "INSERT INTO referrals ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) RETURNING {}",
            REFERRAL_COLUMNS, REFERRAL_COLUMNS
        );
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(*referral.id.as_uuid())
            .bind(&referral.referral_code)
            .bind(*referral.patient_id.as_uuid())
            .bind(*referral.referring_provider_id.as_uuid())
            .bind(&referral.destination_facility)
            .bind(&referral.specialist)
            .bind(&referral.specialty)
            .bind(&referral.reason_for_referral)
            .bind(&referral.clinical_summary)
            .bind(referral.urgency.as_str())
            .bind(referral.hmo_provider_id.map(Uuid::from))
            .bind(&referral.pre_authorization_code)
            .bind(referral.status.as_str())
            .bind(referral.appointment_date)
            .bind(&referral.feedback)
            .bind(referral.created_at)
            .bind(referral.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    #[instrument(skip(self), fields(referral_id = %id))]
    async fn get_referral(&self, id: ReferralId) -> Result<Referral, PortError> {
        let sql = format!("SELECT {} FROM referrals WHERE id = $1", REFERRAL_COLUMNS);
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("Referral", id))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> Result<Referral, PortError> {
        let sql = format!("SELECT {} FROM referrals WHERE referral_code = $1", REFERRAL_COLUMNS);
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("Referral", code))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn find_referrals(&self, query: ReferralQuery) -> Result<Vec<Referral>, PortError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM referrals WHERE 1 = 1", REFERRAL_COLUMNS));
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(patient_id) = query.patient_id {
            builder.push(" AND patient_id = ");
            builder.push_bind(Uuid::from(patient_id));
        }
        if let Some(provider) = query.referring_provider_id {
            builder.push(" AND referring_provider_id = ");
            builder.push_bind(Uuid::from(provider));
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<ReferralRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Referral::try_from).collect()
    }

    #[instrument(skip(self, referral), fields(code = %referral.referral_code, to = %referral.status))]
    async fn update_status(
        &self,
        referral: Referral,
        expected: ReferralStatus,
    ) -> Result<Referral, PortError> {
        let sql = format!(
            "UPDATE referrals SET status = $3, appointment_date = $4, feedback = $5, updated_at = $6 \
             WHERE id = $1 AND status = $2 RETURNING {}",
            REFERRAL_COLUMNS
        );
        let row = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(*referral.id.as_uuid())
            .bind(expected.as_str())
            .bind(referral.status.as_str())
            .bind(referral.appointment_date)
            .bind(&referral.feedback)
            .bind(referral.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM referrals WHERE id = $1)")
                    .bind(*referral.id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_err)?;
                if exists {
                    Err(PortError::conflict(format!(
                        "Referral {} changed status concurrently",
                        referral.referral_code
                    )))
                } else {
                    Err(DatabaseError::not_found("Referral", referral.id).into())
                }
            }
        }
    }
}
