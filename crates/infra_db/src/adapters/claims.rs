//! PostgreSQL Claims Adapter
//!
//! A claim and its items are inserted in one transaction. Status changes
//! are a compare-and-set on the `status` column so that two concurrent
//! approvers cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    ClaimItemId, DomainPort, HmoClaimId, HmoProviderId, Money, PatientId, PortError, ServiceCodeId,
    UserId,
};
use domain_claims::{
    ClaimDetail, ClaimItem, ClaimQuery, ClaimStatistics, ClaimStatus, ClaimsPort, HmoClaim,
};

use crate::error::{db_err, from_count, parse_column, to_count, DatabaseError};

const CLAIM_COLUMNS: &str = "id, claim_number, patient_id, hmo_provider_id, claim_date, service_date, \
    total_amount, copay_amount, claim_amount, approved_amount, status, submission_date, \
    approval_date, payment_date, rejection_reason, created_by, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, claim_id, service_code_id, quantity, unit_price, total_price, copay, \
    diagnosis_code, provider_id";

#[derive(Debug, FromRow)]
struct ClaimRow {
    id: Uuid,
    claim_number: String,
    patient_id: Uuid,
    hmo_provider_id: Uuid,
    claim_date: NaiveDate,
    service_date: Option<NaiveDate>,
    total_amount: Decimal,
    copay_amount: Decimal,
    claim_amount: Decimal,
    approved_amount: Option<Decimal>,
    status: String,
    submission_date: Option<DateTime<Utc>>,
    approval_date: Option<DateTime<Utc>>,
    payment_date: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for HmoClaim {
    type Error = PortError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(HmoClaim {
            id: HmoClaimId::from(row.id),
            claim_number: row.claim_number,
            patient_id: PatientId::from(row.patient_id),
            hmo_provider_id: HmoProviderId::from(row.hmo_provider_id),
            claim_date: row.claim_date,
            service_date: row.service_date,
            total_amount: Money::ngn(row.total_amount),
            copay_amount: Money::ngn(row.copay_amount),
            claim_amount: Money::ngn(row.claim_amount),
            approved_amount: row.approved_amount.map(Money::ngn),
            status: parse_column::<ClaimStatus>(&row.status, "status")?,
            submission_date: row.submission_date,
            approval_date: row.approval_date,
            payment_date: row.payment_date,
            rejection_reason: row.rejection_reason,
            created_by: UserId::from(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ClaimItemRow {
    id: Uuid,
    claim_id: Uuid,
    service_code_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    copay: Decimal,
    diagnosis_code: Option<String>,
    provider_id: Option<Uuid>,
}

impl TryFrom<ClaimItemRow> for ClaimItem {
    type Error = PortError;

    fn try_from(row: ClaimItemRow) -> Result<Self, Self::Error> {
        Ok(ClaimItem {
            id: ClaimItemId::from(row.id),
            claim_id: HmoClaimId::from(row.claim_id),
            service_code_id: ServiceCodeId::from(row.service_code_id),
            quantity: to_count(row.quantity, "quantity")?,
            unit_price: Money::ngn(row.unit_price),
            total_price: Money::ngn(row.total_price),
            copay: Money::ngn(row.copay),
            diagnosis_code: row.diagnosis_code,
            provider_id: row.provider_id.map(UserId::from),
        })
    }
}

#[derive(Debug, FromRow)]
struct StatisticsRow {
    total_claims: i64,
    pending_count: i64,
    submitted_count: i64,
    approved_count: i64,
    rejected_count: i64,
    paid_count: i64,
    pending_amount: Decimal,
    approved_amount: Decimal,
    paid_amount: Decimal,
}

impl From<StatisticsRow> for ClaimStatistics {
    fn from(row: StatisticsRow) -> Self {
        let count = |n: i64| u64::try_from(n).unwrap_or_default();
        ClaimStatistics {
            total_claims: count(row.total_claims),
            pending_count: count(row.pending_count),
            submitted_count: count(row.submitted_count),
            approved_count: count(row.approved_count),
            rejected_count: count(row.rejected_count),
            paid_count: count(row.paid_count),
            pending_amount: Money::ngn(row.pending_amount),
            approved_amount: Money::ngn(row.approved_amount),
            paid_amount: Money::ngn(row.paid_amount),
        }
    }
}

/// PostgreSQL-backed implementation of the ClaimsPort trait
#[derive(Debug, Clone)]
pub struct PostgresClaimsAdapter {
    pool: PgPool,
}

impl PostgresClaimsAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, claim_id: Uuid) -> Result<Vec<ClaimItem>, PortError> {
        let sql = format!(
            "SELECT {} FROM hmo_claim_items WHERE claim_id = $1 ORDER BY id",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimItemRow>(&sql)
            .bind(claim_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(ClaimItem::try_from).collect()
    }
}

impl DomainPort for PostgresClaimsAdapter {}

#[async_trait]
impl ClaimsPort for PostgresClaimsAdapter {
    #[instrument(skip(self, detail), fields(claim_number = %detail.claim.claim_number, items = detail.items.len()))]
    async fn insert_claim(&self, detail: ClaimDetail) -> Result<ClaimDetail, PortError> {
        let claim = &detail.claim;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "INSERT INTO hmo_claims ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {}",
            CLAIM_COLUMNS, CLAIM_COLUMNS
        );
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*claim.id.as_uuid())
            .bind(&claim.claim_number)
            .bind(*claim.patient_id.as_uuid())
            .bind(*claim.hmo_provider_id.as_uuid())
            .bind(claim.claim_date)
            .bind(claim.service_date)
            .bind(claim.total_amount.amount())
            .bind(claim.copay_amount.amount())
            .bind(claim.claim_amount.amount())
            .bind(claim.approved_amount.map(|m| m.amount()))
            .bind(claim.status.as_str())
            .bind(claim.submission_date)
            .bind(claim.approval_date)
            .bind(claim.payment_date)
            .bind(&claim.rejection_reason)
            .bind(*claim.created_by.as_uuid())
            .bind(claim.created_at)
            .bind(claim.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        let item_sql = format!(
            "INSERT INTO hmo_claim_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            ITEM_COLUMNS, ITEM_COLUMNS
        );
        let mut items = Vec::with_capacity(detail.items.len());
        for item in &detail.items {
            let item_row = sqlx::query_as::<_, ClaimItemRow>(&item_sql)
                .bind(*item.id.as_uuid())
                .bind(*item.claim_id.as_uuid())
                .bind(*item.service_code_id.as_uuid())
                .bind(from_count(item.quantity, "quantity")?)
                .bind(item.unit_price.amount())
                .bind(item.total_price.amount())
                .bind(item.copay.amount())
                .bind(&item.diagnosis_code)
                .bind(item.provider_id.map(Uuid::from))
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
            items.push(ClaimItem::try_from(item_row)?);
        }

        tx.commit().await.map_err(db_err)?;
        debug!("Claim inserted");
        Ok(ClaimDetail {
            claim: row.try_into()?,
            items,
        })
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: HmoClaimId) -> Result<ClaimDetail, PortError> {
        let sql = format!("SELECT {} FROM hmo_claims WHERE id = $1", CLAIM_COLUMNS);
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("HmoClaim", id))?;
        let items = self.load_items(row.id).await?;
        Ok(ClaimDetail {
            claim: row.try_into()?,
            items,
        })
    }

    #[instrument(skip(self))]
    async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<HmoClaim>, PortError> {
        debug!(?query, "Finding claims");
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM hmo_claims WHERE 1 = 1", CLAIM_COLUMNS));
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(patient_id) = query.patient_id {
            builder.push(" AND patient_id = ");
            builder.push_bind(Uuid::from(patient_id));
        }
        if let Some(provider_id) = query.hmo_provider_id {
            builder.push(" AND hmo_provider_id = ");
            builder.push_bind(Uuid::from(provider_id));
        }
        if let Some(from) = query.from_date {
            builder.push(" AND claim_date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = query.to_date {
            builder.push(" AND claim_date <= ");
            builder.push_bind(to);
        }
        if let Some(user) = query.created_by {
            builder.push(" AND created_by = ");
            builder.push_bind(Uuid::from(user));
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<ClaimRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(HmoClaim::try_from).collect()
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, expected = %expected, target = %claim.status))]
    async fn update_status(&self, claim: HmoClaim, expected: ClaimStatus) -> Result<HmoClaim, PortError> {
        let sql = format!(
            "UPDATE hmo_claims SET status = $3, approved_amount = $4, submission_date = $5, \
             approval_date = $6, payment_date = $7, rejection_reason = $8, updated_at = $9 \
             WHERE id = $1 AND status = $2 RETURNING {}",
            CLAIM_COLUMNS
        );
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*claim.id.as_uuid())
            .bind(expected.as_str())
            .bind(claim.status.as_str())
            .bind(claim.approved_amount.map(|m| m.amount()))
            .bind(claim.submission_date)
            .bind(claim.approval_date)
            .bind(claim.payment_date)
            .bind(&claim.rejection_reason)
            .bind(claim.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM hmo_claims WHERE id = $1)")
                    .bind(*claim.id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_err)?;
                if exists {
                    Err(PortError::conflict(format!(
                        "Claim {} changed status concurrently",
                        claim.claim_number
                    )))
                } else {
                    Err(DatabaseError::not_found("HmoClaim", claim.id).into())
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn statistics(&self, created_by: Option<UserId>) -> Result<ClaimStatistics, PortError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT
                COUNT(*) AS total_claims,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_count,
                COUNT(*) FILTER (WHERE status = 'submitted') AS submitted_count,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved_count,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected_count,
                COUNT(*) FILTER (WHERE status = 'paid') AS paid_count,
                COALESCE(SUM(COALESCE(approved_amount, claim_amount)) FILTER (WHERE status = 'pending'), 0) AS pending_amount,
                COALESCE(SUM(COALESCE(approved_amount, claim_amount)) FILTER (WHERE status = 'approved'), 0) AS approved_amount,
                COALESCE(SUM(COALESCE(approved_amount, claim_amount)) FILTER (WHERE status = 'paid'), 0) AS paid_amount
            FROM hmo_claims
            WHERE ($1::uuid IS NULL OR created_by = $1)
            "#,
        )
        .bind(created_by.map(Uuid::from))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }
}
