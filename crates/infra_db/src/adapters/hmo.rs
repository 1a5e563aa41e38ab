//! PostgreSQL HMO Catalogue Adapter
//!
//! Providers, service packages, the NHIS service code list and tariffs.
//! Tariff periods for a provider and service code are kept disjoint by an
//! `EXCLUDE USING gist` constraint; a violation surfaces as
//! `PortError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    DomainPort, HmoProviderId, Money, PortError, ServiceCodeId, ServicePackageId, TariffId,
};
use domain_hmo::{
    CoverageType, HmoPort, HmoProvider, HmoTariff, NhisServiceCode, ServicePackage, TariffQuery,
};

use crate::error::{db_err, decode_json, encode_json, parse_column, DatabaseError};

const PROVIDER_COLUMNS: &str = "id, name, code, nhia_accreditation_number, contact_person, phone, \
    email, address, coverage_type, is_active, created_at, updated_at";

const PACKAGE_COLUMNS: &str = "id, hmo_provider_id, name, code, annual_limit, copay_percentage, \
    services_covered, exclusions, is_active, created_at";

const SERVICE_CODE_COLUMNS: &str = "id, code, description, category, base_tariff, is_active";

const TARIFF_COLUMNS: &str = "id, hmo_provider_id, service_code_id, tariff_amount, copay_amount, \
    copay_percentage, effective_from, effective_to, created_at";

#[derive(Debug, FromRow)]
struct ProviderRow {
    id: Uuid,
    name: String,
    code: String,
    nhia_accreditation_number: Option<String>,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    coverage_type: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProviderRow> for HmoProvider {
    type Error = PortError;

    fn try_from(row: ProviderRow) -> Result<Self, Self::Error> {
        Ok(HmoProvider {
            id: HmoProviderId::from(row.id),
            name: row.name,
            code: row.code,
            nhia_accreditation_number: row.nhia_accreditation_number,
            contact_person: row.contact_person,
            phone: row.phone,
            email: row.email,
            address: row.address,
            coverage_type: parse_column::<CoverageType>(&row.coverage_type, "coverage_type")?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PackageRow {
    id: Uuid,
    hmo_provider_id: Uuid,
    name: String,
    code: String,
    annual_limit: Option<Decimal>,
    copay_percentage: Decimal,
    services_covered: String,
    exclusions: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for ServicePackage {
    type Error = PortError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(ServicePackage {
            id: ServicePackageId::from(row.id),
            hmo_provider_id: HmoProviderId::from(row.hmo_provider_id),
            name: row.name,
            code: row.code,
            annual_limit: row.annual_limit.map(Money::ngn),
            copay_percentage: row.copay_percentage,
            services_covered: decode_json(&row.services_covered, "services_covered")?,
            exclusions: decode_json(&row.exclusions, "exclusions")?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ServiceCodeRow {
    id: Uuid,
    code: String,
    description: String,
    category: Option<String>,
    base_tariff: Decimal,
    is_active: bool,
}

impl From<ServiceCodeRow> for NhisServiceCode {
    fn from(row: ServiceCodeRow) -> Self {
        NhisServiceCode {
            id: ServiceCodeId::from(row.id),
            code: row.code,
            description: row.description,
            category: row.category,
            base_tariff: Money::ngn(row.base_tariff),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct TariffRow {
    id: Uuid,
    hmo_provider_id: Uuid,
    service_code_id: Uuid,
    tariff_amount: Decimal,
    copay_amount: Option<Decimal>,
    copay_percentage: Option<Decimal>,
    effective_from: NaiveDate,
    effective_to: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl From<TariffRow> for HmoTariff {
    fn from(row: TariffRow) -> Self {
        HmoTariff {
            id: TariffId::from(row.id),
            hmo_provider_id: HmoProviderId::from(row.hmo_provider_id),
            service_code_id: ServiceCodeId::from(row.service_code_id),
            tariff_amount: Money::ngn(row.tariff_amount),
            copay_amount: row.copay_amount.map(Money::ngn),
            copay_percentage: row.copay_percentage,
            effective_from: row.effective_from,
            effective_to: row.effective_to,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed implementation of the HmoPort trait
#[derive(Debug, Clone)]
pub struct PostgresHmoAdapter {
    pool: PgPool,
}

impl PostgresHmoAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresHmoAdapter {}

#[async_trait]
impl HmoPort for PostgresHmoAdapter {
    // ========================================================================
    // Providers
    // ========================================================================

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn get_provider(&self, id: HmoProviderId) -> Result<HmoProvider, PortError> {
        let sql = format!("SELECT {} FROM hmo_providers WHERE id = $1", PROVIDER_COLUMNS);
        sqlx::query_as::<_, ProviderRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("HmoProvider", id))?
            .try_into()
    }

    #[instrument(skip(self))]
    async fn list_providers(&self, active_only: bool) -> Result<Vec<HmoProvider>, PortError> {
        let sql = format!(
            "SELECT {} FROM hmo_providers WHERE ($1 = FALSE OR is_active) ORDER BY name",
            PROVIDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProviderRow>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(HmoProvider::try_from).collect()
    }

    #[instrument(skip(self, provider), fields(code = %provider.code))]
    async fn create_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError> {
        let sql = format!(
            "INSERT INTO hmo_providers ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {}",
            PROVIDER_COLUMNS, PROVIDER_COLUMNS
        );
        sqlx::query_as::<_, ProviderRow>(&sql)
            .bind(*provider.id.as_uuid())
            .bind(&provider.name)
            .bind(&provider.code)
            .bind(&provider.nhia_accreditation_number)
            .bind(&provider.contact_person)
            .bind(&provider.phone)
            .bind(&provider.email)
            .bind(&provider.address)
            .bind(provider.coverage_type.as_str())
            .bind(provider.is_active)
            .bind(provider.created_at)
            .bind(provider.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    #[instrument(skip(self, provider), fields(provider_id = %provider.id))]
    async fn update_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError> {
        let sql = format!(
            "UPDATE hmo_providers SET name = $2, nhia_accreditation_number = $3, contact_person = $4, \
             phone = $5, email = $6, address = $7, coverage_type = $8, is_active = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {}",
            PROVIDER_COLUMNS
        );
        sqlx::query_as::<_, ProviderRow>(&sql)
            .bind(*provider.id.as_uuid())
            .bind(&provider.name)
            .bind(&provider.nhia_accreditation_number)
            .bind(&provider.contact_person)
            .bind(&provider.phone)
            .bind(&provider.email)
            .bind(&provider.address)
            .bind(provider.coverage_type.as_str())
            .bind(provider.is_active)
            .bind(provider.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("HmoProvider", provider.id))?
            .try_into()
    }

    // ========================================================================
    // Packages
    // ========================================================================

    #[instrument(skip(self), fields(package_id = %id))]
    async fn get_package(&self, id: ServicePackageId) -> Result<ServicePackage, PortError> {
        let sql = format!("SELECT {} FROM hmo_service_packages WHERE id = $1", PACKAGE_COLUMNS);
        sqlx::query_as::<_, PackageRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("ServicePackage", id))?
            .try_into()
    }

    #[instrument(skip(self), fields(provider_id = %hmo_provider_id))]
    async fn list_packages(&self, hmo_provider_id: HmoProviderId) -> Result<Vec<ServicePackage>, PortError> {
        let sql = format!(
            "SELECT {} FROM hmo_service_packages WHERE hmo_provider_id = $1 ORDER BY name",
            PACKAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(*hmo_provider_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(ServicePackage::try_from).collect()
    }

    #[instrument(skip(self, package), fields(code = %package.code))]
    async fn create_package(&self, package: ServicePackage) -> Result<ServicePackage, PortError> {
        let sql = format!(
            "INSERT INTO hmo_service_packages ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            PACKAGE_COLUMNS, PACKAGE_COLUMNS
        );
        sqlx::query_as::<_, PackageRow>(&sql)
            .bind(*package.id.as_uuid())
            .bind(*package.hmo_provider_id.as_uuid())
            .bind(&package.name)
            .bind(&package.code)
            .bind(package.annual_limit.map(|m| m.amount()))
            .bind(package.copay_percentage)
            .bind(encode_json(&package.services_covered, "services_covered")?)
            .bind(encode_json(&package.exclusions, "exclusions")?)
            .bind(package.is_active)
            .bind(package.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()
    }

    // ========================================================================
    // Service codes
    // ========================================================================

    #[instrument(skip(self), fields(service_code_id = %id))]
    async fn get_service_code(&self, id: ServiceCodeId) -> Result<NhisServiceCode, PortError> {
        let sql = format!("SELECT {} FROM nhis_service_codes WHERE id = $1", SERVICE_CODE_COLUMNS);
        let row = sqlx::query_as::<_, ServiceCodeRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DatabaseError::not_found("NhisServiceCode", id))?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_service_codes(&self) -> Result<Vec<NhisServiceCode>, PortError> {
        let sql = format!("SELECT {} FROM nhis_service_codes ORDER BY code", SERVICE_CODE_COLUMNS);
        let rows = sqlx::query_as::<_, ServiceCodeRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(NhisServiceCode::from).collect())
    }

    #[instrument(skip(self, code), fields(code = %code.code))]
    async fn create_service_code(&self, code: NhisServiceCode) -> Result<NhisServiceCode, PortError> {
        let sql = format!(
            "INSERT INTO nhis_service_codes ({}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            SERVICE_CODE_COLUMNS, SERVICE_CODE_COLUMNS
        );
        let row = sqlx::query_as::<_, ServiceCodeRow>(&sql)
            .bind(*code.id.as_uuid())
            .bind(&code.code)
            .bind(&code.description)
            .bind(&code.category)
            .bind(code.base_tariff.amount())
            .bind(code.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    // ========================================================================
    // Tariffs
    // ========================================================================

    #[instrument(skip(self))]
    async fn find_tariffs(&self, query: TariffQuery) -> Result<Vec<HmoTariff>, PortError> {
        debug!(?query, "Finding tariffs");
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM hmo_tariffs WHERE 1 = 1", TARIFF_COLUMNS));
        if let Some(provider_id) = query.hmo_provider_id {
            builder.push(" AND hmo_provider_id = ");
            builder.push_bind(Uuid::from(provider_id));
        }
        if let Some(service_code_id) = query.service_code_id {
            builder.push(" AND service_code_id = ");
            builder.push_bind(Uuid::from(service_code_id));
        }
        if let Some(date) = query.effective_on {
            builder.push(" AND effective_from <= ");
            builder.push_bind(date);
            builder.push(" AND (effective_to IS NULL OR effective_to >= ");
            builder.push_bind(date);
            builder.push(")");
        }
        builder.push(" ORDER BY effective_from DESC, created_at DESC");

        let rows = builder
            .build_query_as::<TariffRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(HmoTariff::from).collect())
    }

    #[instrument(skip(self, tariff), fields(provider_id = %tariff.hmo_provider_id, service_code_id = %tariff.service_code_id))]
    async fn create_tariff(&self, tariff: HmoTariff) -> Result<HmoTariff, PortError> {
        let sql = format!(
            "INSERT INTO hmo_tariffs ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            TARIFF_COLUMNS, TARIFF_COLUMNS
        );
        let row = sqlx::query_as::<_, TariffRow>(&sql)
            .bind(*tariff.id.as_uuid())
            .bind(*tariff.hmo_provider_id.as_uuid())
            .bind(*tariff.service_code_id.as_uuid())
            .bind(tariff.tariff_amount.amount())
            .bind(tariff.copay_amount.map(|m| m.amount()))
            .bind(tariff.copay_percentage)
            .bind(tariff.effective_from)
            .bind(tariff.effective_to)
            .bind(tariff.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }
}
