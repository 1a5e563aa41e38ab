//! HMO Domain Ports
//!
//! The `HmoPort` trait is the catalogue store: providers, packages, the NHIS
//! service code list and tariffs. Coverage resolution is a pure read over
//! this port plus the patient port.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{DomainPort, HmoProviderId, PortError, ServiceCodeId, ServicePackageId};

use crate::package::ServicePackage;
use crate::provider::HmoProvider;
use crate::service_code::NhisServiceCode;
use crate::tariff::HmoTariff;

/// Filters for listing tariffs
#[derive(Debug, Clone, Default)]
pub struct TariffQuery {
    pub hmo_provider_id: Option<HmoProviderId>,
    pub service_code_id: Option<ServiceCodeId>,
    /// Only tariffs whose range contains this date
    pub effective_on: Option<NaiveDate>,
}

impl TariffQuery {
    /// All tariffs for one (provider, service) pair
    pub fn for_pair(hmo_provider_id: HmoProviderId, service_code_id: ServiceCodeId) -> Self {
        Self {
            hmo_provider_id: Some(hmo_provider_id),
            service_code_id: Some(service_code_id),
            effective_on: None,
        }
    }

    /// Restricts the query to tariffs in force on `date`
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.effective_on = Some(date);
        self
    }

    pub fn matches(&self, tariff: &HmoTariff) -> bool {
        self.hmo_provider_id.map_or(true, |id| tariff.hmo_provider_id == id)
            && self.service_code_id.map_or(true, |id| tariff.service_code_id == id)
            && self.effective_on.map_or(true, |d| tariff.is_effective_on(d))
    }
}

/// The port trait for the HMO catalogue
///
/// Create operations fail with `PortError::Conflict` when a unique code is
/// already taken. Lookups of absent rows fail with `PortError::NotFound`.
#[async_trait]
pub trait HmoPort: DomainPort {
    // ========================================================================
    // Providers
    // ========================================================================

    async fn get_provider(&self, id: HmoProviderId) -> Result<HmoProvider, PortError>;

    /// Lists providers ordered by name
    async fn list_providers(&self, active_only: bool) -> Result<Vec<HmoProvider>, PortError>;

    async fn create_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError>;

    /// Persists every mutable field of an existing provider
    async fn update_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError>;

    // ========================================================================
    // Packages
    // ========================================================================

    async fn get_package(&self, id: ServicePackageId) -> Result<ServicePackage, PortError>;

    async fn list_packages(&self, hmo_provider_id: HmoProviderId) -> Result<Vec<ServicePackage>, PortError>;

    async fn create_package(&self, package: ServicePackage) -> Result<ServicePackage, PortError>;

    // ========================================================================
    // NHIS service codes
    // ========================================================================

    async fn get_service_code(&self, id: ServiceCodeId) -> Result<NhisServiceCode, PortError>;

    async fn list_service_codes(&self) -> Result<Vec<NhisServiceCode>, PortError>;

    async fn create_service_code(&self, code: NhisServiceCode) -> Result<NhisServiceCode, PortError>;

    // ========================================================================
    // Tariffs
    // ========================================================================

    async fn find_tariffs(&self, query: TariffQuery) -> Result<Vec<HmoTariff>, PortError>;

    /// Inserts a tariff
    ///
    /// Adapters backed by a store that enforces range exclusion report an
    /// overlap as `PortError::Conflict`.
    async fn create_tariff(&self, tariff: HmoTariff) -> Result<HmoTariff, PortError>;
}

/// Mock implementation of HmoPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Catalogue {
        providers: HashMap<HmoProviderId, HmoProvider>,
        packages: HashMap<ServicePackageId, ServicePackage>,
        service_codes: HashMap<ServiceCodeId, NhisServiceCode>,
        tariffs: Vec<HmoTariff>,
    }

    /// In-memory mock implementation of HmoPort
    #[derive(Debug, Default, Clone)]
    pub struct MockHmoPort {
        inner: Arc<RwLock<Catalogue>>,
    }

    impl MockHmoPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Inserts a tariff without any overlap checking
        pub async fn insert_tariff_unchecked(&self, tariff: HmoTariff) {
            self.inner.write().await.tariffs.push(tariff);
        }
    }

    impl DomainPort for MockHmoPort {}

    #[async_trait]
    impl HmoPort for MockHmoPort {
        async fn get_provider(&self, id: HmoProviderId) -> Result<HmoProvider, PortError> {
            self.inner
                .read()
                .await
                .providers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("HmoProvider", id))
        }

        async fn list_providers(&self, active_only: bool) -> Result<Vec<HmoProvider>, PortError> {
            let inner = self.inner.read().await;
            let mut providers: Vec<_> = inner
                .providers
                .values()
                .filter(|p| !active_only || p.is_active)
                .cloned()
                .collect();
            providers.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(providers)
        }

        async fn create_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError> {
            let mut inner = self.inner.write().await;
            if inner.providers.values().any(|p| p.code == provider.code) {
                return Err(PortError::conflict(format!(
                    "HMO provider code {} already exists",
                    provider.code
                )));
            }
            inner.providers.insert(provider.id, provider.clone());
            Ok(provider)
        }

        async fn update_provider(&self, provider: HmoProvider) -> Result<HmoProvider, PortError> {
            let mut inner = self.inner.write().await;
            match inner.providers.get_mut(&provider.id) {
                Some(existing) => {
                    *existing = provider.clone();
                    Ok(provider)
                }
                None => Err(PortError::not_found("HmoProvider", provider.id)),
            }
        }

        async fn get_package(&self, id: ServicePackageId) -> Result<ServicePackage, PortError> {
            self.inner
                .read()
                .await
                .packages
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("ServicePackage", id))
        }

        async fn list_packages(&self, hmo_provider_id: HmoProviderId) -> Result<Vec<ServicePackage>, PortError> {
            let inner = self.inner.read().await;
            let mut packages: Vec<_> = inner
                .packages
                .values()
                .filter(|p| p.hmo_provider_id == hmo_provider_id)
                .cloned()
                .collect();
            packages.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(packages)
        }

        async fn create_package(&self, package: ServicePackage) -> Result<ServicePackage, PortError> {
            let mut inner = self.inner.write().await;
            if !inner.providers.contains_key(&package.hmo_provider_id) {
                return Err(PortError::validation_field(
                    "HMO provider does not exist",
                    "hmo_provider_id",
                ));
            }
            if inner.packages.values().any(|p| p.code == package.code) {
                return Err(PortError::conflict(format!(
                    "Package code {} already exists",
                    package.code
                )));
            }
            inner.packages.insert(package.id, package.clone());
            Ok(package)
        }

        async fn get_service_code(&self, id: ServiceCodeId) -> Result<NhisServiceCode, PortError> {
            self.inner
                .read()
                .await
                .service_codes
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("NhisServiceCode", id))
        }

        async fn list_service_codes(&self) -> Result<Vec<NhisServiceCode>, PortError> {
            let inner = self.inner.read().await;
            let mut codes: Vec<_> = inner.service_codes.values().cloned().collect();
            codes.sort_by(|a, b| a.code.cmp(&b.code));
            Ok(codes)
        }

        async fn create_service_code(&self, code: NhisServiceCode) -> Result<NhisServiceCode, PortError> {
            let mut inner = self.inner.write().await;
            if inner.service_codes.values().any(|c| c.code == code.code) {
                return Err(PortError::conflict(format!(
                    "Service code {} already exists",
                    code.code
                )));
            }
            inner.service_codes.insert(code.id, code.clone());
            Ok(code)
        }

        async fn find_tariffs(&self, query: TariffQuery) -> Result<Vec<HmoTariff>, PortError> {
            let inner = self.inner.read().await;
            let mut tariffs: Vec<_> = inner
                .tariffs
                .iter()
                .filter(|t| query.matches(t))
                .cloned()
                .collect();
            tariffs.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
            Ok(tariffs)
        }

        async fn create_tariff(&self, tariff: HmoTariff) -> Result<HmoTariff, PortError> {
            let mut inner = self.inner.write().await;
            let clash = inner.tariffs.iter().any(|t| {
                t.hmo_provider_id == tariff.hmo_provider_id
                    && t.service_code_id == tariff.service_code_id
                    && t.effective_range().overlaps(&tariff.effective_range())
            });
            if clash {
                return Err(PortError::conflict("Tariff range overlaps an existing tariff"));
            }
            inner.tariffs.push(tariff.clone());
            Ok(tariff)
        }
    }
}
