//! Patient DTOs

use serde::Deserialize;

/// `GET /api/patients?search=`
#[derive(Debug, Default, Deserialize)]
pub struct SearchPatientsParams {
    pub search: Option<String>,
}
