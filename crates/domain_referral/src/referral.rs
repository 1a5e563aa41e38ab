//! Referral aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{generate_reference, HmoProviderId, PatientId, ReferralId, UserId};

use crate::error::ReferralError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    /// The receiving facility has taken the patient on
    Accepted,
    Completed,
    Cancelled,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Accepted => "accepted",
            ReferralStatus::Completed => "completed",
            ReferralStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, target: ReferralStatus) -> bool {
        use ReferralStatus::*;
        matches!(
            (*self, target),
            (Pending, Accepted) |
            (Accepted, Completed) |
            (Pending, Cancelled) |
            (Accepted, Cancelled)
        )
    }

    /// Whether a referral in this status can still be honoured
    pub fn is_open(&self) -> bool {
        matches!(self, ReferralStatus::Pending | ReferralStatus::Accepted)
    }
}

impl std::fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReferralStatus {
    type Err = ReferralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReferralStatus::Pending),
            "accepted" => Ok(ReferralStatus::Accepted),
            "completed" => Ok(ReferralStatus::Completed),
            "cancelled" => Ok(ReferralStatus::Cancelled),
            other => Err(ReferralError::invalid(format!("Unknown referral status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Routine => "routine",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = ReferralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine" => Ok(Urgency::Routine),
            "urgent" => Ok(Urgency::Urgent),
            "emergency" => Ok(Urgency::Emergency),
            other => Err(ReferralError::invalid(format!("Unknown urgency: {}", other))),
        }
    }
}

/// Generates a referral code such as `REF-MB3K9Q2L-7Q4ZD`
pub fn generate_referral_code() -> String {
    generate_reference("REF")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referral_code: String,
    pub patient_id: PatientId,
    pub referring_provider_id: UserId,
    pub destination_facility: String,
    pub specialist: Option<String>,
    pub specialty: Option<String>,
    pub reason_for_referral: String,
    pub clinical_summary: Option<String>,
    pub urgency: Urgency,
    pub hmo_provider_id: Option<HmoProviderId>,
    pub pre_authorization_code: Option<String>,
    pub status: ReferralStatus,
    pub appointment_date: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A requested status change
#[derive(Debug, Clone, PartialEq)]
pub enum ReferralTransition {
    Accept { appointment_date: Option<DateTime<Utc>> },
    Complete { feedback: Option<String> },
    Cancel { feedback: Option<String> },
}

impl ReferralTransition {
    pub fn target(&self) -> ReferralStatus {
        match self {
            ReferralTransition::Accept { .. } => ReferralStatus::Accepted,
            ReferralTransition::Complete { .. } => ReferralStatus::Completed,
            ReferralTransition::Cancel { .. } => ReferralStatus::Cancelled,
        }
    }
}

impl Referral {
    /// Returns a copy of the referral with `transition` applied
    pub fn apply(&self, transition: ReferralTransition, at: DateTime<Utc>) -> Result<Referral, ReferralError> {
        let target = transition.target();
        if !self.status.can_transition_to(target) {
            return Err(ReferralError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }

        let mut next = self.clone();
        match transition {
            ReferralTransition::Accept { appointment_date } => {
                if appointment_date.is_some() {
                    next.appointment_date = appointment_date;
                }
            }
            ReferralTransition::Complete { feedback } | ReferralTransition::Cancel { feedback } => {
                if let Some(text) = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
                    next.feedback = Some(text);
                }
            }
        }
        next.status = target;
        next.updated_at = at;
        Ok(next)
    }
}

/// A referral as written by the referring doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReferral {
    pub patient_id: Option<PatientId>,
    #[serde(default)]
    pub destination_facility: String,
    pub specialist: Option<String>,
    pub specialty: Option<String>,
    #[serde(default)]
    pub reason_for_referral: String,
    pub clinical_summary: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub hmo_provider_id: Option<HmoProviderId>,
    pub pre_authorization_code: Option<String>,
}

impl NewReferral {
    pub fn into_referral(self, referring_provider_id: UserId) -> Result<Referral, ReferralError> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| ReferralError::invalid("patient_id is required"))?;
        let reason = self.reason_for_referral.trim();
        if reason.is_empty() {
            return Err(ReferralError::invalid("reason_for_referral is required"));
        }
        let pre_authorization_code = self
            .pre_authorization_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if pre_authorization_code.is_some() && self.hmo_provider_id.is_none() {
            return Err(ReferralError::invalid(
                "A pre-authorization code requires an HMO provider",
            ));
        }

        let now = Utc::now();
        Ok(Referral {
            id: ReferralId::new_v7(),
            referral_code: generate_referral_code(),
            patient_id,
            referring_provider_id,
            destination_facility: self.destination_facility.trim().to_string(),
            specialist: self.specialist,
            specialty: self.specialty,
            reason_for_referral: reason.to_string(),
            clinical_summary: self.clinical_summary,
            urgency: self.urgency,
            hmo_provider_id: self.hmo_provider_id,
            pre_authorization_code,
            status: ReferralStatus::Pending,
            appointment_date: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Answer to a public lookup of a referral code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralVerification {
    pub valid: bool,
    pub referral: Option<Referral>,
    pub message: String,
}

impl ReferralVerification {
    pub fn unknown() -> Self {
        Self {
            valid: false,
            referral: None,
            message: "Referral not found".to_string(),
        }
    }

    pub fn of(referral: Referral) -> Self {
        let (valid, message) = if referral.status.is_open() {
            (true, "Referral is valid".to_string())
        } else {
            (false, format!("Referral has been {}", referral.status))
        };
        Self {
            valid,
            referral: Some(referral),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_referral() -> NewReferral {
        NewReferral {
            patient_id: Some(PatientId::new()),
            destination_facility: "Lagos University Teaching Hospital".to_string(),
            specialist: None,
            specialty: Some("Cardiology".to_string()),
            reason_for_referral: "Persistent arrhythmia".to_string(),
            clinical_summary: None,
            urgency: Urgency::Urgent,
            hmo_provider_id: None,
            pre_authorization_code: None,
        }
    }

    #[test]
    fn test_valid_transitions() {
        use ReferralStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Accepted));
    }

    #[test]
    fn test_new_referral_gets_code_and_pending_status() {
        let referral = new_referral().into_referral(UserId::new()).unwrap();
        assert!(referral.referral_code.starts_with("REF-"));
        assert_eq!(referral.status, ReferralStatus::Pending);
    }

    #[test]
    fn test_missing_patient_is_rejected() {
        let mut request = new_referral();
        request.patient_id = None;
        assert!(matches!(
            request.into_referral(UserId::new()),
            Err(ReferralError::InvalidReferral(_))
        ));
    }

    #[test]
    fn test_pre_authorization_requires_hmo() {
        let mut request = new_referral();
        request.pre_authorization_code = Some("PA-0091".to_string());
        assert!(request.clone().into_referral(UserId::new()).is_err());

        request.hmo_provider_id = Some(HmoProviderId::new());
        assert!(request.into_referral(UserId::new()).is_ok());
    }

    #[test]
    fn test_complete_records_feedback() {
        let accepted = new_referral()
            .into_referral(UserId::new())
            .unwrap()
            .apply(ReferralTransition::Accept { appointment_date: Some(Utc::now()) }, Utc::now())
            .unwrap();
        let completed = accepted
            .apply(
                ReferralTransition::Complete { feedback: Some("Pacemaker fitted".to_string()) },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(completed.status, ReferralStatus::Completed);
        assert_eq!(completed.feedback.as_deref(), Some("Pacemaker fitted"));
        assert!(completed.appointment_date.is_some());
    }

    #[test]
    fn test_verification_of_closed_referral_is_invalid() {
        let cancelled = new_referral()
            .into_referral(UserId::new())
            .unwrap()
            .apply(ReferralTransition::Cancel { feedback: None }, Utc::now())
            .unwrap();
        let verification = ReferralVerification::of(cancelled);
        assert!(!verification.valid);
        assert!(verification.referral.is_some());
    }
}
