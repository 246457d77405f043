//! Insurance policies and claims

use rust_decimal::Decimal;
use tracing::info;

use crate::database::DatabaseService;
use crate::models::{ClaimStatus, InsuranceClaim, InsurancePolicy, NewClaim, NewPolicy, PolicyStatus};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::ensure_amount_in_range;

#[derive(Clone, Debug)]
pub struct InsuranceService {
    db: DatabaseService,
    enabled: bool,
}

impl InsuranceService {
    pub fn new(db: DatabaseService, enabled: bool) -> Self {
        Self { db, enabled }
    }

    pub async fn policies(&self, status: Option<PolicyStatus>) -> Result<Vec<InsurancePolicy>> {
        self.require_enabled()?;
        self.db.insurance.list_policies(status).await
    }

    pub async fn create_policy(&self, policy: NewPolicy) -> Result<InsurancePolicy> {
        self.require_enabled()?;
        let policy_number = policy.policy_number.trim().to_string();
        if policy_number.is_empty() {
            return Err(FixedAssetError::InvalidInput("Policy number is required".to_string()));
        }
        if policy.coverage_amount <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Coverage amount must be greater than zero".to_string(),
            ));
        }
        if policy.premium < Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput("Premium cannot be negative".to_string()));
        }
        ensure_amount_in_range("Coverage amount", policy.coverage_amount)?;
        ensure_amount_in_range("Premium", policy.premium)?;

        let created = self
            .db
            .insurance
            .create_policy(NewPolicy {
                policy_number,
                ..policy
            })
            .await?;
        info!(
            policy_id = created.id,
            hospital_id = created.hospital_id,
            coverage = %created.coverage_amount,
            "Insurance policy created"
        );
        Ok(created)
    }

    pub async fn claims(&self, status: Option<ClaimStatus>) -> Result<Vec<InsuranceClaim>> {
        self.require_enabled()?;
        self.db.insurance.list_claims(status).await
    }

    /// File a claim against an ACTIVE policy, bounded by its coverage
    pub async fn file_claim(&self, claim: NewClaim) -> Result<InsuranceClaim> {
        self.require_enabled()?;
        let policy = self
            .db
            .insurance
            .find_policy(claim.policy_id)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Insurance policy {}", claim.policy_id)))?;
        if policy.status != PolicyStatus::Active {
            return Err(FixedAssetError::InvalidInput(format!(
                "Policy {} is {}",
                policy.policy_number, policy.status
            )));
        }
        if claim.claim_amount <= Decimal::ZERO || claim.claim_amount > policy.coverage_amount {
            return Err(FixedAssetError::InvalidInput(format!(
                "Claim amount must be between 0 and {}",
                policy.coverage_amount
            )));
        }

        let created = self.db.insurance.create_claim(claim).await?;
        info!(
            claim_id = created.id,
            policy_id = created.policy_id,
            patient_id = created.patient_id,
            amount = %created.claim_amount,
            "Insurance claim filed"
        );
        Ok(created)
    }

    fn require_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(FixedAssetError::ServiceUnavailable("Insurance is disabled".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateUserRequest, NewHospital, NewPatient, UserRole};
    use assert_matches::assert_matches;

    async fn setup() -> (InsuranceService, i64, i64) {
        let db = DatabaseService::in_memory();
        let hospital = db
            .hospitals
            .create_hospital(NewHospital {
                name: "RS Mitra".to_string(),
                registration_number: "RS-77".to_string(),
                address: None,
                phone: None,
                email: None,
            })
            .await
            .unwrap();
        let user = db
            .users
            .create_user(CreateUserRequest {
                email: "claimant@example.com".to_string(),
                name: "Claimant".to_string(),
                password_hash: "x".to_string(),
                role: UserRole::Patient,
                wallet_address: None,
            })
            .await
            .unwrap();
        let patient = db
            .patients
            .create_patient(NewPatient {
                user_id: user.id,
                registration_id: "PAT-CLAIM01".to_string(),
            })
            .await
            .unwrap();
        (InsuranceService::new(db, true), hospital.id, patient.id)
    }

    fn policy(hospital_id: i64, number: &str) -> NewPolicy {
        NewPolicy {
            hospital_id,
            policy_number: number.to_string(),
            coverage_amount: Decimal::from(1_000),
            premium: Decimal::from(25),
        }
    }

    #[tokio::test]
    async fn test_policy_creation() {
        let (service, hospital_id, _) = setup().await;
        let created = service.create_policy(policy(hospital_id, " POL-1 ")).await.unwrap();
        assert_eq!(created.policy_number, "POL-1");
        assert_eq!(created.status, PolicyStatus::Active);

        assert_matches!(
            service.create_policy(policy(hospital_id, "POL-1")).await,
            Err(FixedAssetError::Conflict(_))
        );
        let mut negative = policy(hospital_id, "POL-2");
        negative.premium = Decimal::from(-1);
        assert_matches!(service.create_policy(negative).await, Err(FixedAssetError::InvalidInput(_)));
        assert_eq!(service.policies(Some(PolicyStatus::Active)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claims_bounded_by_coverage() {
        let (service, hospital_id, patient_id) = setup().await;
        let created = service.create_policy(policy(hospital_id, "POL-9")).await.unwrap();

        let too_much = NewClaim {
            policy_id: created.id,
            patient_id,
            claim_amount: Decimal::from(1_001),
        };
        assert_matches!(service.file_claim(too_much).await, Err(FixedAssetError::InvalidInput(_)));

        let claim = service
            .file_claim(NewClaim {
                policy_id: created.id,
                patient_id,
                claim_amount: Decimal::from(400),
            })
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(service.claims(None).await.unwrap().len(), 1);

        let missing = NewClaim {
            policy_id: 9999,
            patient_id,
            claim_amount: Decimal::ONE,
        };
        assert_matches!(service.file_claim(missing).await, Err(FixedAssetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_disabled_feature() {
        let service = InsuranceService::new(DatabaseService::in_memory(), false);
        assert_matches!(service.policies(None).await, Err(FixedAssetError::ServiceUnavailable(_)));
    }
}
