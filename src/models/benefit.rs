//! Health benefit catalog and redemptions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

text_enum! {
    ServiceType {
        Checkup => "CHECKUP",
        Medicine => "MEDICINE",
        Insurance => "INSURANCE",
        Specialist => "SPECIALIST",
        Diagnostic => "DIAGNOSTIC",
    }
}

text_enum! {
    RedemptionStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Completed => "COMPLETED",
        Rejected => "REJECTED",
    }
}

impl RedemptionStatus {
    pub fn can_transition_to(&self, next: RedemptionStatus) -> bool {
        use RedemptionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }
}

/// Catalog entry: service, description, HT cost
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub service_type: ServiceType,
    pub description: &'static str,
    pub ht_cost: u32,
}

pub const BENEFIT_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        service_type: ServiceType::Checkup,
        description: "Regular Health Checkup",
        ht_cost: 10,
    },
    CatalogEntry {
        service_type: ServiceType::Medicine,
        description: "Medicine Discount (20%)",
        ht_cost: 5,
    },
    CatalogEntry {
        service_type: ServiceType::Insurance,
        description: "Health Insurance Coverage",
        ht_cost: 50,
    },
    CatalogEntry {
        service_type: ServiceType::Specialist,
        description: "Specialist Consultation",
        ht_cost: 25,
    },
    CatalogEntry {
        service_type: ServiceType::Diagnostic,
        description: "Diagnostic Tests Package",
        ht_cost: 30,
    },
];

impl ServiceType {
    pub fn catalog_entry(&self) -> &'static CatalogEntry {
        // every variant is listed in the catalog
        BENEFIT_CATALOG
            .iter()
            .find(|entry| entry.service_type == *self)
            .unwrap_or(&BENEFIT_CATALOG[0])
    }

    pub fn ht_cost(&self) -> Decimal {
        Decimal::from(self.catalog_entry().ht_cost)
    }
}

/// Catalog item evaluated against a patient's HT balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBenefit {
    pub service_type: ServiceType,
    pub description: String,
    pub ht_cost: Decimal,
    pub available: bool,
    pub eligibility: String,
}

impl HealthBenefit {
    pub fn evaluate(entry: &CatalogEntry, health_balance: Decimal) -> Self {
        let cost = Decimal::from(entry.ht_cost);
        let available = health_balance >= cost;
        let eligibility = if available {
            "Eligible".to_string()
        } else {
            format!("Requires {} HT (Current: {} HT)", cost, health_balance.normalize())
        };
        Self {
            service_type: entry.service_type,
            description: entry.description.to_string(),
            ht_cost: cost,
            available,
            eligibility,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BenefitRedemption {
    pub id: i64,
    pub redemption_id: String,
    pub patient_id: i64,
    pub hospital_id: Option<i64>,
    pub service_type: ServiceType,
    pub ht_amount: Decimal,
    pub status: RedemptionStatus,
    pub description: Option<String>,
    pub transaction_hash: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRedemption {
    pub redemption_id: String,
    pub patient_id: i64,
    pub service_type: ServiceType,
    pub ht_amount: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub patient_id: Option<i64>,
    pub service_type: ServiceType,
    pub ht_amount: Option<Decimal>,
}

/// Result of a redemption attempt. A rejected attempt is not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionOutcome {
    pub redemption_id: Option<String>,
    pub patient_id: i64,
    pub service_type: ServiceType,
    pub ht_amount: Decimal,
    pub status: RedemptionStatus,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl RedemptionOutcome {
    pub fn accepted(redemption: &BenefitRedemption) -> Self {
        Self {
            redemption_id: Some(redemption.redemption_id.clone()),
            patient_id: redemption.patient_id,
            service_type: redemption.service_type,
            ht_amount: redemption.ht_amount,
            status: redemption.status,
            message: "Redemption request submitted".to_string(),
            created_at: Some(redemption.created_at),
        }
    }

    pub fn insufficient(patient_id: i64, service_type: ServiceType, available: Decimal, required: Decimal) -> Self {
        Self {
            redemption_id: None,
            patient_id,
            service_type,
            ht_amount: required,
            status: RedemptionStatus::Rejected,
            message: format!(
                "Insufficient health tokens. Available: {} HT, Required: {} HT",
                available.normalize(),
                required.normalize()
            ),
            created_at: None,
        }
    }
}
