//! Patient profile service

use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::{NewPatient, Patient, UpdatePatientRequest, UserRole};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{
    clamp_page_size, generate_registration_id, is_valid_phone, is_valid_wallet_address, normalize_email,
};

#[derive(Clone, Debug)]
pub struct PatientService {
    db: DatabaseService,
}

impl PatientService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Return the patient profile of a PATIENT user, creating it on first use
    pub async fn get_or_create_profile(&self, user_id: i64) -> Result<Patient> {
        let user = self
            .db
            .users
            .find_user(user_id)
            .await?
            .ok_or(FixedAssetError::UserNotFound { user_id })?;
        if user.role != UserRole::Patient {
            return Err(FixedAssetError::InvalidInput(format!("User {} is not a patient", user_id)));
        }

        if let Some(existing) = self.db.patients.find_patient_by_user(user_id).await? {
            return Ok(existing);
        }

        let patient = self
            .db
            .patients
            .create_patient(NewPatient {
                user_id,
                registration_id: generate_registration_id(),
            })
            .await?;
        info!(user_id = user_id, patient_id = patient.id, registration_id = %patient.registration_id, "Patient profile created");
        Ok(patient)
    }

    pub async fn get_by_id(&self, patient_id: i64) -> Result<Patient> {
        self.db
            .patients
            .find_patient(patient_id)
            .await?
            .ok_or(FixedAssetError::PatientNotFound { patient_id })
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Patient> {
        let email = normalize_email(email);
        self.db
            .patients
            .find_patient_by_email(&email)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Patient with email {}", email)))
    }

    pub async fn get_by_registration_id(&self, registration_id: &str) -> Result<Patient> {
        self.db
            .patients
            .find_patient_by_registration_id(registration_id.trim())
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Patient with registration ID {}", registration_id)))
    }

    pub async fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Patient>> {
        let limit = clamp_page_size(limit);
        let offset = offset.unwrap_or(0).max(0);
        debug!(limit = limit, offset = offset, "Listing patients");
        self.db.patients.list_patients(limit, offset).await
    }

    pub async fn update(&self, patient_id: i64, request: UpdatePatientRequest) -> Result<Patient> {
        if let Some(phone) = &request.phone_number {
            if !is_valid_phone(phone) {
                return Err(FixedAssetError::InvalidInput("Invalid phone number".to_string()));
            }
        }
        if let Some(wallet) = &request.wallet_address {
            if !is_valid_wallet_address(wallet) {
                return Err(FixedAssetError::InvalidInput("Invalid wallet address".to_string()));
            }
        }

        let patient = self.db.patients.update_patient(patient_id, request).await?;
        info!(patient_id = patient_id, "Patient profile updated");
        Ok(patient)
    }

    pub async fn delete(&self, patient_id: i64) -> Result<()> {
        if !self.db.patients.delete_patient(patient_id).await? {
            return Err(FixedAssetError::PatientNotFound { patient_id });
        }
        info!(patient_id = patient_id, "Patient deleted");
        Ok(())
    }

    /// Whether any account already uses the email
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.db.users.find_user_by_email(&normalize_email(email)).await?.is_some())
    }
}
