use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::doctor::{Doctor, DEFAULT_DOCTOR_IMAGE};
use shared_utils::AppState;

use crate::models::{CreateListingRequest, DoctorError, UpdateDoctorRequest};

/// Whether a listing call created a profile or updated the caller's existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOutcome {
    Created,
    Updated,
}

pub struct DoctorService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// The doctor listing owned by `user_id`.
    pub async fn for_account(&self, user_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store
            .find_doctor_by_user(user_id)
            .await?
            .ok_or(DoctorError::ProfileMissing)
    }

    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_or_update_listing(
        &self,
        user_id: Uuid,
        request: CreateListingRequest,
    ) -> Result<(Doctor, ListingOutcome), DoctorError> {
        validate_listing(&request)?;

        if let Some(existing) = self.store.find_doctor_by_user(user_id).await? {
            let updated = self.apply_update(existing, request.into()).await?;
            info!("Updated doctor listing {}", updated.id);
            return Ok((updated, ListingOutcome::Updated));
        }

        let doctor = Doctor {
            id: Uuid::new_v4(),
            user_id,
            name: request.name.trim().to_string(),
            specialty: request.specialty.trim().to_string(),
            description: request.description,
            consultation_fee: request.consultation_fee,
            image_url: request
                .image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DOCTOR_IMAGE.to_string()),
            qualifications: request.qualifications.trim().to_string(),
            years_of_experience: request.years_of_experience,
            contact_number: request.contact_number.trim().to_string(),
            clinic_name: request.clinic_name.trim().to_string(),
            clinic_address: request.clinic_address.trim().to_string(),
            registration_number: request.registration_number.trim().to_string(),
            gender: request.gender,
            languages: request.languages.map(|l| l.into_vec()).unwrap_or_default(),
            linked_in: request.linked_in,
            awards: request.awards,
            services: request.services,
            availability: Vec::new(),
            created_at: Utc::now(),
        };

        let created = self.store.insert_doctor(doctor).await?;
        info!("Created doctor listing {}", created.id);
        Ok((created, ListingOutcome::Created))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self.for_account(user_id).await?;
        self.apply_update(doctor, request).await
    }

    pub async fn list_all(&self) -> Result<Vec<Doctor>, DoctorError> {
        let doctors = self.store.list_doctors().await?;
        debug!("Listing {} doctors", doctors.len());
        Ok(doctors)
    }

    async fn apply_update(&self, mut doctor: Doctor, update: UpdateDoctorRequest) -> Result<Doctor, DoctorError> {
        if let Some(fee) = update.consultation_fee {
            if fee < 0.0 {
                return Err(DoctorError::Validation("Consultation fee cannot be negative".to_string()));
            }
            doctor.consultation_fee = fee;
        }
        if let Some(name) = update.name {
            doctor.name = name.trim().to_string();
        }
        if let Some(specialty) = update.specialty {
            doctor.specialty = specialty.trim().to_string();
        }
        if let Some(description) = update.description {
            doctor.description = description;
        }
        if let Some(image_url) = update.image_url {
            doctor.image_url = image_url;
        }
        if let Some(qualifications) = update.qualifications {
            doctor.qualifications = qualifications.trim().to_string();
        }
        if let Some(years) = update.years_of_experience {
            doctor.years_of_experience = years;
        }
        if let Some(contact) = update.contact_number {
            doctor.contact_number = contact.trim().to_string();
        }
        if let Some(clinic_name) = update.clinic_name {
            doctor.clinic_name = clinic_name.trim().to_string();
        }
        if let Some(clinic_address) = update.clinic_address {
            doctor.clinic_address = clinic_address.trim().to_string();
        }
        if let Some(registration) = update.registration_number {
            doctor.registration_number = registration.trim().to_string();
        }
        if let Some(gender) = update.gender {
            doctor.gender = gender;
        }
        if let Some(languages) = update.languages {
            doctor.languages = languages.into_vec();
        }
        if update.linked_in.is_some() {
            doctor.linked_in = update.linked_in;
        }
        if update.awards.is_some() {
            doctor.awards = update.awards;
        }
        if update.services.is_some() {
            doctor.services = update.services;
        }

        Ok(self.store.save_doctor(&doctor).await?)
    }
}

fn validate_listing(request: &CreateListingRequest) -> Result<(), DoctorError> {
    let required = [
        ("name", &request.name),
        ("specialty", &request.specialty),
        ("description", &request.description),
        ("qualifications", &request.qualifications),
        ("contactNumber", &request.contact_number),
        ("clinicName", &request.clinic_name),
        ("clinicAddress", &request.clinic_address),
        ("registrationNumber", &request.registration_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(DoctorError::Validation(format!("{} is required", field)));
    }
    if request.consultation_fee < 0.0 {
        return Err(DoctorError::Validation("Consultation fee cannot be negative".to_string()));
    }
    Ok(())
}
