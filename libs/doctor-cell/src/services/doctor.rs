use anyhow::{anyhow, Result};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_utils::password::hash_password;
use shared_utils::phone::format_phone_number;

use crate::models::{
    CreateDoctorRequest, DoctorProfile, DoctorSearchQuery, DoctorSummary,
    RegistrationDecisionRequest, RegistrationStatus,
};

pub struct DoctorService {
    db: PostgrestClient,
}

/// A freshly created doctor: the profile plus the one-time temporary
/// password the caller must forward to the doctor.
pub struct CreatedDoctor {
    pub profile: DoctorProfile,
    pub phone: String,
    pub email: Option<String>,
    pub temporary_password: String,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Create a doctor account with a generated temporary password and a
    /// profile awaiting admin approval.
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<CreatedDoctor> {
        debug!("Creating doctor account for license {}", request.license_number);

        let phone = format_phone_number(&request.phone, &request.country_code);
        if !phone.is_valid {
            return Err(anyhow!(phone
                .error
                .unwrap_or_else(|| "Invalid phone number".to_string())));
        }

        let existing: Vec<Value> = self
            .db
            .select(
                &format!("/rest/v1/accounts?phone=eq.{}", phone.formatted),
                Some(auth_token),
            )
            .await?;
        if !existing.is_empty() {
            return Err(anyhow!("An account already exists with this phone number"));
        }

        let temporary_password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let password_hash =
            hash_password(&temporary_password).map_err(|e| anyhow!("Password hashing failed: {}", e))?;

        let now = Utc::now();
        let account: Value = self
            .db
            .insert_returning(
                "/rest/v1/accounts",
                Some(auth_token),
                json!({
                    "id": Uuid::new_v4(),
                    "phone": phone.formatted,
                    "password_hash": password_hash,
                    "role": "doctor",
                    "first_name": request.first_name,
                    "last_name": request.last_name,
                    "email": request.email.clone(),
                    "is_verified": true,
                    "is_active": true,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await?;

        let account_id = account["id"]
            .as_str()
            .ok_or_else(|| anyhow!("Account insert returned no id"))?
            .to_string();

        let profile: DoctorProfile = self
            .db
            .insert_returning(
                "/rest/v1/doctor_profiles",
                Some(auth_token),
                json!({
                    "id": Uuid::new_v4(),
                    "account_id": account_id,
                    "specialization": request.specialization,
                    "license_number": request.license_number,
                    "consultation_fee": request.consultation_fee,
                    "languages": request.languages,
                    "location": request.location,
                    "registration_status": "pending",
                    "password_changed": false,
                    "rating_average": 0.0,
                    "rating_count": 0,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await?;

        Ok(CreatedDoctor {
            profile,
            phone: phone.formatted,
            email: request.email,
            temporary_password,
        })
    }

    /// Approve or reject a pending registration, exactly once.
    pub async fn resolve_registration(
        &self,
        doctor_id: Uuid,
        request: RegistrationDecisionRequest,
        admin_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorProfile> {
        if request.status == RegistrationStatus::Pending {
            return Err(anyhow!("A registration cannot be moved back to pending"));
        }

        let profile = self.get_profile(doctor_id, auth_token).await?;
        if profile.registration_status != RegistrationStatus::Pending {
            return Err(anyhow!(
                "Registration is already {}",
                profile.registration_status
            ));
        }

        let path = format!("/rest/v1/doctor_profiles?account_id=eq.{}", doctor_id);
        let mut rows: Vec<DoctorProfile> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({
                    "registration_status": request.status,
                    "approved_by": admin_id,
                    "approval_date": Utc::now().to_rfc3339(),
                    "rejection_reason": request.rejection_reason,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        rows.pop()
            .ok_or_else(|| anyhow!("Doctor profile not found"))
    }

    pub async fn get_profile(&self, doctor_id: Uuid, auth_token: &str) -> Result<DoctorProfile> {
        let path = format!("/rest/v1/doctor_profiles?account_id=eq.{}", doctor_id);
        let mut rows: Vec<DoctorProfile> = self.db.select(&path, Some(auth_token)).await?;

        rows.pop().ok_or_else(|| anyhow!("Doctor not found"))
    }

    /// Public directory entry: approved profile plus the account name.
    pub async fn get_doctor_public(&self, doctor_id: Uuid, auth_token: &str) -> Result<DoctorSummary> {
        let profile = self.get_profile(doctor_id, auth_token).await?;
        if profile.registration_status != RegistrationStatus::Approved {
            return Err(anyhow!("Doctor not found"));
        }

        self.summarize(profile, None, auth_token)
            .await?
            .ok_or_else(|| anyhow!("Doctor not found"))
    }

    /// Public search: approved doctors, optional specialization filter,
    /// optional linear distance filter/sort when coordinates are given.
    pub async fn search_doctors(
        &self,
        query: DoctorSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<DoctorSummary>> {
        let mut path =
            "/rest/v1/doctor_profiles?registration_status=eq.approved&order=rating_average.desc"
                .to_string();
        if let Some(ref specialization) = query.specialization {
            path.push_str(&format!("&specialization=ilike.*{}*", specialization));
        }

        let profiles: Vec<DoctorProfile> = self.db.select(&path, Some(auth_token)).await?;

        let origin = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        };

        let mut results = Vec::new();
        for profile in profiles {
            if let Some(summary) = self.summarize(profile, origin, auth_token).await? {
                results.push(summary);
            }
        }

        if let Some(max_km) = query.max_distance_km {
            results.retain(|s| s.distance_km.map(|d| d <= max_km).unwrap_or(false));
        }
        if origin.is_some() {
            results.sort_by(|a, b| {
                let da = a.distance_km.unwrap_or(f64::MAX);
                let db = b.distance_km.unwrap_or(f64::MAX);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let limit = query.limit.unwrap_or(20);
        results.truncate(limit);

        Ok(results)
    }

    async fn summarize(
        &self,
        profile: DoctorProfile,
        origin: Option<(f64, f64)>,
        auth_token: &str,
    ) -> Result<Option<DoctorSummary>> {
        let path = format!("/rest/v1/accounts?id=eq.{}", profile.account_id);
        let mut accounts: Vec<Value> = self.db.select(&path, Some(auth_token)).await?;

        let Some(account) = accounts.pop() else {
            return Ok(None);
        };

        let distance_km = match (origin, profile.location.as_ref()) {
            (Some((lat, lng)), Some(location)) => Some(distance_km(location.lat, location.lng, lat, lng)),
            _ => None,
        };

        Ok(Some(DoctorSummary {
            id: profile.id,
            account_id: profile.account_id,
            first_name: account["first_name"].as_str().unwrap_or("").to_string(),
            last_name: account["last_name"].as_str().unwrap_or("").to_string(),
            specialization: profile.specialization,
            consultation_fee: profile.consultation_fee,
            languages: profile.languages,
            rating_average: profile.rating_average,
            rating_count: profile.rating_count,
            location: profile.location,
            distance_km,
        }))
    }
}

/// Equirectangular approximation, good enough for a directory sort.
fn distance_km(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let mean_lat = ((lat_a + lat_b) / 2.0).to_radians();
    let dx = (lng_b - lng_a).to_radians() * mean_lat.cos();
    let dy = (lat_b - lat_a).to_radians();

    (dx * dx + dy * dy).sqrt() * EARTH_RADIUS_KM
}
