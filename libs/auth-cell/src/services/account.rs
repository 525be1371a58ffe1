use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_utils::password::{hash_password, verify_password};
use shared_utils::phone::format_phone_number;

use crate::models::{
    Account, AccountRole, BootstrapAdminRequest, RegisterPatientRequest,
};
use crate::services::otp::encode_phone;

/// Outcome of a successful login; the handler turns this into a token.
pub struct LoginOutcome {
    pub account: Account,
    pub must_change_password: bool,
}

#[derive(Debug)]
pub enum LoginFailure {
    BadCredentials,
    Inactive,
    Unverified,
}

pub struct AccountService {
    db: PostgrestClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn find_by_phone(&self, phone: &str, auth_token: &str) -> Result<Option<Account>> {
        let path = format!("/rest/v1/accounts?phone=eq.{}", encode_phone(phone));
        let mut rows: Vec<Account> = self.db.select(&path, Some(auth_token)).await?;
        Ok(rows.pop())
    }

    pub async fn find_by_id(&self, id: Uuid, auth_token: &str) -> Result<Option<Account>> {
        let path = format!("/rest/v1/accounts?id=eq.{}", id);
        let mut rows: Vec<Account> = self.db.select(&path, Some(auth_token)).await?;
        Ok(rows.pop())
    }

    /// Self-service patient signup. The account starts unverified and
    /// inactive; OTP verification flips both.
    pub async fn register_patient(
        &self,
        request: RegisterPatientRequest,
        auth_token: &str,
    ) -> Result<Account> {
        debug!("Registering patient account");

        let phone = format_phone_number(&request.phone, &request.country_code);
        if !phone.is_valid {
            return Err(anyhow!(phone
                .error
                .unwrap_or_else(|| "Invalid phone number".to_string())));
        }

        if request.password.len() < 6 {
            return Err(anyhow!("Password must be at least 6 characters long"));
        }

        if self.find_by_phone(&phone.formatted, auth_token).await?.is_some() {
            return Err(anyhow!("An account already exists with this phone number"));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?;

        self.insert_account(
            &phone.formatted,
            &password_hash,
            AccountRole::Patient,
            request.first_name.unwrap_or_default(),
            request.last_name.unwrap_or_default(),
            request.email,
            auth_token,
        )
        .await
    }

    /// One-time admin bootstrap: refused as soon as any admin exists.
    pub async fn bootstrap_admin(
        &self,
        request: BootstrapAdminRequest,
        auth_token: &str,
    ) -> Result<Account> {
        let existing: Vec<Value> = self
            .db
            .select("/rest/v1/accounts?role=eq.admin", Some(auth_token))
            .await?;
        if !existing.is_empty() {
            return Err(anyhow!("An administrator account already exists"));
        }

        let phone = format_phone_number(&request.phone, &request.country_code);
        if !phone.is_valid {
            return Err(anyhow!(phone
                .error
                .unwrap_or_else(|| "Invalid phone number".to_string())));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?;

        self.insert_account(
            &phone.formatted,
            &password_hash,
            AccountRole::Admin,
            request.first_name,
            request.last_name,
            request.email,
            auth_token,
        )
        .await
    }

    /// OTP passed: mark the account verified and active.
    pub async fn activate(&self, phone: &str, auth_token: &str) -> Result<Account> {
        let path = format!("/rest/v1/accounts?phone=eq.{}", encode_phone(phone));
        let mut rows: Vec<Account> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({
                    "is_verified": true,
                    "is_active": true,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        rows.pop()
            .ok_or_else(|| anyhow!("No account found for this phone number"))
    }

    /// Password login with the activation gates applied in order.
    pub async fn login(
        &self,
        phone: &str,
        password: &str,
        auth_token: &str,
    ) -> Result<std::result::Result<LoginOutcome, LoginFailure>> {
        let Some(account) = self.find_by_phone(phone, auth_token).await? else {
            return Ok(Err(LoginFailure::BadCredentials));
        };

        if !account.is_active {
            return Ok(Err(LoginFailure::Inactive));
        }
        if !account.is_verified {
            return Ok(Err(LoginFailure::Unverified));
        }

        let matches = verify_password(password, &account.password_hash)
            .map_err(|e| anyhow!("Password verification failed: {}", e))?;
        if !matches {
            return Ok(Err(LoginFailure::BadCredentials));
        }

        let path = format!("/rest/v1/accounts?id=eq.{}", account.id);
        let _: Vec<Value> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({ "last_login": Utc::now().to_rfc3339() }),
            )
            .await?;

        // Doctors created by an admin must replace their temporary
        // password before doing anything else.
        let must_change_password = if account.role == AccountRole::Doctor {
            let path = format!(
                "/rest/v1/doctor_profiles?account_id=eq.{}&select=password_changed",
                account.id
            );
            let rows: Vec<Value> = self.db.select(&path, Some(auth_token)).await?;
            rows.first()
                .and_then(|row| row["password_changed"].as_bool())
                .map(|changed| !changed)
                .unwrap_or(false)
        } else {
            false
        };

        Ok(Ok(LoginOutcome {
            account,
            must_change_password,
        }))
    }

    /// Change the caller's own password, verifying the current one.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
        auth_token: &str,
    ) -> Result<Account> {
        let account = self
            .find_by_id(account_id, auth_token)
            .await?
            .ok_or_else(|| anyhow!("Account not found"))?;

        let matches = verify_password(current_password, &account.password_hash)
            .map_err(|e| anyhow!("Password verification failed: {}", e))?;
        if !matches {
            return Err(anyhow!("Current password is incorrect"));
        }

        self.set_password(&account, new_password, auth_token).await
    }

    /// Admin-side reset; no knowledge of the old password required.
    pub async fn reset_password(
        &self,
        account_id: Uuid,
        new_password: &str,
        auth_token: &str,
    ) -> Result<Account> {
        let account = self
            .find_by_id(account_id, auth_token)
            .await?
            .ok_or_else(|| anyhow!("Account not found"))?;

        self.set_password(&account, new_password, auth_token).await
    }

    async fn set_password(
        &self,
        account: &Account,
        new_password: &str,
        auth_token: &str,
    ) -> Result<Account> {
        if new_password.len() < 6 {
            return Err(anyhow!("Password must be at least 6 characters long"));
        }

        let password_hash =
            hash_password(new_password).map_err(|e| anyhow!("Password hashing failed: {}", e))?;

        let path = format!("/rest/v1/accounts?id=eq.{}", account.id);
        let mut rows: Vec<Account> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({
                    "password_hash": password_hash,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        if account.role == AccountRole::Doctor {
            let path = format!("/rest/v1/doctor_profiles?account_id=eq.{}", account.id);
            let _: Vec<Value> = self
                .db
                .patch_returning(&path, Some(auth_token), json!({ "password_changed": true }))
                .await?;
        }

        rows.pop().ok_or_else(|| anyhow!("Account not found"))
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_account(
        &self,
        phone: &str,
        password_hash: &str,
        role: AccountRole,
        first_name: String,
        last_name: String,
        email: Option<String>,
        auth_token: &str,
    ) -> Result<Account> {
        let now = Utc::now();
        self.db
            .insert_returning(
                "/rest/v1/accounts",
                Some(auth_token),
                json!({
                    "id": Uuid::new_v4(),
                    "phone": phone,
                    "password_hash": password_hash,
                    "role": role,
                    "first_name": first_name,
                    "last_name": last_name,
                    "email": email,
                    "is_verified": false,
                    "is_active": false,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await
    }
}
