use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use notification_cell::{NotificationEvent, NotificationService, Recipient};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;

use crate::models::{
    BootstrapAdminRequest, ChangePasswordRequest, LoginRequest, RegisterPatientRequest,
    ResendOtpRequest, ResetPasswordRequest, VerifyOtpRequest,
};
use crate::services::account::{AccountService, LoginFailure};
use crate::services::otp::OtpService;

fn notify_later(notifier: NotificationService, recipient: Recipient, event: NotificationEvent) {
    tokio::spawn(async move {
        notifier.send(recipient, event).await;
    });
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let accounts = AccountService::new(&state);
    let account = accounts
        .register_patient(request, &state.database_anon_key)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already exists") {
                AppError::Conflict(msg)
            } else {
                AppError::BadRequest(msg)
            }
        })?;

    let otp = OtpService::new(&state)
        .issue(&account.phone, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    notify_later(
        NotificationService::new(&state),
        Recipient::new(account.phone.clone(), account.email.clone()),
        NotificationEvent::PatientAccountCreation { otp },
    );

    Ok(Json(json!({
        "message": "Registration successful. Please verify your phone number.",
        "account": account.to_public(),
    })))
}

#[axum::debug_handler]
pub async fn verify_otp(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let valid = OtpService::new(&state)
        .verify(&request.phone, &request.otp, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::BadRequest("Invalid or expired OTP code".to_string()));
    }

    let account = AccountService::new(&state)
        .activate(&request.phone, &state.database_anon_key)
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({
        "message": "Phone number verified successfully. You can now log in.",
        "account": account.to_public(),
    })))
}

#[axum::debug_handler]
pub async fn resend_otp(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ResendOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let accounts = AccountService::new(&state);
    let account = accounts
        .find_by_phone(&request.phone, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("No account found for this phone number".to_string()))?;

    if account.is_verified {
        return Err(AppError::BadRequest(
            "This account is already verified".to_string(),
        ));
    }

    let otp = OtpService::new(&state)
        .issue(&account.phone, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    notify_later(
        NotificationService::new(&state),
        Recipient::new(account.phone.clone(), account.email.clone()),
        NotificationEvent::OtpVerification { otp },
    );

    Ok(Json(json!({ "message": "A new verification code has been sent." })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = AccountService::new(&state)
        .login(&request.phone, &request.password, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(LoginFailure::BadCredentials) => {
            return Err(AppError::Auth(
                "Incorrect phone number or password".to_string(),
            ))
        }
        Err(LoginFailure::Inactive) => {
            return Err(AppError::Auth(
                "Your account has been deactivated. Please contact the administrator.".to_string(),
            ))
        }
        Err(LoginFailure::Unverified) => {
            return Err(AppError::Forbidden(
                "Please verify your phone number with the OTP code before logging in.".to_string(),
            ))
        }
    };

    let account = outcome.account;
    let token = issue_token(
        &account.id.to_string(),
        &account.role.to_string(),
        &account.phone,
        &state.jwt_secret,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "token": token,
        "user": account.to_public(),
        "must_change_password": outcome.must_change_password,
    })))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let account_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid account id".to_string()))?;

    AccountService::new(&state)
        .change_password(
            account_id,
            &request.current_password,
            &request.new_password,
            auth.token(),
        )
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("incorrect") {
                AppError::Auth(msg)
            } else {
                AppError::BadRequest(msg)
            }
        })?;

    Ok(Json(json!({ "message": "Password changed successfully." })))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can reset passwords".to_string(),
        ));
    }

    let account = AccountService::new(&state)
        .reset_password(request.user_id, &request.new_password, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("not found") {
                AppError::NotFound(msg)
            } else {
                AppError::BadRequest(msg)
            }
        })?;

    Ok(Json(json!({
        "message": "Password reset successfully.",
        "account": account.to_public(),
    })))
}

#[axum::debug_handler]
pub async fn bootstrap_admin(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<BootstrapAdminRequest>,
) -> Result<Json<Value>, AppError> {
    let account = AccountService::new(&state)
        .bootstrap_admin(request, &state.database_anon_key)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already exists") {
                AppError::Conflict(msg)
            } else {
                AppError::BadRequest(msg)
            }
        })?;

    let otp = OtpService::new(&state)
        .issue(&account.phone, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    notify_later(
        NotificationService::new(&state),
        Recipient::new(account.phone.clone(), account.email.clone()),
        NotificationEvent::AdminAccountCreation { otp },
    );

    Ok(Json(json!({
        "message": "Administrator account created. Please verify your phone number.",
        "account": account.to_public(),
    })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let account_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid account id".to_string()))?;

    let account = AccountService::new(&state)
        .find_by_id(account_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    Ok(Json(account.to_public()))
}
