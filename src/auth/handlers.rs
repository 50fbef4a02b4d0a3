use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, ChangePasswordRequest, CredentialsRequest},
        jwt::AuthUser,
        repo_types::{PublicUser, User, LOCAL_PROVIDER},
        validate::{string_field, validate_body, validate_password, Field, ValidationError, ValidationKind},
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/password", put(change_password))
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, AuthError> {
    let token = state.keys.sign(user.id)?;
    Ok(AuthResponse {
        token,
        expires_in: state.keys.ttl().as_secs(),
        user: user.into(),
    })
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let Json(payload) = body?;
    let creds = validate_body(payload.email.as_ref(), payload.password.as_ref())
        .map_err(|e| {
            warn!(field = e.field.name(), kind = e.kind.code(), "invalid registration input");
            e
        })?;

    // Ensure email is not taken
    if state.users.find_by_email(&creds.email).await?.is_some() {
        warn!(email = %creds.email, "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let group_id = match state.users.find_group_id(&state.config.default_group).await? {
        Some(id) => id,
        None => {
            error!(group = %state.config.default_group, "default group missing");
            return Err(AuthError::Config(format!(
                "group {:?} does not exist",
                state.config.default_group
            )));
        }
    };

    let mut user = User::new(creds.email, creds.password, group_id, LOCAL_PROVIDER);
    state.users.save(&mut user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Json(payload) = body?;
    let creds = validate_body(payload.email.as_ref(), payload.password.as_ref())
        .map_err(|e| {
            warn!(field = e.field.name(), kind = e.kind.code(), "invalid login input");
            e
        })?;

    let user = match state.users.find_by_email(&creds.email).await? {
        Some(u) => u,
        None => {
            state.users.verify_absent(&creds.password).await;
            warn!(email = %creds.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !user.match_password(&creds.password).await {
        warn!(email = %creds.email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(auth_response(&state, user)?))
}

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, AuthError> {
    state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token for unknown user");
        AuthError::Unauthorized("User not found")
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, body))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let Json(payload) = body?;
    let current = string_field(Field::CurrentPassword, payload.current_password.as_ref())?
        .ok_or_else(|| ValidationError::new(Field::CurrentPassword, ValidationKind::Required))?
        .to_owned();
    let new_password = string_field(Field::NewPassword, payload.new_password.as_ref())?;
    validate_password(Field::NewPassword, new_password)?;
    let new_password = new_password.unwrap_or_default().to_owned();

    let mut user = load_user(&state, user_id).await?;
    if !user.match_password(&current).await {
        warn!(user_id = %user_id, "password change with wrong current password");
        return Err(AuthError::InvalidCredentials);
    }

    user.set_password(new_password);
    state.users.save(&mut user).await?;

    info!(user_id = %user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
