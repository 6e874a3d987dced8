use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{CredentialsPayload, HealthResponse, LoginResponse, MeResponse, MessageResponse},
        extractors::LenientJson,
        repo::StoreError,
        services::{
            hash_password_blocking, verify_password_blocking, verify_unknown_user, Credentials,
        },
        session::Session,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Logged once, when the response is rendered.
fn store_failure(e: StoreError, what: &'static str) -> AppError {
    match e {
        StoreError::Other(e) => AppError::Internal(e.context(what)),
        StoreError::Conflict => AppError::Internal(anyhow::anyhow!("unexpected conflict in {what}")),
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    LenientJson(payload): LenientJson<CredentialsPayload>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let creds = Credentials::try_from(payload).inspect_err(|_| {
        warn!("register without email or password");
    })?;

    // Ensure email is not taken
    match state.store.find_by_email(&creds.email).await {
        Ok(Some(_)) => {
            warn!(email = %creds.email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Ok(None) => {}
        Err(e) => return Err(store_failure(e, "find_by_email")),
    }

    let hash = hash_password_blocking(creds.password)
        .await
        .map_err(|e| AppError::Internal(e.context("hash_password")))?;

    let user = match state.store.create(&creds.email, &hash).await {
        Ok(u) => u,
        Err(StoreError::Conflict) => {
            // Another request inserted the same email after our lookup.
            warn!(email = %creds.email, "email registered concurrently");
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(store_failure(e, "create user")),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    LenientJson(payload): LenientJson<CredentialsPayload>,
) -> AppResult<(SignedCookieJar, Json<LoginResponse>)> {
    let creds = Credentials::try_from(payload).map_err(|_| {
        warn!("login without email or password");
        AppError::Authentication
    })?;

    let user = match state.store.find_by_email(&creds.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            verify_unknown_user(creds.password).await;
            warn!(email = %creds.email, "login unknown email");
            return Err(AppError::Authentication);
        }
        Err(e) => return Err(store_failure(e, "find_by_email")),
    };

    let ok = verify_password_blocking(creds.password, user.password_hash.clone())
        .await
        .map_err(|e| AppError::Internal(e.context(format!("verify_password user_id={}", user.id))))?;

    if !ok {
        warn!(email = %creds.email, user_id = user.id, "login invalid password");
        return Err(AppError::Authentication);
    }

    let jar = Session::for_user(user.id, user.email.clone())
        .save(jar, state.config.cookie_secure)
        .map_err(AppError::Internal)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".into(),
            email: user.email,
        }),
    ))
}

#[instrument(skip(jar))]
pub async fn me(jar: SignedCookieJar) -> Json<MeResponse> {
    let session = Session::load(&jar);
    if !session.is_authenticated() {
        return Json(MeResponse {
            authenticated: false,
            email: None,
        });
    }
    Json(MeResponse {
        authenticated: true,
        email: session.user_email,
    })
}

/// `signed` only tells us who is leaving; the removal goes through the plain
/// jar so cookies that no longer verify are cleared as well.
#[instrument(skip(signed, jar))]
pub async fn logout(signed: SignedCookieJar, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    if let Some(user_id) = Session::load(&signed).user_id {
        info!(user_id, "user logged out");
    }
    (Session::clear(jar), Json(MessageResponse::new("Logged out")))
}
