use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, info};

use crate::{
    AppState,
    api::models::{
        auth::{
            AnonymousSignInResponse, LoginRequest, LoginResponse, LogoutResponse, MeResponse, RegisterRequest, SessionIssuedResponse,
            SuccessResponse,
        },
        users::UserResponse,
    },
    auth::{
        current_session::CurrentSession,
        password,
        session::{self, ClientMetadata},
    },
    db::{
        handlers::{AccountLinks, AuthMethods, Repository, UserAuthMethods, Users, users::IdentityClash},
        models::{
            auth_methods::{ANONYMOUS_METHOD, PASSWORD_METHOD, PasswordProviderData, UserAuthMethodCreateDBRequest},
            users::UserCreateDBRequest,
        },
    },
    errors::Error,
    types::abbrev_uuid,
};

const GUEST_DISPLAY_NAME: &str = "Guest";

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid credentials".to_string()),
    }
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload.map(|Json(body)| body).map_err(|e| Error::BadRequest {
        message: format!("Invalid request body: {}", e.body_text()),
    })
}

/// Trimmed, non-empty value of an optional field
fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Email and password, both required. The password is kept verbatim.
fn required_credentials(email: Option<&str>, password: Option<String>) -> Result<(String, String), Error> {
    match (non_blank(email), password.filter(|p| !p.trim().is_empty())) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(Error::BadRequest {
            message: "Email and password are required".to_string(),
        }),
    }
}

/// Register a new user with email and password
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "User registered", body = SuccessResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email or username already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SuccessResponse>), Error> {
    let request = parse_body(payload)?;
    let (email, password) = required_credentials(request.email.as_deref(), request.password)?;
    let username = non_blank(request.username.as_deref());

    let password_config = &state.config.auth.password;
    let password_chars = password.chars().count();
    if password_chars < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if password_chars > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    // Checked up front for a friendly message; the unique constraints still catch racing registrations
    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        match Users::new(&mut conn).find_identity_clash(&email, username.as_deref()).await? {
            Some(IdentityClash::Email) => {
                return Err(Error::Conflict {
                    message: "An account with this email address already exists".to_string(),
                });
            }
            Some(IdentityClash::Username) => {
                return Err(Error::Conflict {
                    message: "This username is already taken".to_string(),
                });
            }
            None => {}
        }
    }

    let display_name = non_blank(request.display_name.as_deref())
        .or_else(|| username.clone())
        .or_else(|| email.split('@').next().map(str::to_string));

    let password_hash = password::hash_password_blocking(password, password_config.scheme, password_config.argon2_params()).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let method = AuthMethods::new(&mut tx)
        .get_active_by_name(PASSWORD_METHOD)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Password registration is not available".to_string(),
        })?;

    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest::registered(email.clone(), username, display_name))
        .await?;

    UserAuthMethods::new(&mut tx)
        .create(&UserAuthMethodCreateDBRequest {
            user_id: user.id,
            auth_method_id: method.id,
            provider_id: email,
            provider_data: PasswordProviderData { password_hash }.to_value(),
            is_primary: true,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!("Registered user {}", abbrev_uuid(&user.id));
    Ok((StatusCode::CREATED, Json(SuccessResponse::ok())))
}

/// Log in with email (or username) and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful; session cookie set", body = SessionIssuedResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<LoginResponse, Error> {
    let request = parse_body(payload)?;
    let (identifier, password) = required_credentials(request.email.as_deref(), request.password)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn).get_user_by_login(&identifier).await?;
    let binding = match &user {
        Some(user) => UserAuthMethods::new(&mut conn).find_for_user(user.id, PASSWORD_METHOD).await?,
        None => None,
    };
    let stored_hash = binding.as_ref().and_then(|b| b.password_hash());

    // Unknown accounts still pay for one Argon2 verification
    let (Some(user), Some(binding), Some(stored_hash)) = (user, binding, stored_hash) else {
        password::verify_dummy_blocking(password, state.config.auth.password.argon2_params()).await?;
        return Err(invalid_credentials());
    };

    if !password::verify_password_blocking(password, stored_hash).await? {
        debug!("Password mismatch for user {}", abbrev_uuid(&user.id));
        return Err(invalid_credentials());
    }

    let issued = session::issue_session(&mut conn, user.id, &ClientMetadata::from_headers(&headers), &state.config.auth.session).await?;
    let user = Users::new(&mut conn).record_login(user.id).await?;
    UserAuthMethods::new(&mut conn).touch_last_used(binding.id).await?;

    Ok(LoginResponse {
        cookie: session::session_cookie(&issued.token, &state.config),
        auth_response: SessionIssuedResponse {
            success: true,
            user: UserResponse::from(user),
            token: issued.token,
            expires_at: issued.expires_at,
        },
    })
}

/// End the current session and clear the cookie. Succeeds with or without a session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out; session cookie cleared", body = SuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<LogoutResponse, Error> {
    if let Some(token) = session::session_token_from_headers(&headers, &state.config.auth.session.cookie_name) {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let ended = session::end_session(&mut conn, &token).await?;
        debug!("Logout ended a live session: {}", ended);
    }

    Ok(LogoutResponse {
        cookie: session::clear_session_cookie(&state.config),
    })
}

/// Identity of the current session: the user, their auth methods and linked accounts
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated identity", body = MeResponse),
        (status = 401, description = "No valid session"),
        (status = 404, description = "User no longer exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current: CurrentSession) -> Result<Json<MeResponse>, Error> {
    let user_id = current.validated.user.id;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;
    let auth_methods = UserAuthMethods::new(&mut conn).list_for_user(user_id).await?;
    let linked_accounts = AccountLinks::new(&mut conn).list_for_primary(user_id).await?;

    Ok(Json(MeResponse {
        authenticated: true,
        user: UserResponse::from(user),
        auth_methods: auth_methods.into_iter().map(Into::into).collect(),
        session: current.validated.session.into(),
        linked_accounts: linked_accounts.into_iter().map(Into::into).collect(),
    }))
}

/// Sign in as a new guest user
#[utoipa::path(
    post,
    path = "/api/auth/anonymous",
    tag = "auth",
    responses(
        (status = 201, description = "Guest user created; session cookie set", body = SessionIssuedResponse),
        (status = 400, description = "Anonymous sign-in is disabled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn anonymous_sign_in(State(state): State<AppState>, headers: HeaderMap) -> Result<AnonymousSignInResponse, Error> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let method = AuthMethods::new(&mut tx)
        .get_active_by_name(ANONYMOUS_METHOD)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Anonymous sign-in is not available".to_string(),
        })?;

    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest::anonymous(GUEST_DISPLAY_NAME.to_string()))
        .await?;

    UserAuthMethods::new(&mut tx)
        .create(&UserAuthMethodCreateDBRequest {
            user_id: user.id,
            auth_method_id: method.id,
            provider_id: user.id.to_string(),
            provider_data: serde_json::json!({}),
            is_primary: true,
        })
        .await?;

    let issued = session::issue_session(&mut tx, user.id, &ClientMetadata::from_headers(&headers), &state.config.auth.session).await?;
    let user = Users::new(&mut tx).record_login(user.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!("Created guest user {}", abbrev_uuid(&user.id));
    Ok(AnonymousSignInResponse {
        cookie: session::session_cookie(&issued.token, &state.config),
        auth_response: SessionIssuedResponse {
            success: true,
            user: UserResponse::from(user),
            token: issued.token,
            expires_at: issued.expires_at,
        },
    })
}
