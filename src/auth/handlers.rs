use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{
    dto::{CredentialsRequest, ProfileResponse, RegisterResponse, SignInResponse},
    services,
    session::MaybeSession,
};
use crate::{
    error::{AppError, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(sign_in))
        .route("/logout", post(logout))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_user))
        .route("/check-auth", get(check_auth))
        .route("/dashboard", get(dashboard))
}

/// Bodies that are missing, unparseable, or an empty/non-object JSON value
/// all count as "no data".
fn read_body(payload: Result<Json<Value>, JsonRejection>) -> Result<CredentialsRequest, AppError> {
    let Json(value) = payload.map_err(|e| {
        warn!(error = %e, "unreadable request body");
        AppError::InvalidInput("No data provided")
    })?;
    credentials_from_value(value)
}

fn credentials_from_value(value: Value) -> Result<CredentialsRequest, AppError> {
    match &value {
        Value::Object(fields) if !fields.is_empty() => {}
        _ => return Err(AppError::InvalidInput("No data provided")),
    }
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "request body has the wrong shape");
        AppError::InvalidInput("No data provided")
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = read_body(payload)?;
    let user = services::register(state.users.as_ref(), req)
        .await
        .map_err(|e| e.during("An error occurred during registration"))?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = read_body(payload)?;
    let during = |e: AppError| e.during("An error occurred during sign in");
    let user = services::sign_in(state.users.as_ref(), req)
        .await
        .map_err(during)?;

    let token = state
        .session
        .sign(user.id, &user.email)
        .map_err(|e| during(AppError::internal(e)))?;
    let cookie = state
        .session
        .issue_cookie(&token)
        .map_err(|e| during(AppError::internal(e)))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse {
            message: "Login successful",
            user,
            redirect: "/dashboard",
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cookie = state.session.clear_cookie().map_err(AppError::internal)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageBody {
            message: "Logged out successfully",
        }),
    ))
}

#[instrument(skip(state, session))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = services::current_user(state.users.as_ref(), session.as_ref()).await?;
    Ok(Json(ProfileResponse { user }))
}

#[instrument(skip(session))]
pub async fn check_auth(MaybeSession(session): MaybeSession) -> impl IntoResponse {
    let status = services::check_auth(session.as_ref());
    let code = if status.authenticated {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    (code, Json(status))
}

#[instrument(skip(session))]
pub async fn dashboard(MaybeSession(session): MaybeSession) -> Result<String, AppError> {
    let session =
        session.ok_or(AppError::Unauthenticated("Please log in to access this page"))?;
    Ok(format!("Welcome to dashboard, {}!", session.email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_data(err: AppError) -> bool {
        matches!(err, AppError::InvalidInput("No data provided"))
    }

    #[test]
    fn empty_or_non_object_bodies_are_no_data() {
        for body in [json!({}), json!([]), json!(null), json!(""), json!(["a@b.com", "pw"])] {
            assert!(no_data(credentials_from_value(body).unwrap_err()));
        }
    }

    #[test]
    fn wrongly_typed_fields_are_no_data() {
        let err = credentials_from_value(json!({"email": 5, "password": "pw"})).unwrap_err();
        assert!(no_data(err));
    }

    #[test]
    fn partial_object_reaches_field_validation() {
        let req = credentials_from_value(json!({"email": "a@b.com"})).unwrap();
        assert_eq!(req.email, "a@b.com");
        assert!(req.password.is_empty());
    }
}
