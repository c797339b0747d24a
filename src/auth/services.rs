use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use super::dto::{AuthStatus, CredentialsRequest, PublicUser, SignedInUser, UserProfile};
use super::password::{burn_verification, hash_password, verify_password};
use super::session::SessionClaims;
use crate::{error::AppError, users::UserStore};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Credentials that passed shape validation; `email` is normalized.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl TryFrom<CredentialsRequest> for Credentials {
    type Error = AppError;

    fn try_from(req: CredentialsRequest) -> Result<Self, Self::Error> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.trim().is_empty() {
            return Err(AppError::InvalidInput("Email and password are required"));
        }
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format"));
        }
        Ok(Self {
            email,
            password: req.password,
        })
    }
}

pub async fn register(
    store: &dyn UserStore,
    req: CredentialsRequest,
) -> Result<PublicUser, AppError> {
    let creds = Credentials::try_from(req)?;

    if store.find_by_email(&creds.email).await?.is_some() {
        warn!(email = %creds.email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password(&creds.password).map_err(AppError::internal)?;
    // A concurrent registration can still win the race; the unique
    // constraint turns that into StoreError::Duplicate.
    let user = store.insert(&creds.email, &hash).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(PublicUser {
        id: user.id,
        email: user.email,
    })
}

pub async fn sign_in(
    store: &dyn UserStore,
    req: CredentialsRequest,
) -> Result<SignedInUser, AppError> {
    let creds = Credentials::try_from(req)?;

    let Some(user) = store.find_active_by_email(&creds.email).await? else {
        burn_verification(&creds.password);
        warn!(email = %creds.email, "sign-in for unknown or inactive email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = match verify_password(&creds.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = user.id, "stored password is not a valid hash");
            false
        }
    };
    if !ok {
        warn!(user_id = user.id, "sign-in with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let last_login = store.record_login(user.id).await?;

    info!(user_id = user.id, email = %user.email, "user signed in");
    Ok(SignedInUser {
        id: user.id,
        email: user.email,
        last_login: Some(last_login),
    })
}

pub async fn current_user(
    store: &dyn UserStore,
    session: Option<&SessionClaims>,
) -> Result<UserProfile, AppError> {
    let session = session.ok_or(AppError::Unauthenticated("Not authenticated"))?;
    let user = store
        .find_by_id(session.user_id())
        .await?
        .ok_or_else(|| {
            warn!(user_id = session.user_id(), "session refers to a missing user");
            AppError::Unauthenticated("Not authenticated")
        })?;

    Ok(UserProfile {
        id: user.id,
        email: user.email,
        created_at: user.created_at,
        last_login: user.last_login,
    })
}

pub fn check_auth(session: Option<&SessionClaims>) -> AuthStatus {
    match session {
        Some(s) => AuthStatus {
            authenticated: true,
            user_id: Some(s.user_id()),
        },
        None => AuthStatus {
            authenticated: false,
            user_id: None,
        },
    }
}
