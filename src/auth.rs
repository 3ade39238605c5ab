use crate::app::AppState;
use crate::identity::{IdentityError, ROLE_ADMIN, ROLE_USER};
use crate::views;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie as SetCookie, CookieJar, SameSite};
use axum_extra::TypedHeader;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use headers::Cookie;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

pub const SESSION_COOKIE: &str = "cinescope_session";
const SESSION_TTL_SECS: i64 = 8 * 60 * 60;

/// The signed-in user, inserted into request extensions by the guards.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }
}

fn hmac_sha256(secret: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}

/// `hex(email \n expiry).hex(hmac)`; hex keeps the cookie value free of separators.
pub fn issue_session(secret: &[u8], email: &str, now: i64) -> Option<String> {
    let payload = format!("{}\n{}", email, now + SESSION_TTL_SECS);
    let sig = hmac_sha256(secret, payload.as_bytes())?;
    Some(format!("{}.{}", hex::encode(payload), hex::encode(sig)))
}

pub fn verify_session(secret: &[u8], token: &str, now: i64) -> Option<String> {
    let (payload_hex, sig_hex) = token.split_once('.')?;
    let payload = hex::decode(payload_hex).ok()?;
    let expected = hex::decode(sig_hex).ok()?;
    let computed = hmac_sha256(secret, &payload)?;
    if expected.len() != computed.len() || !constant_time_eq(&computed, &expected) {
        return None;
    }

    let payload = String::from_utf8(payload).ok()?;
    let (email, expiry) = payload.split_once('\n')?;
    let expiry: i64 = expiry.parse().ok()?;
    (expiry > now).then(|| email.to_string())
}

fn session_cookie(token: String) -> SetCookie<'static> {
    SetCookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

async fn resolve_user(state: &AppState, cookies: Option<TypedHeader<Cookie>>) -> Option<CurrentUser> {
    let TypedHeader(cookies) = cookies?;
    let token = cookies.get(SESSION_COOKIE)?;
    let email = verify_session(&state.session_secret, token, Utc::now().timestamp())?;
    // Roles are re-read from the store on every request.
    let record = state.users.find_by_email(&email).await?;
    Some(CurrentUser {
        email: record.email,
        roles: record.roles.into_iter().collect(),
    })
}

pub async fn require_user(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, cookies).await {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(user) = resolve_user(&state, cookies).await else {
        return Redirect::to("/login").into_response();
    };
    if !user.is_admin() {
        warn!("Denied admin access to {} for {}", req.uri().path(), user.email);
        return (StatusCode::FORBIDDEN, Html(views::forbidden_page(&user))).into_response();
    }
    req.extensions_mut().insert(user);
    next.run(req).await
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub async fn login_form() -> Html<String> {
    Html(views::login_page(None, ""))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(user) = state
        .users
        .verify_credentials(&form.email, &form.password)
        .await
    else {
        warn!("Failed login for '{}'", form.email.trim());
        return (
            StatusCode::UNAUTHORIZED,
            Html(views::login_page(Some("Invalid login attempt."), &form.email)),
        )
            .into_response();
    };

    let destination = if user.has_role(ROLE_ADMIN) {
        "/admin"
    } else {
        "/movies"
    };
    info!("User '{}' signed in", user.email);
    start_session(&state, jar, &user.email, destination)
}

pub async fn register_form() -> Html<String> {
    Html(views::register_page(None, ""))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let reject = |message: String| {
        (
            StatusCode::BAD_REQUEST,
            Html(views::register_page(Some(&message), &form.email)),
        )
            .into_response()
    };

    if form.password != form.confirm_password {
        return reject("The password and confirmation password do not match.".to_string());
    }

    let user = match state.users.create_user(&form.email, &form.password).await {
        Ok(user) => user,
        Err(e @ IdentityError::Hash(_)) => {
            warn!("Registration failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => return reject(e.to_string()),
    };
    if let Err(e) = state.users.add_to_role(&user.email, ROLE_USER).await {
        warn!("Failed to assign role to '{}': {}", user.email, e);
    }
    info!("Registered user '{}'", user.email);
    start_session(&state, jar, &user.email, "/movies")
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let cookie = SetCookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    (jar.remove(cookie), Redirect::to("/login"))
}

fn start_session(state: &AppState, jar: CookieJar, email: &str, destination: &str) -> Response {
    match issue_session(&state.session_secret, email, Utc::now().timestamp()) {
        Some(token) => {
            (jar.add(session_cookie(token)), Redirect::to(destination)).into_response()
        }
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
