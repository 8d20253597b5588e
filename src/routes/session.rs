use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::{expired_session_cookie, session_cookie, CurrentUser};
use crate::components::{Notice, PostForm};
use crate::error::AppError;
use crate::services::AuthService;

use super::AppState;

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

/// Swap the auth panel and re-render the recent posts, since delete buttons
/// depend on who is looking.
async fn auth_response(
    state: &AppState,
    owner: bool,
    notice: Notice,
) -> Result<Html<String>, AppError> {
    let mut html = state.auth_panel(owner, &PostForm::default()).await?;
    html.push_str(&state.refreshed_lists(owner, true, vec![notice]).await?);
    Ok(Html(html))
}

#[tracing::instrument(skip_all, fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.platform.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            tracing::info!(user = %session.user.id, "owner logged in");
            let jar = jar.add(session_cookie(session.access_token));
            let html = auth_response(&state, true, Notice::info("Logged in successfully! ✨")).await?;
            Ok((jar, html).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            // the login form stays as typed
            state
                .notice_response(&[Notice::error(format!("Login failed: {e}"))])
                .await
        }
    }
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> Result<(CookieJar, Html<String>), AppError> {
    let notice = match &user.0 {
        Some(session) => match state.platform.sign_out(&session.access_token).await {
            Ok(()) => Notice::info("Logged out successfully"),
            Err(e) => {
                tracing::warn!(error = %e, "logout failed");
                Notice::error(format!("Logout failed: {e}"))
            }
        },
        None => Notice::info("Logged out successfully"),
    };

    let jar = jar.remove(expired_session_cookie());
    let html = auth_response(&state, false, notice).await?;
    Ok((jar, html))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
}
