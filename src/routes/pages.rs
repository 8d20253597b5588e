use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::components::{self, Notice, PostCard, CONTACT, PROJECTS};
use crate::error::AppError;
use crate::models::post::PostId;
use crate::services::{Credential, PostService};

use super::{clock_now, is_htmx, AppState, HX_TRIGGER};

/// Swap `main_html` into `#main-content` for htmx, or wrap it in the full page.
async fn main_view(
    state: &AppState,
    headers: &HeaderMap,
    user: &CurrentUser,
    main_html: String,
    notices: Vec<Notice>,
) -> Result<Html<String>, AppError> {
    if is_htmx(headers) {
        let mut html = main_html;
        html.push_str(&state.notices(&notices).await?);
        return Ok(Html(html));
    }
    Ok(Html(state.page(user.is_owner(), &main_html, notices).await?))
}

async fn home(State(state): State<AppState>, user: CurrentUser) -> Result<Html<String>, AppError> {
    let main = state.view("home", user.is_owner(), |_| {}).await?;
    Ok(Html(state.page(user.is_owner(), &main, Vec::new()).await?))
}

async fn recent(State(state): State<AppState>, user: CurrentUser) -> Result<Html<String>, AppError> {
    Ok(Html(
        state
            .refreshed_lists(user.is_owner(), false, Vec::new())
            .await?,
    ))
}

async fn all_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let owner = user.is_owner();
    let (posts, failed) = state.load_posts().await;

    let cards = components::all_cards(&posts);
    let mut main = state
        .view("all_posts", owner, |ctx| ctx.insert("posts", &cards))
        .await?;
    if is_htmx(&headers) {
        // listing also refreshes the sidebar, as the recent list and counts may be stale
        main.push_str(&state.post_lists(owner, &posts, true).await?);
    }
    main_view(&state, &headers, &user, main, failed.into_iter().collect()).await
}

async fn post_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = PostId::new(id);
    let post = match state.platform.get_post(Credential::Anon, &id).await {
        Ok(post) => post,
        Err(e) => {
            tracing::warn!(%id, error = %e, "failed to load post");
            let notice = vec![Notice::error("Failed to load post")];
            if is_htmx(&headers) {
                return state.notice_response(&notice).await;
            }
            let main = state.view("home", user.is_owner(), |_| {}).await?;
            return Ok(Html(state.page(user.is_owner(), &main, notice).await?).into_response());
        }
    };

    let card = PostCard::full(&post);
    let main = state
        .view("post_detail", user.is_owner(), |ctx| ctx.insert("post", &card))
        .await?;
    Ok(main_view(&state, &headers, &user, main, Vec::new())
        .await?
        .into_response())
}

async fn projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let main = state
        .view("projects", user.is_owner(), |ctx| ctx.insert("projects", &PROJECTS))
        .await?;
    main_view(&state, &headers, &user, main, Vec::new()).await
}

async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: CurrentUser,
) -> Result<Html<String>, AppError> {
    let main = state
        .view("contact", user.is_owner(), |ctx| ctx.insert("contact", &CONTACT))
        .await?;
    main_view(&state, &headers, &user, main, Vec::new()).await
}

async fn clock() -> String {
    clock_now()
}

/// "New post": jump to the form, or ask visitors to log in first.
async fn compose(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    if user.is_owner() {
        return Ok(([(HX_TRIGGER, HeaderValue::from_static("focus-post-form"))], "").into_response());
    }
    let html = state
        .notices(&[Notice::info("Please login to create posts")])
        .await?;
    Ok(([(HX_TRIGGER, HeaderValue::from_static("focus-login-form"))], Html(html)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/views/recent", get(recent))
        .route("/views/posts", get(all_posts))
        .route("/views/posts/:id", get(post_detail))
        .route("/views/projects", get(projects))
        .route("/views/contact", get(contact))
        .route("/views/clock", get(clock))
        .route("/views/compose", get(compose))
}
