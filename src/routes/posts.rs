use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::HeaderValue;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::auth::{CurrentUser, Publisher};
use crate::authoring::{self, Draft, ImageRejection, ImageUpload, MAX_IMAGE_BYTES};
use crate::components::{Notice, PostForm};
use crate::error::AppError;
use crate::models::post::PostId;
use crate::services::PostService;

use super::{AppState, HX_RESWAP, HX_RETARGET};

// room for the text fields next to a maximum-size image
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES * 2;

struct Submission {
    draft: Draft,
    image: Result<Option<ImageUpload>, ImageRejection>,
}

/// Buffer an image field, giving up as soon as it crosses the size limit.
/// `Ok(None)` when the file input was left empty.
async fn read_image(
    mut field: Field<'_>,
) -> Result<Result<Option<ImageUpload>, ImageRejection>, MultipartError> {
    // an empty file input still submits a nameless part
    let file_name = field.file_name().unwrap_or_default().to_owned();
    if file_name.is_empty() {
        return Ok(Ok(None));
    }
    let content_type = field.content_type().unwrap_or_default().to_owned();

    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Ok(Err(ImageRejection::TooLarge));
        }
        data.extend_from_slice(&chunk);
    }

    let upload = ImageUpload {
        file_name,
        content_type,
        data: Bytes::from(data),
    };
    Ok(upload.validate().map(|()| Some(upload)))
}

/// Read the authoring form. An image is checked while it streams in, so an
/// oversized file is abandoned as soon as it crosses the limit.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, MultipartError> {
    let mut draft = Draft::default();
    let mut image = Ok(None);

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "type" => draft.post_type = field.text().await?,
            "title" => draft.title = field.text().await?,
            "content" => draft.content = field.text().await?,
            "image" => {
                image = read_image(field).await?;
                if image.is_err() {
                    break;
                }
            }
            _ => (),
        }
    }

    Ok(Submission { draft, image })
}

async fn read_image_only(
    mut multipart: Multipart,
) -> Result<Result<Option<ImageUpload>, ImageRejection>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            return read_image(field).await;
        }
    }
    Ok(Ok(None))
}

/// Check an image as soon as it is chosen. A good one comes back as a
/// preview; a rejected one clears the file input.
async fn check_selected_image(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    if !user.is_owner() {
        return state
            .notice_response(&[Notice::error("You must be logged in to post")])
            .await;
    }

    match read_image_only(multipart).await {
        Ok(Ok(image)) => {
            let preview = image.as_ref().map(ImageUpload::preview_url);
            Ok(Html(state.image_preview(preview.as_deref()).await?).into_response())
        }
        Ok(Err(rejection)) => {
            tracing::info!(?rejection, "image rejected on selection");
            let mut html = state.image_field().await?;
            html.push_str(&state.notices(&[Notice::error(rejection.message())]).await?);
            Ok((
                [
                    (HX_RETARGET, HeaderValue::from_static("#image-field")),
                    (HX_RESWAP, HeaderValue::from_static("outerHTML")),
                ],
                Html(html),
            )
                .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "unreadable image selection");
            state
                .notice_response(&[Notice::error(format!("Failed to read image: {e}"))])
                .await
        }
    }
}

/// The "remove image" control: a fresh input without preview.
async fn clear_image(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.image_field().await?))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Ok(publisher) = Publisher::from_session(&user) else {
        return state
            .notice_response(&[Notice::error("You must be logged in to post")])
            .await;
    };

    let Submission { draft, image } = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable post submission");
            return state
                .notice_response(&[Notice::error(format!("Failed to create post: {e}"))])
                .await;
        }
    };

    // the re-rendered form never carries a file, which clears the input
    let image = match image {
        Ok(image) => image,
        Err(rejection) => {
            tracing::info!(?rejection, "image rejected before upload");
            let mut html = state.post_form(&PostForm::from(&draft)).await?;
            html.push_str(&state.notices(&[Notice::error(rejection.message())]).await?);
            return Ok(Html(html).into_response());
        }
    };

    match authoring::publish(state.platform.as_ref(), &publisher, &draft, image).await {
        Ok(rows) => {
            tracing::info!(rows = rows.len(), "post published");
            let mut html = state.post_form(&PostForm::default()).await?;
            html.push_str(
                &state
                    .refreshed_lists(true, true, vec![Notice::info("Post published successfully! ✨")])
                    .await?,
            );
            Ok(Html(html).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to create post");
            let mut html = state.post_form(&PostForm::from(&draft)).await?;
            html.push_str(
                &state
                    .notices(&[Notice::error(format!("Failed to create post: {e}"))])
                    .await?,
            );
            Ok(Html(html).into_response())
        }
    }
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Ok(publisher) = Publisher::from_session(&user) else {
        return state
            .notice_response(&[Notice::error("You must be logged in to delete posts")])
            .await;
    };

    let id = PostId::new(id);
    match state.platform.delete_post(publisher.credential(), &id).await {
        Ok(()) => {
            tracing::info!(%id, "post deleted");
            let html = state
                .refreshed_lists(true, false, vec![Notice::info("Post deleted")])
                .await?;
            Ok(Html(html).into_response())
        }
        Err(e) => {
            tracing::warn!(%id, error = %e, "failed to delete post");
            state
                .notice_response(&[Notice::error(format!("Failed to delete post: {e}"))])
                .await
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            post(create_post).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/posts/image-check",
            post(check_selected_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/posts/image-field", get(clear_image))
        .route("/posts/:id/delete", post(delete_post))
}
