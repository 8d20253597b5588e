//! Creating posts: image checks, upload naming, and the upload-then-insert
//! sequence run for an authorized publisher.

use axum::body::Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rand::Rng;

use crate::auth::Publisher;
use crate::models::post::{NewPost, Post};
use crate::services::{ImageStorage, Platform, PlatformError, PostService};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_POST_TYPE: &str = "text";
pub const POST_TYPES: [&str; 5] = [DEFAULT_POST_TYPE, "art", "music", "game", "thought"];

const SUFFIX_LEN: usize = 6;
const FALLBACK_EXT: &str = "img";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRejection {
    TooLarge,
    NotAnImage,
}

impl ImageRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooLarge => "Image must be less than 5MB",
            Self::NotAnImage => "Please select an image file",
        }
    }
}

/// An image chosen in the authoring form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

pub fn check_image(size: usize, content_type: &str) -> Result<(), ImageRejection> {
    if size > MAX_IMAGE_BYTES {
        return Err(ImageRejection::TooLarge);
    }
    if !content_type.starts_with("image/") {
        return Err(ImageRejection::NotAnImage);
    }
    Ok(())
}

impl ImageUpload {
    pub fn validate(&self) -> Result<(), ImageRejection> {
        check_image(self.data.len(), &self.content_type)
    }

    /// Inline `data:` URL, for showing the chosen image before it is posted.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.data))
    }
}

/// `<unix millis>-<base36 suffix>.<ext>`, where `ext` is whatever follows the
/// last dot of the original name (the whole name if it has none).
///
/// Only ASCII letters and digits of the extension survive, so the name is safe
/// in both the upload path and the public URL. When nothing is left the
/// extension comes from the content type's subtype.
pub fn storage_name(
    original: &str,
    content_type: &str,
    now_millis: i64,
    rng: &mut impl Rng,
) -> String {
    let from_name = original.rsplit('.').next().unwrap_or(original);
    let mut ext = alphanumeric(from_name);
    if ext.is_empty() {
        let subtype = content_type.split(['/', '+', ';']).nth(1).unwrap_or_default();
        ext = alphanumeric(subtype);
    }
    if ext.is_empty() {
        ext = FALLBACK_EXT.to_owned();
    }

    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| std::char::from_digit(rng.random_range(0..36), 36))
        .collect();
    format!("{now_millis}-{suffix}.{ext}")
}

fn alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// The text fields of the authoring form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub post_type: String,
    pub title: String,
    pub content: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            post_type: DEFAULT_POST_TYPE.to_owned(),
            title: String::new(),
            content: String::new(),
        }
    }
}

/// Upload the image (if any), then insert the post pointing at it.
#[tracing::instrument(skip_all, fields(title = %draft.title, with_image = image.is_some()))]
pub async fn publish(
    platform: &dyn Platform,
    publisher: &Publisher,
    draft: &Draft,
    image: Option<ImageUpload>,
) -> Result<Vec<Post>, PlatformError> {
    let cred = publisher.credential();

    let image_url = match image {
        Some(image) => {
            let path = storage_name(
                &image.file_name,
                &image.content_type,
                Utc::now().timestamp_millis(),
                &mut rand::rng(),
            );
            platform
                .upload(cred, &path, &image.content_type, image.data)
                .await?;
            tracing::info!(%path, "uploaded post image");
            Some(platform.public_url(&path))
        }
        None => None,
    };

    let row = NewPost {
        post_type: Some(draft.post_type.clone()),
        title: Some(draft.title.clone()),
        content: Some(draft.content.clone()),
        image_url,
        images: None,
    };
    platform.insert_post(cred, &row).await
}
