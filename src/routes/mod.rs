pub mod endpoint;
pub mod pages;
pub mod posts;
pub mod session;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use chrono::Local;
use tera::Context;

use crate::authoring::POST_TYPES;
use crate::components::{self, Notice, PostForm, Stats};
use crate::error::AppError;
use crate::models::post::Post;
use crate::render::Templates;
use crate::services::{Credential, Platform, PostService};

pub const SITE_TITLE: &str = "Pixel Diary";

pub const HX_RESWAP: HeaderName = HeaderName::from_static("hx-reswap");
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");
pub const HX_RETARGET: HeaderName = HeaderName::from_static("hx-retarget");

#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub templates: Templates,
    pub post_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(platform: Arc<dyn Platform>, templates: Templates, post_secret: Option<&str>) -> Self {
        Self {
            platform,
            templates,
            post_secret: post_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }

    /// All posts, newest first, or a notice saying why there are none.
    pub async fn load_posts(&self) -> (Vec<Post>, Option<Notice>) {
        match self.platform.list_posts(Credential::Anon).await {
            Ok(posts) => (posts, None),
            Err(e) => {
                tracing::error!(error = %e, "Error loading posts");
                (Vec::new(), Some(Notice::error("Failed to load posts")))
            }
        }
    }

    fn context(&self, owner: bool) -> Context {
        let mut ctx = Context::new();
        ctx.insert("site_title", SITE_TITLE);
        ctx.insert("owner", &owner);
        ctx.insert("post_types", &POST_TYPES);
        ctx.insert("form", &PostForm::default());
        ctx.insert("oob", &false);
        ctx.insert("notices", &Vec::<Notice>::new());
        ctx.insert("preview", &None::<String>);
        ctx
    }

    async fn render(&self, name: &str, ctx: &Context) -> Result<String, AppError> {
        Ok(self.templates.render(name, ctx).await?)
    }

    /// Render one of the `views/` templates with extra variables.
    pub async fn view(
        &self,
        name: &str,
        owner: bool,
        fill: impl FnOnce(&mut Context),
    ) -> Result<String, AppError> {
        let mut ctx = self.context(owner);
        fill(&mut ctx);
        self.render(&format!("views/{name}.html"), &ctx).await
    }

    /// A complete document with `main_html` in the content area.
    pub async fn page(
        &self,
        owner: bool,
        main_html: &str,
        mut notices: Vec<Notice>,
    ) -> Result<String, AppError> {
        let (posts, failed) = self.load_posts().await;
        notices.extend(failed);

        let mut ctx = self.context(owner);
        ctx.insert("main_html", main_html);
        ctx.insert("recent", &components::recent_cards(&posts, owner));
        ctx.insert("stats", &Stats::new(posts.len()));
        ctx.insert("notices", &notices);
        ctx.insert("clock", &clock_now());
        self.render("page.html", &ctx).await
    }

    /// Notices as out-of-band swaps into `#notifications`.
    pub async fn notices(&self, notices: &[Notice]) -> Result<String, AppError> {
        let mut ctx = self.context(false);
        ctx.insert("oob", &true);
        ctx.insert("notices", notices);
        self.render("partials/notices.html", &ctx).await
    }

    /// The recent-posts list and stats for `posts`.
    pub async fn post_lists(&self, owner: bool, posts: &[Post], oob: bool) -> Result<String, AppError> {
        let mut ctx = self.context(owner);
        ctx.insert("oob", &oob);
        ctx.insert("recent", &components::recent_cards(posts, owner));
        ctx.insert("stats", &Stats::new(posts.len()));

        let mut html = self.render("partials/recent_posts.html", &ctx).await?;
        ctx.insert("oob", &true);
        html.push_str(&self.render("partials/stats.html", &ctx).await?);
        Ok(html)
    }

    /// Fetch posts again and render the lists plus any notices.
    pub async fn refreshed_lists(
        &self,
        owner: bool,
        oob: bool,
        mut notices: Vec<Notice>,
    ) -> Result<String, AppError> {
        let (posts, failed) = self.load_posts().await;
        notices.extend(failed);
        let mut html = self.post_lists(owner, &posts, oob).await?;
        html.push_str(&self.notices(&notices).await?);
        Ok(html)
    }

    /// Leave the swap target alone and only show `notices`.
    pub async fn notice_response(&self, notices: &[Notice]) -> Result<Response, AppError> {
        let html = self.notices(notices).await?;
        Ok(([(HX_RESWAP, HeaderValue::from_static("none"))], Html(html)).into_response())
    }

    pub async fn auth_panel(&self, owner: bool, form: &PostForm) -> Result<String, AppError> {
        let mut ctx = self.context(owner);
        ctx.insert("form", form);
        self.render("partials/auth_panel.html", &ctx).await
    }

    pub async fn post_form(&self, form: &PostForm) -> Result<String, AppError> {
        let mut ctx = self.context(true);
        ctx.insert("form", form);
        self.render("partials/post_form.html", &ctx).await
    }

    /// An empty file input with no preview.
    pub async fn image_field(&self) -> Result<String, AppError> {
        self.render("partials/image_field.html", &self.context(true)).await
    }

    /// `preview` is a `data:` URL of the chosen image, or `None` to hide it.
    pub async fn image_preview(&self, preview: Option<&str>) -> Result<String, AppError> {
        let mut ctx = self.context(true);
        ctx.insert("preview", &preview);
        self.render("partials/image_preview.html", &ctx).await
    }
}

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

pub fn clock_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
