//! View models handed to the tera templates. Everything shown on a page is
//! worked out here so the templates only lay it out.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::authoring::Draft;
use crate::models::post::Post;

pub const RECENT_LIMIT: usize = 5;
pub const EXCERPT_CHARS: usize = 150;

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Project {
    pub name: &'static str,
    pub blurb: &'static str,
    pub link_text: &'static str,
}

pub const PROJECTS: [Project; 2] = [
    Project {
        name: "Pixelated Dreams",
        blurb: "A surreal retro game where you jump through a world of floating objects, glitch effects, and neon pastels.",
        link_text: "Check it out →",
    },
    Project {
        name: "Neon Escape",
        blurb: "A dreamlike game where the character navigates through a city filled with pixelated stars, clouds, and fuzzy neon lights.",
        link_text: "Explore it →",
    },
];

#[derive(Serialize, Debug, Clone)]
pub struct ContactLine {
    pub icon: &'static str,
    pub label: &'static str,
    pub value: &'static str,
}

pub const CONTACT: [ContactLine; 3] = [
    ContactLine {
        icon: "📧",
        label: "Email",
        value: "your-email@example.com",
    },
    ContactLine {
        icon: "🐦",
        label: "Twitter",
        value: "@yourhandle",
    },
    ContactLine {
        icon: "💻",
        label: "GitHub",
        value: "yourusername",
    },
];

/// `Jan 5, 2024`
pub fn display_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// First `max` characters, with `...` when something was cut.
pub fn excerpt(content: &str, max: usize) -> String {
    match content.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub post_type: String,
    pub body: String,
    pub image_url: Option<String>,
    pub date: String,
    pub can_delete: bool,
}

impl PostCard {
    fn new(post: &Post, body: String, can_delete: bool) -> Self {
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            post_type: post.post_type.clone(),
            body,
            image_url: post.image_url.clone(),
            date: display_date(&post.created_at),
            can_delete,
        }
    }

    /// Full content, for the detail view.
    pub fn full(post: &Post) -> Self {
        Self::new(post, post.content.clone(), false)
    }
}

/// Newest posts for the sidebar list; `posts` is already newest first.
pub fn recent_cards(posts: &[Post], owner: bool) -> Vec<PostCard> {
    posts
        .iter()
        .take(RECENT_LIMIT)
        .map(|p| PostCard::new(p, p.content.clone(), owner))
        .collect()
}

/// Every post with a trimmed body. Deleting happens from the recent list only.
pub fn all_cards(posts: &[Post]) -> Vec<PostCard> {
    posts
        .iter()
        .map(|p| PostCard::new(p, excerpt(&p.content, EXCERPT_CHARS), false))
        .collect()
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Stats {
    pub posts: usize,
    pub projects: usize,
}

impl Stats {
    pub fn new(post_count: usize) -> Self {
        Self {
            posts: post_count,
            projects: PROJECTS.len(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Serialize, Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// What the authoring form shows when (re)rendered.
#[derive(Serialize, Debug, Clone)]
pub struct PostForm {
    pub post_type: String,
    pub title: String,
    pub content: String,
}

impl From<&Draft> for PostForm {
    fn from(d: &Draft) -> Self {
        Self {
            post_type: d.post_type.clone(),
            title: d.title.clone(),
            content: d.content.clone(),
        }
    }
}

impl Default for PostForm {
    fn default() -> Self {
        Self::from(&Draft::default())
    }
}
