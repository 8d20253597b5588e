//! In-process stand-in for the hosted platform, used for local development
//! and by the test suite. It follows the hosted row-level rules: anyone may
//! read, only a live session or the service key may write.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use axum::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::post::{NewPost, Post, PostId};
use crate::models::user::{Session, User};

use super::{
    AuthService, Credential, ImageStorage, PlatformError, PlatformResult, PostService, Svc,
};

struct Owner {
    email: String,
    password: String,
    user: User,
}

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Bytes,
}

pub struct MemoryPlatform {
    owner: Option<Owner>,
    sessions: DashMap<String, User>,
    posts: RwLock<Vec<Post>>,
    next_id: AtomicU64,
    objects: DashMap<String, StoredObject>,
    public_base: String,
    unavailable: AtomicBool,
    read_only: AtomicBool,
}

impl Svc for MemoryPlatform {}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            owner: None,
            sessions: DashMap::new(),
            posts: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            objects: DashMap::new(),
            public_base: "memory://blog-images".to_owned(),
            unavailable: AtomicBool::new(false),
            read_only: AtomicBool::new(false),
        }
    }

    /// Register the single account that may sign in.
    pub fn with_owner(mut self, email: &str, password: &str) -> Self {
        self.owner = Some(Owner {
            email: email.to_owned(),
            password: password.to_owned(),
            user: User {
                id: Uuid::new_v4().to_string(),
                email: Some(email.to_owned()),
            },
        });
        self
    }

    /// Simulate an outage: every call fails with a 503 until switched back.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Keep reads and sessions working but fail every insert, delete and upload.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.get(path).map(|o| o.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn check_up(&self) -> PlatformResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlatformError::api(
                503,
                json!({ "message": "service unavailable" }),
            ));
        }
        Ok(())
    }

    fn check_write(&self, cred: Credential<'_>) -> PlatformResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(PlatformError::api(
                500,
                json!({ "code": "25006", "message": "database is in read-only mode" }),
            ));
        }
        match cred {
            Credential::Service => Ok(()),
            Credential::User(token) if self.sessions.contains_key(token) => Ok(()),
            _ => Err(PlatformError::api(
                401,
                json!({ "code": "42501", "message": "permission denied for table posts" }),
            )),
        }
    }
}

#[async_trait]
impl AuthService for MemoryPlatform {
    async fn sign_in(&self, email: &str, password: &str) -> PlatformResult<Session> {
        self.check_up()?;
        let owner = self
            .owner
            .as_ref()
            .filter(|o| o.email.eq_ignore_ascii_case(email) && o.password == password)
            .ok_or_else(|| PlatformError::Rejected("Invalid login credentials".into()))?;

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), owner.user.clone());
        Ok(Session {
            user: owner.user.clone(),
            access_token: token,
        })
    }

    async fn sign_out(&self, access_token: &str) -> PlatformResult<()> {
        self.check_up()?;
        self.sessions.remove(access_token);
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> PlatformResult<Option<User>> {
        self.check_up()?;
        Ok(self.sessions.get(access_token).map(|u| u.clone()))
    }
}

#[async_trait]
impl PostService for MemoryPlatform {
    async fn list_posts(&self, _cred: Credential<'_>) -> PlatformResult<Vec<Post>> {
        self.check_up()?;
        // stored oldest first; ids break created_at ties
        let mut posts: Vec<Post> = self.posts.read().await.iter().rev().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn get_post(&self, _cred: Credential<'_>, id: &PostId) -> PlatformResult<Post> {
        self.check_up()?;
        self.posts
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("post {id}")))
    }

    async fn insert_post(&self, cred: Credential<'_>, post: &NewPost) -> PlatformResult<Vec<Post>> {
        self.check_up()?;
        self.check_write(cred)?;

        let row = Post {
            id: PostId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string()),
            post_type: post.post_type.clone().unwrap_or_default(),
            title: post.title.clone().unwrap_or_default(),
            content: post.content.clone().unwrap_or_default(),
            image_url: post.image_url.clone(),
            images: post.images.clone(),
            created_at: Utc::now(),
        };
        self.posts.write().await.push(row.clone());
        Ok(vec![row])
    }

    async fn delete_post(&self, cred: Credential<'_>, id: &PostId) -> PlatformResult<()> {
        self.check_up()?;
        self.check_write(cred)?;
        self.posts.write().await.retain(|p| &p.id != id);
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for MemoryPlatform {
    async fn upload(
        &self,
        cred: Credential<'_>,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> PlatformResult<()> {
        self.check_up()?;
        self.check_write(cred)?;
        if self.objects.contains_key(path) {
            return Err(PlatformError::api(
                409,
                json!({ "message": "The resource already exists" }),
            ));
        }
        self.objects.insert(
            path.to_owned(),
            StoredObject {
                content_type: content_type.to_owned(),
                data,
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str) -> NewPost {
        NewPost {
            post_type: Some("text".into()),
            title: Some(title.into()),
            content: Some("body".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sign_in_requires_owner_credentials() {
        let platform = MemoryPlatform::new().with_owner("me@example.com", "hunter2");

        let err = platform.sign_in("me@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let session = platform.sign_in("ME@example.com", "hunter2").await.unwrap();
        let user = platform.current_user(&session.access_token).await.unwrap();
        assert_eq!(user, Some(session.user.clone()));

        platform.sign_out(&session.access_token).await.unwrap();
        assert_eq!(platform.current_user(&session.access_token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn anon_cannot_write() {
        let platform = MemoryPlatform::new();
        let err = platform
            .insert_post(Credential::Anon, &new_post("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 401, .. }));

        let err = platform
            .insert_post(Credential::User("stale-token"), &new_post("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let platform = MemoryPlatform::new();
        for title in ["first", "second", "third"] {
            platform
                .insert_post(Credential::Service, &new_post(title))
                .await
                .unwrap();
        }

        let titles: Vec<String> = platform
            .list_posts(Credential::Anon)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn delete_by_id() {
        let platform = MemoryPlatform::new();
        let rows = platform
            .insert_post(Credential::Service, &new_post("gone"))
            .await
            .unwrap();
        let id = rows[0].id.clone();

        platform.delete_post(Credential::Service, &id).await.unwrap();
        assert!(matches!(
            platform.get_post(Credential::Anon, &id).await,
            Err(PlatformError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let platform = MemoryPlatform::new();
        platform.set_unavailable(true);
        assert!(platform.list_posts(Credential::Anon).await.is_err());
        platform.set_unavailable(false);
        assert!(platform.list_posts(Credential::Anon).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_only_rejects_writes_but_keeps_sessions() {
        let platform = MemoryPlatform::new().with_owner("me@example.com", "pw");
        let id = platform.insert_post(Credential::Service, &new_post("kept")).await.unwrap()[0]
            .id
            .clone();
        let session = platform.sign_in("me@example.com", "pw").await.unwrap();
        platform.set_read_only(true);

        let cred = Credential::User(&session.access_token);
        let err = platform.insert_post(cred, &new_post("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "database is in read-only mode");
        assert!(platform.delete_post(cred, &id).await.is_err());
        assert!(platform
            .upload(cred, "x.png", "image/png", Bytes::from_static(b"png"))
            .await
            .is_err());

        assert!(platform.current_user(&session.access_token).await.unwrap().is_some());
        assert_eq!(platform.list_posts(Credential::Anon).await.unwrap().len(), 1);
    }
}
