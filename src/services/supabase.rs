//! REST client for a Supabase-style platform: GoTrue auth, PostgREST tables
//! and object storage, all behind one project URL.

use std::time::Duration;

use axum::async_trait;
use axum::body::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::post::{NewPost, Post, PostId};
use crate::models::user::{Session, User};

use super::{
    AuthService, Credential, ImageStorage, PlatformError, PlatformResult, PostService, Svc,
};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 30;

const POSTS_TABLE: &str = "posts";

/// Object keys keep their `/` separators; everything else unusual is escaped.
const OBJECT_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: User,
}

impl Svc for SupabaseClient {}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_key: &str,
        bucket: &str,
    ) -> PlatformResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
            service_key: service_key.to_owned(),
            bucket: bucket.to_owned(),
        })
    }

    fn posts_url(&self) -> String {
        format!("{}/rest/v1/{POSTS_TABLE}", self.base_url)
    }

    /// Request against the posts table; filters go in with `.query()`.
    fn posts(&self, method: Method, cred: Credential<'_>) -> RequestBuilder {
        self.authed(self.http.request(method, self.posts_url()), cred)
    }

    fn select_one(&self, cred: Credential<'_>, id: &PostId) -> RequestBuilder {
        self.posts(Method::GET, cred)
            .query(&[("select", "*")])
            .query(&[("id", eq_filter(id))])
    }

    fn object_url(&self, scope: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{scope}{}/{}",
            self.base_url,
            self.bucket,
            utf8_percent_encode(path, OBJECT_PATH_SET)
        )
    }

    fn bearer<'a>(&'a self, cred: Credential<'a>) -> &'a str {
        match cred {
            Credential::Anon => &self.anon_key,
            Credential::User(token) => token,
            Credential::Service => &self.service_key,
        }
    }

    fn authed(&self, req: RequestBuilder, cred: Credential<'_>) -> RequestBuilder {
        // storage and PostgREST both want the project key as `apikey`
        let apikey = match cred {
            Credential::Service => &self.service_key,
            _ => &self.anon_key,
        };
        req.header("apikey", apikey).bearer_auth(self.bearer(cred))
    }

    async fn send(req: RequestBuilder) -> PlatformResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        tracing::warn!(status = status.as_u16(), %body, "platform call failed");
        Err(PlatformError::api(status.as_u16(), body))
    }
}

/// PostgREST `id=eq.<id>` filter value.
fn eq_filter(id: &PostId) -> String {
    format!("eq.{}", id.as_str())
}

#[async_trait]
impl AuthService for SupabaseClient {
    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> PlatformResult<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let req = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));

        let token = Self::send(req).await?.json::<TokenResponse>().await?;
        Ok(Session {
            user: token.user,
            access_token: token.access_token,
        })
    }

    #[tracing::instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> PlatformResult<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let req = self.authed(self.http.post(url), Credential::User(access_token));
        Self::send(req).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> PlatformResult<Option<User>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let req = self.authed(self.http.get(url), Credential::User(access_token));
        match Self::send(req).await {
            Ok(resp) => Ok(Some(resp.json::<User>().await?)),
            Err(PlatformError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl PostService for SupabaseClient {
    #[tracing::instrument(skip(self, cred))]
    async fn list_posts(&self, cred: Credential<'_>) -> PlatformResult<Vec<Post>> {
        let req = self
            .posts(Method::GET, cred)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        Ok(Self::send(req).await?.json().await?)
    }

    #[tracing::instrument(skip(self, cred))]
    async fn get_post(&self, cred: Credential<'_>, id: &PostId) -> PlatformResult<Post> {
        let req = self.select_one(cred, id);
        let rows: Vec<Post> = Self::send(req).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(format!("post {id}")))
    }

    #[tracing::instrument(skip(self, cred, post))]
    async fn insert_post(&self, cred: Credential<'_>, post: &NewPost) -> PlatformResult<Vec<Post>> {
        let req = self
            .posts(Method::POST, cred)
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .json(&[post]);
        Ok(Self::send(req).await?.json().await?)
    }

    #[tracing::instrument(skip(self, cred))]
    async fn delete_post(&self, cred: Credential<'_>, id: &PostId) -> PlatformResult<()> {
        let req = self
            .posts(Method::DELETE, cred)
            .query(&[("id", eq_filter(id))]);
        Self::send(req).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for SupabaseClient {
    #[tracing::instrument(skip(self, cred, data), fields(bytes = data.len()))]
    async fn upload(
        &self,
        cred: Credential<'_>,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> PlatformResult<()> {
        let req = self
            .authed(self.http.post(self.object_url("", path)), cred)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);
        Self::send(req).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.object_url("public/", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new("https://abc.supabase.co/", "anon", "service", "blog-images").unwrap()
    }

    fn query_pairs(req: RequestBuilder) -> Vec<(String, String)> {
        req.build()
            .unwrap()
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn trailing_slash_is_dropped() {
        assert_eq!(client().posts_url(), "https://abc.supabase.co/rest/v1/posts");
    }

    #[test]
    fn post_id_stays_inside_its_filter() {
        let c = client();
        let id = PostId::new("5&select=title#x+y%");
        let req = c.select_one(Credential::Anon, &id);

        assert_eq!(
            query_pairs(req),
            vec![
                ("select".to_owned(), "*".to_owned()),
                ("id".to_owned(), "eq.5&select=title#x+y%".to_owned()),
            ]
        );
    }

    #[test]
    fn public_url_points_into_bucket() {
        assert_eq!(
            client().public_url("1700000000000-k3j9x.png"),
            "https://abc.supabase.co/storage/v1/object/public/blog-images/1700000000000-k3j9x.png"
        );
    }

    #[test]
    fn object_paths_are_escaped() {
        let c = client();
        assert_eq!(
            c.public_url("odd name?.png"),
            "https://abc.supabase.co/storage/v1/object/public/blog-images/odd%20name%3F.png"
        );
        let upload = c.http.post(c.object_url("", "a#b.png")).build().unwrap();
        assert_eq!(upload.url().path(), "/storage/v1/object/blog-images/a%23b.png");
        assert_eq!(upload.url().query(), None);
    }

    #[test]
    fn bearer_follows_credential() {
        let c = client();
        assert_eq!(c.bearer(Credential::Anon), "anon");
        assert_eq!(c.bearer(Credential::Service), "service");
        assert_eq!(c.bearer(Credential::User("jwt")), "jwt");
    }

    #[test]
    fn id_filter() {
        assert_eq!(eq_filter(&PostId::new("17")), "eq.17");
    }
}
