use std::fmt;

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{config::Settings, error::FatalError};

/// Every thread the bot manages starts with this, dated or not
pub const TITLE_PREFIX: &str = "Daily Discussion Thread";

/// Session credential returned by `login`, sent as a bearer token on every
/// authenticated call. Held in memory only.
#[derive(Clone)]
pub struct Jwt(String);

impl Jwt {
    fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn dummy() -> Self {
        Self("test.jwt".to_owned())
    }
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Jwt(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i32);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the sweep needs to know about an existing post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub featured: bool,
}

/// The four forum operations the bot consumes. Kept as a trait so the daily
/// flow can run against a recording fake in tests.
#[allow(async_fn_in_trait)]
pub trait ForumApi {
    async fn login(&self, username_or_email: &str, password: &str) -> anyhow::Result<Jwt>;

    async fn create_post(
        &self,
        auth: &Jwt,
        community_id: i32,
        title: &str,
    ) -> anyhow::Result<PostId>;

    /// Pin (or unpin) a post at community scope. Requires mod rights.
    async fn feature_post(&self, auth: &Jwt, post: PostId, featured: bool) -> anyhow::Result<()>;

    async fn list_posts(&self, auth: &Jwt, community_id: i32) -> anyhow::Result<Vec<PostSummary>>;
}

/// One attempt, no retry. A missing token or any transport error is fatal to
/// the run.
pub async fn log_in(api: &impl ForumApi, settings: &Settings) -> Result<Jwt, FatalError> {
    api.login(&settings.bot_user, &settings.bot_password)
        .await
        .map_err(FatalError::AuthFailed)
}

/// Thin client over the Lemmy HTTP API (v3). The wire format lives here and
/// nowhere else; callers only see `PostId`/`PostSummary`.
pub struct LemmyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LemmyClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/v3{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        )
    }
}

impl ForumApi for LemmyClient {
    async fn login(&self, username_or_email: &str, password: &str) -> anyhow::Result<Jwt> {
        let url = self.api_url("/user/login");
        let form = LoginForm {
            username_or_email,
            password,
        };

        let response = self
            .http
            .post(&url)
            .json(&form)
            .send()
            .await
            .context("Failed to submit login")?;
        let login: LoginResponse = parse_response(response, "login").await?;

        login
            .jwt
            .map(Jwt)
            .context("Login response carried no token")
    }

    async fn create_post(
        &self,
        auth: &Jwt,
        community_id: i32,
        title: &str,
    ) -> anyhow::Result<PostId> {
        let url = self.api_url("/post");
        let form = CreatePostForm {
            name: title,
            community_id,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(auth.as_str())
            .json(&form)
            .send()
            .await
            .context("Failed to submit post")?;
        let created: PostResponse = parse_response(response, "create-post").await?;

        Ok(created.post_view.post.id)
    }

    async fn feature_post(&self, auth: &Jwt, post: PostId, featured: bool) -> anyhow::Result<()> {
        let url = self.api_url("/post/feature");
        let form = FeaturePostForm {
            post_id: post,
            featured,
            feature_type: FeatureType::Community,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(auth.as_str())
            .json(&form)
            .send()
            .await
            .context("Failed to submit feature request")?;
        let _: PostResponse = parse_response(response, "feature").await?;

        Ok(())
    }

    async fn list_posts(&self, auth: &Jwt, community_id: i32) -> anyhow::Result<Vec<PostSummary>> {
        let url = self.api_url("/post/list");
        let query = ListPostsQuery {
            community_id,
            sort: SortType::Active,
        };

        let response = self
            .http
            .get(&url)
            .bearer_auth(auth.as_str())
            .query(&query)
            .send()
            .await
            .context("Failed to fetch community posts")?;
        let listing: ListPostsResponse = parse_response(response, "list-posts").await?;

        Ok(listing
            .posts
            .into_iter()
            .map(|view| PostSummary {
                id: view.post.id,
                title: view.post.name,
                featured: view.post.featured_community,
            })
            .collect())
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> anyhow::Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Lemmy error on {what}: {status}: {body}");
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {what} response"))
}

// Wire types, matching the slice of the Lemmy API the bot touches

#[derive(Serialize)]
struct LoginForm<'a> {
    username_or_email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    jwt: Option<String>,
}

#[derive(Serialize)]
struct CreatePostForm<'a> {
    name: &'a str,
    community_id: i32,
}

#[derive(Serialize)]
struct FeaturePostForm {
    post_id: PostId,
    featured: bool,
    feature_type: FeatureType,
}

#[derive(Serialize)]
enum FeatureType {
    Community,
}

#[derive(Serialize)]
struct ListPostsQuery {
    community_id: i32,
    sort: SortType,
}

#[derive(Serialize)]
enum SortType {
    Active,
}

#[derive(Deserialize)]
struct PostResponse {
    post_view: PostView,
}

#[derive(Deserialize)]
struct ListPostsResponse {
    posts: Vec<PostView>,
}

#[derive(Deserialize)]
struct PostView {
    post: PostData,
}

#[derive(Deserialize)]
struct PostData {
    id: PostId,
    name: String,
    featured_community: bool,
}
