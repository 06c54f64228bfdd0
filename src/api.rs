use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::{Post, PostId};
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl RequestBody {
    pub fn json(value: &impl Serialize) -> ClientResult<Self> {
        Ok(RequestBody::Json(serde_json::to_value(value)?))
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionContext) -> ClientResult<Self> {
        Self::from_config(
            &ApiConfig {
                base_url: base_url.into(),
                ..ApiConfig::default()
            },
            session,
        )
    }

    pub fn from_config(config: &ApiConfig, session: SessionContext) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        authenticated: bool,
    ) -> ClientResult<Value> {
        self.request_with_headers(method, path, body, authenticated, &[]).await
    }

    /// Issue a request with extra attribution headers (`username`, `userId`).
    ///
    /// When `authenticated` is set and no token is stored this fails with
    /// [`ClientError::Unauthenticated`] without touching the network.
    pub async fn request_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        authenticated: bool,
        headers: &[(&str, String)],
    ) -> ClientResult<Value> {
        let mut builder = self.http.request(method.clone(), self.url(path));

        if authenticated {
            let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
            builder = builder.bearer_auth(token);
        }

        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        builder = match body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.header(CONTENT_TYPE, "text/plain").body(text),
            None => builder,
        };

        tracing::debug!(%method, path, "API request");

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "API request failed");
            ClientError::Network(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%method, path, %status, "API request rejected");
            return Err(ClientError::from_status(status, text));
        }

        Ok(decode_body(&text))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        authenticated: bool,
    ) -> ClientResult<T> {
        let value = self.request(Method::GET, path, None, authenticated).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        authenticated: bool,
    ) -> ClientResult<T> {
        let body = RequestBody::json(body)?;
        let value = self
            .request(Method::POST, path, Some(body), authenticated)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        authenticated: bool,
    ) -> ClientResult<T> {
        let body = RequestBody::json(body)?;
        let value = self
            .request(Method::PUT, path, Some(body), authenticated)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete(&self, path: &str, authenticated: bool) -> ClientResult<()> {
        self.request(Method::DELETE, path, None, authenticated)
            .await?;
        Ok(())
    }

    /// Fetch a post listing and normalize every entry.
    pub async fn get_posts(&self, path: &str) -> ClientResult<Vec<Post>> {
        let value = self.request(Method::GET, path, None, true).await?;
        normalize_posts(value)
    }

    /// Send a post body and normalize the post the server echoes back.
    pub async fn send_post(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> ClientResult<Post> {
        let body = RequestBody::json(body)?;
        let value = self.request(method, path, Some(body), true).await?;
        normalize_post(value)
    }
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Posts as the server sends them: `images` on current records, a single
/// `image` string on legacy ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePost {
    id: PostId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, alias = "public")]
    is_public: bool,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<WirePost> for Post {
    fn from(wire: WirePost) -> Self {
        Post {
            id: wire.id,
            title: wire.title,
            content: wire.content,
            images: normalize_images(wire.images, wire.image),
            is_public: wire.is_public,
            author_username: wire.username.unwrap_or_default(),
            author_email: wire.user_email,
            created_at: wire.created_at,
        }
    }
}

/// Collapse `images` / legacy `image` into one list. A non-empty `images`
/// array wins; otherwise the legacy value is used if present.
pub fn normalize_images(images: Option<Vec<String>>, image: Option<String>) -> Vec<String> {
    let images: Vec<String> = images
        .unwrap_or_default()
        .into_iter()
        .filter(|i| !i.trim().is_empty())
        .collect();

    if !images.is_empty() {
        return images;
    }

    image.into_iter().filter(|i| !i.trim().is_empty()).collect()
}

pub fn normalize_post(value: Value) -> ClientResult<Post> {
    let wire: WirePost = serde_json::from_value(value)?;
    Ok(wire.into())
}

pub fn normalize_posts(value: Value) -> ClientResult<Vec<Post>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let wire: Vec<WirePost> = serde_json::from_value(value)?;
    Ok(wire.into_iter().map(Post::from).collect())
}
