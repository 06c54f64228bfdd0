use std::sync::OnceLock;

use regex::Regex;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ApiClient, RequestBody};
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Username used when the login message doesn't name the user.
pub const DEFAULT_USERNAME: &str = "User";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    #[serde(default)]
    message: Option<String>,
}

/// Extract `X` from a `"Welcome back, X!"` login message.
pub fn username_from_welcome(message: &str) -> String {
    static WELCOME: OnceLock<Regex> = OnceLock::new();
    let re = WELCOME.get_or_init(|| {
        Regex::new(r"Welcome back,\s*(.+)!").expect("welcome pattern is valid")
    });

    re.captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_USERNAME)
        .to_string()
}

pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> ClientResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::validation("E-mail and password are required."));
        }

        let response: AuthResponse = self
            .api
            .post(
                "/auth/login",
                &json!({ "email": email, "password": password }),
                false,
            )
            .await?;

        let session = self.start_session(response)?;
        let ctx = self.api.session();
        ctx.set_profile(None, Some(email))?;
        if remember_me {
            ctx.remember_email(email)?;
        }
        Ok(session)
    }

    /// Create an account. The caller still has to log in afterwards.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> ClientResult<()> {
        if [username, email, password].iter().any(|f| f.trim().is_empty()) {
            return Err(ClientError::validation(
                "Username, e-mail and password are required.",
            ));
        }

        let body = RequestBody::json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }))?;
        self.api
            .request(Method::POST, "/auth/register", Some(body), false)
            .await?;
        tracing::info!(username, "Account registered");
        Ok(())
    }

    /// Exchange a Google ID token for a CookHUB session.
    pub async fn google_login(&self, credential: &str) -> ClientResult<Session> {
        if credential.trim().is_empty() {
            return Err(ClientError::validation("Google credential is missing."));
        }

        let response: AuthResponse = self
            .api
            .post("/auth/google", &json!({ "token": credential }), false)
            .await?;
        self.start_session(response)
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.api.session().logout()
    }

    fn start_session(&self, response: AuthResponse) -> ClientResult<Session> {
        let username = username_from_welcome(response.message.as_deref().unwrap_or_default());
        let session = Session::new(response.token, username);
        self.api.session().login(&session)?;
        Ok(session)
    }
}
