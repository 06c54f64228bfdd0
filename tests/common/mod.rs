//! In-process stand-in for the CookHUB REST API.
//!
//! Tokens are `token-<username>`. Every request is appended to a call log so
//! tests can assert on exactly what the client sent.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use cookhub::config::{ApiConfig, Config};
use cookhub::session::SessionContext;
use cookhub::state::AppState;

type Mock = Arc<Mutex<Backend>>;
type Reply = Result<Json<Value>, (StatusCode, String)>;

#[derive(Default)]
pub struct Backend {
    posts: Vec<Value>,
    comments: Vec<Value>,
    likes: HashSet<(String, String)>,
    plans: Vec<Value>,
    communities: Vec<Value>,
    forbidden_likes: HashSet<String>,
    broken_like_counts: HashSet<String>,
    public_delay: Option<Duration>,
    calls: Vec<String>,
    next_id: u64,
}

impl Backend {
    fn seeded() -> Self {
        let mut backend = Backend {
            next_id: 100,
            ..Backend::default()
        };

        backend.posts = vec![
            json!({
                "id": "p1", "title": "Sourdough Basics", "content": "Feed the starter daily",
                "images": ["data:image/png;base64,AAA"], "isPublic": true,
                "username": "alice", "userEmail": "alice@cookhub.test",
                "createdAt": "2026-10-01T10:00:00Z"
            }),
            json!({
                "id": "p2", "title": "Tomato Sauce", "content": "Slow simmer",
                "image": "data:image/jpeg;base64,BBB", "isPublic": true,
                "username": "bob", "createdAt": "2026-10-02T10:00:00Z"
            }),
            json!({
                "id": "p3", "title": "Secret Ramen", "content": "Not ready yet",
                "images": [], "isPublic": false, "username": "alice"
            }),
        ];
        backend.comments = vec![
            json!({ "id": "c1", "postId": "p1", "username": "bob", "comment": "Looks great" }),
            json!({ "id": "c2", "postId": "p1", "username": "alice", "comment": "Thanks!" }),
            json!({ "id": "c3", "postId": "p2", "username": "alice", "comment": "Yum" }),
        ];
        backend.likes.insert(("p1".into(), "bob".into()));
        backend.plans = vec![json!({
            "id": "plan-1", "title": "Italian Cuisine", "goal": "Cook a full dinner",
            "skills": "Pasta Making, Sauces", "progress": 40, "category": "Dinner",
            "duration": "4 weeks",
            "steps": [
                { "topic": "Fresh pasta", "resources": "Book", "timeline": "1 week" },
                { "topic": "Sauces", "resources": "Video", "timeline": "2 weeks" }
            ]
        })];
        backend.communities = vec![json!({
            "id": "com-1", "name": "Bakers", "description": "Bread and pastry"
        })];
        backend
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }
}

pub struct MockServer {
    pub base_url: String,
    backend: Mock,
}

impl MockServer {
    pub async fn start() -> Self {
        let backend: Mock = Arc::new(Mutex::new(Backend::seeded()));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/google", post(google))
            .route("/api/posts", post(create_post))
            .route("/api/posts/public", get(public_posts))
            .route("/api/posts/byLoggedInUser", get(own_posts))
            .route("/api/posts/{id}", put(update_post).delete(delete_post))
            .route("/api/posts/{id}/visibility", put(set_visibility))
            .route("/api/likecomment/likes/count/{id}", get(like_count))
            .route("/api/likecomment/comments/{id}", get(comments))
            .route("/api/likecomment/user-like/{id}", get(user_like))
            .route("/api/likecomment/toggle-like/{id}", post(toggle_like))
            .route(
                "/api/likecomment/comment/{id}",
                post(add_comment).put(edit_comment).delete(delete_comment),
            )
            .route("/api/learningplans", get(list_plans).post(create_plan))
            .route(
                "/api/learningplans/{id}",
                get(get_plan).put(update_plan).delete(delete_plan),
            )
            .route("/api/communities", get(list_communities).post(create_community))
            .layer(middleware::from_fn_with_state(backend.clone(), record))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            backend,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.backend.lock().unwrap().calls.clone()
    }

    /// Number of logged calls equal to e.g. `"DELETE /api/posts/p3"`.
    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn count_method(&self, method: &str) -> usize {
        let prefix = format!("{} ", method);
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn forbid_like(&self, post_id: &str) {
        self.backend
            .lock()
            .unwrap()
            .forbidden_likes
            .insert(post_id.to_string());
    }

    /// Make the like-count lookup for `post_id` fail with a 500.
    pub fn break_like_count(&self, post_id: &str) {
        self.backend
            .lock()
            .unwrap()
            .broken_like_counts
            .insert(post_id.to_string());
    }

    /// Hold the next `/posts/public` response for `delay` after it has read
    /// the post list.
    pub fn delay_next_public_load(&self, delay: Duration) {
        self.backend.lock().unwrap().public_delay = Some(delay);
    }

    pub fn add_public_post(&self, id: &str, title: &str, username: &str) {
        self.backend.lock().unwrap().posts.push(json!({
            "id": id, "title": title, "content": "", "images": [],
            "isPublic": true, "username": username
        }));
    }

    pub fn config(&self) -> Config {
        Config {
            api: ApiConfig {
                base_url: self.base_url.clone(),
                ..ApiConfig::default()
            },
            ..Config::default()
        }
    }

    /// Client state with an empty in-memory session.
    pub fn client(&self) -> AppState {
        AppState::with_session(self.config(), SessionContext::in_memory()).unwrap()
    }

    /// Client state logged in as `username` through `/auth/login`.
    pub async fn client_as(&self, username: &str) -> AppState {
        let state = self.client();
        state
            .auth
            .login(&format!("{}@cookhub.test", username), "secret", false)
            .await
            .unwrap();
        state
    }
}

async fn record(State(mock): State<Mock>, req: Request, next: Next) -> Response {
    mock.lock()
        .unwrap()
        .calls
        .push(format!("{} {}", req.method(), req.uri().path()));
    next.run(req).await
}

fn deny(status: StatusCode, message: &str) -> (StatusCode, String) {
    (status, message.to_string())
}

fn bearer_user(headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer token-"))
        .map(str::to_string)
        .ok_or_else(|| deny(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn welcome(username: &str) -> Json<Value> {
    Json(json!({
        "token": format!("token-{}", username),
        "message": format!("Welcome back, {}!", username),
    }))
}

async fn login(Json(body): Json<Value>) -> Reply {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"] == "wrong" {
        return Err(deny(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }
    let username = email.split('@').next().unwrap_or_default();
    Ok(welcome(username))
}

async fn register(Json(body): Json<Value>) -> Result<String, (StatusCode, String)> {
    if body["username"] == "taken" {
        return Err(deny(StatusCode::BAD_REQUEST, "Username already exists"));
    }
    Ok("User registered successfully".to_string())
}

async fn google(Json(body): Json<Value>) -> Reply {
    match body["token"].as_str() {
        Some("google-id-token") => Ok(welcome("gina")),
        _ => Err(deny(StatusCode::UNAUTHORIZED, "Invalid Google token")),
    }
}

async fn public_posts(State(mock): State<Mock>, headers: HeaderMap) -> Reply {
    bearer_user(&headers)?;
    let (posts, delay) = {
        let mut backend = mock.lock().unwrap();
        let posts: Vec<Value> = backend
            .posts
            .iter()
            .filter(|p| p["isPublic"] == true)
            .cloned()
            .collect();
        (posts, backend.public_delay.take())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Ok(Json(Value::Array(posts)))
}

async fn own_posts(State(mock): State<Mock>, headers: HeaderMap) -> Reply {
    let user = bearer_user(&headers)?;
    let backend = mock.lock().unwrap();
    let posts: Vec<Value> = backend
        .posts
        .iter()
        .filter(|p| p["username"] == user.as_str())
        .cloned()
        .collect();
    Ok(Json(Value::Array(posts)))
}

async fn create_post(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let user = bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let id = backend.next_id("p");
    let post = json!({
        "id": id, "title": body["title"], "content": body["content"],
        "images": body["images"], "isPublic": body["isPublic"],
        "username": user, "createdAt": "2026-10-18T09:00:00Z"
    });
    backend.posts.push(post.clone());
    Ok(Json(post))
}

fn owned_post<'a>(
    backend: &'a mut Backend,
    id: &str,
    user: &str,
) -> Result<&'a mut Value, (StatusCode, String)> {
    let post = backend
        .posts
        .iter_mut()
        .find(|p| p["id"] == id)
        .ok_or_else(|| deny(StatusCode::NOT_FOUND, "Post not found"))?;
    if post["username"] != user {
        return Err(deny(StatusCode::FORBIDDEN, "Not your post"));
    }
    Ok(post)
}

async fn update_post(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let user = bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let post = owned_post(&mut backend, &id, &user)?;
    for field in ["title", "content", "images", "isPublic"] {
        post[field] = body[field].clone();
    }
    // Updated posts come back without the legacy field or timestamp.
    if let Some(obj) = post.as_object_mut() {
        obj.remove("image");
    }
    let mut reply = post.clone();
    if let Some(obj) = reply.as_object_mut() {
        obj.remove("createdAt");
    }
    Ok(Json(reply))
}

async fn set_visibility(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let user = bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let post = owned_post(&mut backend, &id, &user)?;
    post["isPublic"] = body["isPublic"].clone();
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    owned_post(&mut backend, &id, &user)?;
    backend.posts.retain(|p| p["id"] != id.as_str());
    Ok(StatusCode::NO_CONTENT)
}

async fn like_count(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    bearer_user(&headers)?;
    let backend = mock.lock().unwrap();
    if backend.broken_like_counts.contains(&id) {
        return Err(deny(StatusCode::INTERNAL_SERVER_ERROR, "Like service unavailable"));
    }
    let count = backend.likes.iter().filter(|(post, _)| *post == id).count();
    Ok(Json(json!(count)))
}

async fn comments(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    bearer_user(&headers)?;
    let backend = mock.lock().unwrap();
    let comments: Vec<Value> = backend
        .comments
        .iter()
        .filter(|c| c["postId"] == id.as_str())
        .cloned()
        .collect();
    Ok(Json(Value::Array(comments)))
}

async fn user_like(State(mock): State<Mock>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let user = bearer_user(&headers)?;
    if header(&headers, "userId") != Some(format!("token-{}", user)) {
        return Err(deny(StatusCode::BAD_REQUEST, "Missing userId header"));
    }
    let backend = mock.lock().unwrap();
    let liked = backend.likes.contains(&(id, user));
    Ok(Json(json!({ "liked": liked })))
}

async fn toggle_like(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    bearer_user(&headers)?;
    let username = header(&headers, "username")
        .ok_or_else(|| deny(StatusCode::BAD_REQUEST, "Missing username header"))?;
    let mut backend = mock.lock().unwrap();
    if backend.forbidden_likes.contains(&id) {
        return Err(deny(StatusCode::FORBIDDEN, "Likes are disabled on this post"));
    }
    let key = (id, username);
    let liked = if backend.likes.remove(&key) {
        false
    } else {
        backend.likes.insert(key);
        true
    };
    Ok(Json(json!({ "liked": liked })))
}

async fn add_comment(
    State(mock): State<Mock>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    text: String,
) -> Reply {
    bearer_user(&headers)?;
    let username = header(&headers, "username")
        .ok_or_else(|| deny(StatusCode::BAD_REQUEST, "Missing username header"))?;
    let mut backend = mock.lock().unwrap();
    let id = backend.next_id("c");
    let comment = json!({ "id": id, "postId": post_id, "username": username, "comment": text });
    backend.comments.push(comment.clone());
    Ok(Json(comment))
}

fn own_comment<'a>(
    backend: &'a mut Backend,
    id: &str,
    headers: &HeaderMap,
) -> Result<&'a mut Value, (StatusCode, String)> {
    let username = header(headers, "username")
        .ok_or_else(|| deny(StatusCode::BAD_REQUEST, "Missing username header"))?;
    let comment = backend
        .comments
        .iter_mut()
        .find(|c| c["id"] == id)
        .ok_or_else(|| deny(StatusCode::NOT_FOUND, "Comment not found"))?;
    if comment["username"] != username.as_str() {
        return Err(deny(StatusCode::FORBIDDEN, "Not your comment"));
    }
    Ok(comment)
}

async fn edit_comment(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
    text: String,
) -> Reply {
    bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let comment = own_comment(&mut backend, &id, &headers)?;
    comment["comment"] = json!(text);
    Ok(Json(comment.clone()))
}

async fn delete_comment(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    own_comment(&mut backend, &id, &headers)?;
    backend.comments.retain(|c| c["id"] != id.as_str());
    Ok(StatusCode::OK)
}

async fn list_plans(State(mock): State<Mock>) -> Reply {
    Ok(Json(Value::Array(mock.lock().unwrap().plans.clone())))
}

async fn get_plan(State(mock): State<Mock>, Path(id): Path<String>) -> Reply {
    let backend = mock.lock().unwrap();
    backend
        .plans
        .iter()
        .find(|p| p["id"] == id.as_str())
        .cloned()
        .map(Json)
        .ok_or_else(|| deny(StatusCode::NOT_FOUND, "Learning plan not found"))
}

async fn create_plan(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    body["id"] = json!(backend.next_id("plan-"));
    body["progress"] = json!(0);
    backend.plans.push(body.clone());
    Ok(Json(body))
}

async fn update_plan(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let plan = backend
        .plans
        .iter_mut()
        .find(|p| p["id"] == id.as_str())
        .ok_or_else(|| deny(StatusCode::NOT_FOUND, "Learning plan not found"))?;
    body["id"] = json!(id);
    body["progress"] = plan["progress"].clone();
    *plan = body.clone();
    Ok(Json(body))
}

async fn delete_plan(
    State(mock): State<Mock>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    bearer_user(&headers)?;
    let mut backend = mock.lock().unwrap();
    let before = backend.plans.len();
    backend.plans.retain(|p| p["id"] != id.as_str());
    if backend.plans.len() == before {
        return Err(deny(StatusCode::NOT_FOUND, "Learning plan not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_communities(State(mock): State<Mock>) -> Reply {
    Ok(Json(Value::Array(mock.lock().unwrap().communities.clone())))
}

async fn create_community(State(mock): State<Mock>, Json(mut body): Json<Value>) -> Reply {
    let mut backend = mock.lock().unwrap();
    body["id"] = json!(backend.next_id("com-"));
    backend.communities.push(body.clone());
    Ok(Json(body))
}
