use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::api::{ApiClient, RequestBody};
use crate::confirm::PendingDelete;
use crate::error::{ClientError, ClientResult};
use crate::models::{Comment, CommentId, LikeState, Post, PostId, PostView};
use crate::session::Session;

#[derive(Debug, Default, Deserialize)]
struct UserLike {
    #[serde(default)]
    liked: bool,
}

/// Identifies a comment together with the post it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRef {
    pub post_id: PostId,
    pub comment_id: CommentId,
}

impl std::fmt::Display for CommentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "comment {} on post {}", self.comment_id, self.post_id)
    }
}

#[derive(Default)]
struct FeedState {
    posts: Vec<PostView>,
    applied_generation: u64,
}

/// The public feed. It is never patched locally: every mutation completes and
/// is then followed by a full reload.
pub struct FeedSynchronizer {
    api: ApiClient,
    state: RwLock<FeedState>,
    generation: AtomicU64,
}

impl FeedSynchronizer {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RwLock::new(FeedState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the currently displayed feed.
    pub async fn posts(&self) -> Vec<PostView> {
        self.state.read().await.posts.clone()
    }

    pub async fn find_comment(&self, comment_id: &CommentId) -> Option<Comment> {
        let state = self.state.read().await;
        state
            .posts
            .iter()
            .flat_map(|view| view.comments.iter())
            .find(|c| &c.id == comment_id)
            .cloned()
    }

    /// Whether the logged-in user may edit or delete `comment`.
    pub fn is_own_comment(&self, comment: &Comment) -> bool {
        self.api
            .session()
            .username()
            .is_some_and(|u| u == comment.author_username)
    }

    /// Fetch public posts and, concurrently for each post, its like count,
    /// comments and the viewer's like state.
    ///
    /// Any failed sub-request fails the whole load. Loads are numbered as they
    /// start; a load that finishes after a newer one has been applied is
    /// returned to its caller but not displayed.
    pub async fn load_public_feed(&self) -> ClientResult<Vec<PostView>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let posts = self.api.get_posts("/posts/public").await?;
        let views = try_join_all(posts.into_iter().map(|post| self.load_aggregates(post))).await?;

        let mut state = self.state.write().await;
        if generation > state.applied_generation {
            state.applied_generation = generation;
            state.posts = views.clone();
            tracing::info!(generation, posts = views.len(), "Feed loaded");
        } else {
            tracing::debug!(
                generation,
                applied = state.applied_generation,
                "Discarding stale feed load"
            );
        }

        Ok(views)
    }

    async fn load_aggregates(&self, post: Post) -> ClientResult<PostView> {
        let id = post.id.clone();
        let user_headers = [("userId", self.api.session().token().unwrap_or_default())];

        let count_path = format!("/likecomment/likes/count/{}", id);
        let comments_path = format!("/likecomment/comments/{}", id);
        let user_like_path = format!("/likecomment/user-like/{}", id);

        let (like_count, comments, user_like) = tokio::try_join!(
            self.api.get::<Option<u64>>(&count_path, true),
            self.api.get::<Option<Vec<Comment>>>(&comments_path, true),
            self.api.request_with_headers(
                Method::GET,
                &user_like_path,
                None,
                true,
                &user_headers,
            ),
        )?;

        let user_like: Option<UserLike> = serde_json::from_value(user_like)?;
        let comments = comments
            .unwrap_or_default()
            .into_iter()
            .map(|mut c| {
                if c.post_id.as_str().is_empty() {
                    c.post_id = id.clone();
                }
                c
            })
            .collect();

        Ok(PostView {
            post,
            likes: LikeState {
                like_count: like_count.unwrap_or(0),
                liked_by_viewer: user_like.unwrap_or_default().liked,
            },
            comments,
        })
    }

    /// Toggle the viewer's like on a post, then reload the feed.
    pub async fn toggle_like(&self, post_id: &PostId) -> ClientResult<Vec<PostView>> {
        let session = self.require_session()?;

        self.api
            .request_with_headers(
                Method::POST,
                &format!("/likecomment/toggle-like/{}", post_id),
                Some(RequestBody::Json(json!({}))),
                true,
                &[("userId", session.token), ("username", session.username)],
            )
            .await
            .map_err(|e| {
                if e.is_forbidden() {
                    tracing::warn!(%post_id, "Like rejected by server");
                }
                e
            })?;

        self.load_public_feed().await
    }

    /// Post a comment, then reload the feed. Blank text is rejected without
    /// any request.
    pub async fn add_comment(&self, post_id: &PostId, text: &str) -> ClientResult<Vec<PostView>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::validation("Please enter a comment."));
        }
        let session = self.require_session()?;

        self.api
            .request_with_headers(
                Method::POST,
                &format!("/likecomment/comment/{}", post_id),
                Some(RequestBody::Text(text.to_string())),
                true,
                &[("username", session.username)],
            )
            .await?;
        tracing::info!(%post_id, "Comment added");

        self.load_public_feed().await
    }

    /// Replace the text of one of the viewer's own comments, then reload.
    pub async fn edit_comment(
        &self,
        comment_id: &CommentId,
        text: &str,
    ) -> ClientResult<Vec<PostView>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::validation("Comment cannot be empty."));
        }
        let session = self.require_session()?;
        let comment = self
            .find_comment(comment_id)
            .await
            .ok_or_else(|| ClientError::NotFound(format!("comment {}", comment_id)))?;
        ensure_author(&comment, &session)?;

        self.api
            .request_with_headers(
                Method::PUT,
                &format!("/likecomment/comment/{}", comment_id),
                Some(RequestBody::Text(text.to_string())),
                true,
                &[("username", session.username)],
            )
            .await?;
        tracing::info!(%comment_id, "Comment updated");

        self.load_public_feed().await
    }

    /// First phase of deleting a comment: checks that it exists on the post
    /// and belongs to the viewer. Nothing is sent until
    /// [`confirm_delete_comment`](Self::confirm_delete_comment).
    pub async fn delete_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> ClientResult<PendingDelete<CommentRef>> {
        let session = self.require_session()?;
        let comment = self
            .find_comment(comment_id)
            .await
            .filter(|c| &c.post_id == post_id)
            .ok_or_else(|| ClientError::NotFound(format!("comment {}", comment_id)))?;
        ensure_author(&comment, &session)?;

        Ok(PendingDelete::new(CommentRef {
            post_id: post_id.clone(),
            comment_id: comment_id.clone(),
        }))
    }

    pub async fn confirm_delete_comment(
        &self,
        pending: PendingDelete<CommentRef>,
    ) -> ClientResult<Vec<PostView>> {
        let session = self.require_session()?;
        let target = pending.into_target();

        self.api
            .request_with_headers(
                Method::DELETE,
                &format!("/likecomment/comment/{}", target.comment_id),
                None,
                true,
                &[("username", session.username)],
            )
            .await?;
        tracing::info!(comment_id = %target.comment_id, "Comment deleted");

        self.load_public_feed().await
    }

    fn require_session(&self) -> ClientResult<Session> {
        self.api
            .session()
            .current_session()
            .ok_or(ClientError::Unauthenticated)
    }
}

fn ensure_author(comment: &Comment, session: &Session) -> ClientResult<()> {
    if comment.author_username != session.username {
        tracing::warn!(comment_id = %comment.id, "Refusing to modify another user's comment");
        return Err(ClientError::Forbidden(
            "Only the author can change this comment.".to_string(),
        ));
    }
    Ok(())
}

/// Comment input state for the feed: which post's composer is open and the
/// text typed so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommentComposer {
    open_for: Option<PostId>,
    text: String,
}

impl CommentComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the composer on `post_id`, or close it if it is already open there.
    pub fn toggle(&mut self, post_id: &PostId) {
        if self.is_open_for(post_id) {
            self.open_for = None;
        } else {
            self.open_for = Some(post_id.clone());
        }
    }

    pub fn is_open_for(&self, post_id: &PostId) -> bool {
        self.open_for.as_ref() == Some(post_id)
    }

    pub fn open_post(&self) -> Option<&PostId> {
        self.open_for.as_ref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Send the typed comment. On success the text is cleared and the
    /// composer closes; on failure both are kept.
    pub async fn submit(&mut self, feed: &FeedSynchronizer) -> ClientResult<Vec<PostView>> {
        let post_id = self
            .open_for
            .clone()
            .ok_or_else(|| ClientError::validation("Choose a post to comment on."))?;

        let views = feed.add_comment(&post_id, &self.text).await?;
        self.text.clear();
        self.open_for = None;
        Ok(views)
    }
}
