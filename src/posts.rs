use std::path::Path;

use base64::prelude::{Engine, BASE64_STANDARD};
use reqwest::Method;
use serde_json::json;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::confirm::PendingDelete;
use crate::error::{ClientError, ClientResult};
use crate::models::{Post, PostDraft, PostId};

/// Most images a single post may carry.
pub const MAX_IMAGES: usize = 3;

/// Guess the MIME type of `path` from its extension, if it is an image.
pub fn image_mime(path: &Path) -> Option<mime::Mime> {
    mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime::IMAGE)
}

pub fn encode_data_url(mime: &mime::Mime, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime.essence_str(), BASE64_STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(PostId),
}

/// The create/edit form for the user's posts. Picking "edit" on a post loads
/// it into this same form; submitting or cancelling returns it to create mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PostForm {
    pub draft: PostDraft,
    mode: FormMode,
    validation_error: Option<String>,
}

impl Default for PostForm {
    fn default() -> Self {
        Self {
            draft: PostDraft::default(),
            mode: FormMode::Create,
            validation_error: None,
        }
    }
}

impl PostForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Back to an empty draft in create mode.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    pub async fn attach_image(&mut self, path: &Path) -> ClientResult<()> {
        self.attach_images(&[path]).await.map(|_| ())
    }

    /// Read, type-check and encode local image files into the draft.
    ///
    /// The whole batch is rejected, with nothing added, if it would push the
    /// draft past [`MAX_IMAGES`] or if any file is not an image.
    pub async fn attach_images<P: AsRef<Path>>(&mut self, paths: &[P]) -> ClientResult<usize> {
        self.validation_error = None;

        if self.draft.images.len() + paths.len() > MAX_IMAGES {
            return Err(self.reject(format!(
                "You can attach at most {} images to a post.",
                MAX_IMAGES
            )));
        }

        let mut typed = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            match image_mime(path) {
                Some(mime) => typed.push((path, mime)),
                None => return Err(self.reject("Please upload a valid image file.".to_string())),
            }
        }

        let mut encoded = Vec::with_capacity(typed.len());
        for (path, mime) in typed {
            let bytes = tokio::fs::read(path).await?;
            encoded.push(encode_data_url(&mime, &bytes));
        }

        let added = encoded.len();
        self.draft.images.extend(encoded);
        Ok(added)
    }

    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        (index < self.draft.images.len()).then(|| self.draft.images.remove(index))
    }

    fn reject(&mut self, message: String) -> ClientError {
        tracing::warn!(%message, "Post form rejected input");
        self.validation_error = Some(message.clone());
        ClientError::Validation(message)
    }
}

fn validate_draft(draft: &PostDraft) -> ClientResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ClientError::validation("Post title is required."));
    }
    if draft.content.trim().is_empty() {
        return Err(ClientError::validation("Post content is required."));
    }
    if draft.images.len() > MAX_IMAGES {
        return Err(ClientError::validation(format!(
            "You can attach at most {} images to a post.",
            MAX_IMAGES
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostStats {
    pub total: usize,
    pub public: usize,
    pub private: usize,
}

/// The logged-in user's own posts.
///
/// Unlike the feed, this list is updated from the post the server returns for
/// each mutation rather than by reloading.
pub struct PostManager {
    api: ApiClient,
    posts: RwLock<Vec<Post>>,
}

impl PostManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            posts: RwLock::new(Vec::new()),
        }
    }

    pub async fn load(&self) -> ClientResult<Vec<Post>> {
        let posts = self.api.get_posts("/posts/byLoggedInUser").await?;
        *self.posts.write().await = posts.clone();
        tracing::info!(posts = posts.len(), "Loaded own posts");
        Ok(posts)
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    pub async fn find(&self, id: &PostId) -> Option<Post> {
        self.posts.read().await.iter().find(|p| &p.id == id).cloned()
    }

    pub async fn stats(&self) -> PostStats {
        let posts = self.posts.read().await;
        let public = posts.iter().filter(|p| p.is_public).count();
        PostStats {
            total: posts.len(),
            public,
            private: posts.len() - public,
        }
    }

    pub async fn create(&self, draft: &PostDraft) -> ClientResult<Post> {
        validate_draft(draft)?;
        let post = self.api.send_post(Method::POST, "/posts", draft).await?;
        let post = self.with_author(post);
        self.posts.write().await.insert(0, post.clone());
        tracing::info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    pub async fn update(&self, id: &PostId, draft: &PostDraft) -> ClientResult<Post> {
        validate_draft(draft)?;
        let post = self
            .api
            .send_post(Method::PUT, &format!("/posts/{}", id), draft)
            .await?;
        let post = self.replace(id, post).await;
        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    pub async fn set_visibility(&self, id: &PostId, is_public: bool) -> ClientResult<Post> {
        let post = self
            .api
            .send_post(
                Method::PUT,
                &format!("/posts/{}/visibility", id),
                &json!({ "isPublic": is_public }),
            )
            .await?;
        let post = self.replace(id, post).await;
        tracing::info!(post_id = %id, is_public = post.is_public, "Visibility changed");
        Ok(post)
    }

    pub async fn toggle_visibility(&self, id: &PostId) -> ClientResult<Post> {
        let current = self
            .find(id)
            .await
            .ok_or_else(|| ClientError::NotFound(format!("post {}", id)))?;
        self.set_visibility(id, !current.is_public).await
    }

    /// First phase of deleting one of the user's posts.
    pub async fn delete(&self, id: &PostId) -> ClientResult<PendingDelete<PostId>> {
        if self.find(id).await.is_none() {
            return Err(ClientError::NotFound(format!("post {}", id)));
        }
        Ok(PendingDelete::new(id.clone()))
    }

    /// Delete on the server, then drop the entry locally.
    pub async fn confirm_delete(&self, pending: PendingDelete<PostId>) -> ClientResult<()> {
        let id = pending.into_target();
        self.api.delete(&format!("/posts/{}", id), true).await?;

        let mut posts = self.posts.write().await;
        if let Some(index) = posts.iter().position(|p| p.id == id) {
            posts.remove(index);
        }
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Load an existing post into `form` and switch it to edit mode.
    pub async fn begin_edit(&self, id: &PostId, form: &mut PostForm) -> ClientResult<()> {
        let post = self
            .find(id)
            .await
            .ok_or_else(|| ClientError::NotFound(format!("post {}", id)))?;
        form.draft = PostDraft::from(&post);
        form.mode = FormMode::Edit(post.id);
        form.validation_error = None;
        Ok(())
    }

    /// Create or update depending on the form's mode. On success the form is
    /// reset to an empty create-mode draft.
    pub async fn submit(&self, form: &mut PostForm) -> ClientResult<Post> {
        if let Err(e) = validate_draft(&form.draft) {
            form.validation_error = Some(e.to_string());
            return Err(e);
        }

        let post = match form.mode.clone() {
            FormMode::Create => self.create(&form.draft).await?,
            FormMode::Edit(id) => self.update(&id, &form.draft).await?,
        };
        form.reset();
        Ok(post)
    }

    fn with_author(&self, mut post: Post) -> Post {
        if post.author_username.is_empty() {
            post.author_username = self.api.session().username().unwrap_or_default();
        }
        post
    }

    /// Swap in the server's copy of a post, keeping fields the mutation
    /// response leaves out.
    async fn replace(&self, id: &PostId, post: Post) -> Post {
        let mut post = self.with_author(post);
        let mut posts = self.posts.write().await;
        if let Some(existing) = posts.iter_mut().find(|p| &p.id == id) {
            if post.created_at.is_none() {
                post.created_at = existing.created_at.clone();
            }
            if post.author_email.is_none() {
                post.author_email = existing.author_email.clone();
            }
            *existing = post.clone();
        }
        post
    }
}
