use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::communities::CommunityDirectory;
use crate::config::Config;
use crate::error::ClientResult;
use crate::feed::FeedSynchronizer;
use crate::plans::LearningPlanManager;
use crate::posts::PostManager;
use crate::session::{FileCredentialStore, SessionContext};

/// Everything a front end needs, sharing one API client and session.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: SessionContext,
    pub auth: Arc<AuthService>,
    pub feed: Arc<FeedSynchronizer>,
    pub posts: Arc<PostManager>,
    pub plans: Arc<LearningPlanManager>,
    pub communities: Arc<CommunityDirectory>,
}

impl AppState {
    /// Build state backed by the credential file named in `config`.
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let store = FileCredentialStore::open(&config.credentials_path())?;
        tracing::debug!(path = %store.path().display(), "Opened credential store");
        Self::with_session(config, SessionContext::new(Arc::new(store)))
    }

    pub fn with_session(config: Config, session: SessionContext) -> ClientResult<Self> {
        let api = ApiClient::from_config(&config.api, session.clone())?;

        Ok(Self {
            auth: Arc::new(AuthService::new(api.clone())),
            feed: Arc::new(FeedSynchronizer::new(api.clone())),
            posts: Arc::new(PostManager::new(api.clone())),
            plans: Arc::new(LearningPlanManager::new(api.clone())),
            communities: Arc::new(CommunityDirectory::new(api)),
            config,
            session,
        })
    }
}
