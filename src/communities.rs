use serde_json::json;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::models::Community;

pub struct CommunityDirectory {
    api: ApiClient,
    communities: RwLock<Vec<Community>>,
}

impl CommunityDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            communities: RwLock::new(Vec::new()),
        }
    }

    pub async fn list(&self) -> ClientResult<Vec<Community>> {
        let communities: Option<Vec<Community>> = self.api.get("/communities", false).await?;
        let communities = communities.unwrap_or_default();
        *self.communities.write().await = communities.clone();
        Ok(communities)
    }

    pub async fn communities(&self) -> Vec<Community> {
        self.communities.read().await.clone()
    }

    pub async fn create(&self, name: &str, description: &str) -> ClientResult<Community> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("Community name is required."));
        }

        let community: Community = self
            .api
            .post(
                "/communities",
                &json!({ "name": name, "description": description.trim() }),
                false,
            )
            .await?;
        self.communities.write().await.push(community.clone());
        tracing::info!(community = %community.name, "Community created");
        Ok(community)
    }
}
