use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::confirm::PendingDelete;
use crate::error::{ClientError, ClientResult};
use crate::models::{LearningPlan, PlanId, PlanStep};

/// Editable learning plan. Always holds at least one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDraft {
    pub title: String,
    pub goal: String,
    pub skills: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub steps: Vec<PlanStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Default for PlanDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            goal: String::new(),
            skills: String::new(),
            image: None,
            steps: vec![PlanStep::default()],
            category: None,
            duration: None,
        }
    }
}

impl From<&LearningPlan> for PlanDraft {
    fn from(plan: &LearningPlan) -> Self {
        let steps = if plan.steps.is_empty() {
            vec![PlanStep::default()]
        } else {
            plan.steps.clone()
        };
        Self {
            title: plan.title.clone(),
            goal: plan.goal.clone(),
            skills: plan.skills.clone(),
            image: plan.image.clone(),
            steps,
            category: plan.category.clone(),
            duration: plan.duration.clone(),
        }
    }
}

impl PlanDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self) -> &mut PlanStep {
        self.steps.push(PlanStep::default());
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }

    /// Steps can only be removed while more than one remains.
    pub fn can_remove_steps(&self) -> bool {
        self.steps.len() > 1
    }

    pub fn remove_step(&mut self, index: usize) -> Option<PlanStep> {
        if !self.can_remove_steps() || index >= self.steps.len() {
            return None;
        }
        Some(self.steps.remove(index))
    }

    pub fn validate(&self) -> ClientResult<()> {
        let required = [
            ("title", &self.title),
            ("goal", &self.goal),
            ("skills", &self.skills),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ClientError::validation(format!("Plan {} is required.", name)));
        }
        if self.steps.is_empty() {
            return Err(ClientError::validation("A plan needs at least one step."));
        }
        if let Some(n) = self.steps.iter().position(|s| !s.is_complete()) {
            return Err(ClientError::validation(format!(
                "Step {} needs a topic, resources and a timeline.",
                n + 1
            )));
        }
        Ok(())
    }
}

/// Case-insensitive substring match on title or category.
pub fn filter_plans<'a>(plans: &'a [LearningPlan], query: &str) -> Vec<&'a LearningPlan> {
    let query = query.trim().to_lowercase();
    plans
        .iter()
        .filter(|plan| {
            query.is_empty()
                || plan.title.to_lowercase().contains(&query)
                || plan
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&query))
        })
        .collect()
}

pub struct LearningPlanManager {
    api: ApiClient,
    plans: RwLock<Vec<LearningPlan>>,
}

impl LearningPlanManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            plans: RwLock::new(Vec::new()),
        }
    }

    pub async fn list(&self) -> ClientResult<Vec<LearningPlan>> {
        let plans: Option<Vec<LearningPlan>> = self.api.get("/learningplans", false).await?;
        let plans = plans.unwrap_or_default();
        *self.plans.write().await = plans.clone();
        Ok(plans)
    }

    pub async fn plans(&self) -> Vec<LearningPlan> {
        self.plans.read().await.clone()
    }

    pub async fn get(&self, id: &PlanId) -> ClientResult<LearningPlan> {
        self.api.get(&format!("/learningplans/{}", id), false).await
    }

    /// Plans whose title or category contains `query`. Works on the list
    /// from the last [`list`](Self::list) call.
    pub async fn filter(&self, query: &str) -> Vec<LearningPlan> {
        let plans = self.plans.read().await;
        filter_plans(&plans, query).into_iter().cloned().collect()
    }

    pub async fn create(&self, draft: &PlanDraft) -> ClientResult<LearningPlan> {
        draft.validate()?;
        let plan: LearningPlan = self.api.post("/learningplans", draft, true).await?;
        self.plans.write().await.push(plan.clone());
        tracing::info!(plan_id = %plan.id, "Learning plan created");
        Ok(plan)
    }

    pub async fn update(&self, id: &PlanId, draft: &PlanDraft) -> ClientResult<LearningPlan> {
        draft.validate()?;
        let plan: LearningPlan = self
            .api
            .put(&format!("/learningplans/{}", id), draft, true)
            .await?;

        let mut plans = self.plans.write().await;
        if let Some(existing) = plans.iter_mut().find(|p| &p.id == id) {
            *existing = plan.clone();
        }
        tracing::info!(plan_id = %id, "Learning plan updated");
        Ok(plan)
    }

    /// First phase of deleting a plan.
    pub fn delete(&self, id: &PlanId) -> PendingDelete<PlanId> {
        PendingDelete::new(id.clone())
    }

    /// Delete on the server; the local entry goes only once the server
    /// has acknowledged.
    pub async fn confirm_delete(&self, pending: PendingDelete<PlanId>) -> ClientResult<()> {
        let id = pending.into_target();
        self.api
            .delete(&format!("/learningplans/{}", id), true)
            .await?;
        self.plans.write().await.retain(|p| p.id != id);
        tracing::info!(plan_id = %id, "Learning plan deleted");
        Ok(())
    }
}
