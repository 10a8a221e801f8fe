use super::decode;
use crate::{
    models::{LEARNING_OBJECTIVES, LearningObjective},
    store::{DocumentStore, StoreResult},
};

/// Load a learning objective by id.
pub async fn get_objective(
    store: &dyn DocumentStore,
    objective_id: &str,
) -> StoreResult<Option<LearningObjective>> {
    let Some(value) = store.get(LEARNING_OBJECTIVES, objective_id).await? else {
        return Ok(None);
    };
    let mut objective: LearningObjective = decode(LEARNING_OBJECTIVES, objective_id, value)?;
    if objective.id.is_empty() {
        objective.id = objective_id.to_string();
    }
    Ok(Some(objective))
}
