use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use crate::models::ChatMessageRow;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChatHistoryQuery {
    /// Maximum number of messages, newest ones win
    pub limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageRow>,
}
