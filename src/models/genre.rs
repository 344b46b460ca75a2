//! Genre lookup model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Create genre request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGenre {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
