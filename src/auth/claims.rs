use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload: `{ _id, iat, exp }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: Uuid, // user ID
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
