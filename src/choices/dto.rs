use serde::{Deserialize, Serialize};

use super::repo::Choice;

#[derive(Debug, Deserialize)]
pub struct CreateChoiceRequest {
    pub label: String,
    pub value: String,
    #[serde(default, rename = "order")]
    pub position: i32,
}

/// Patch body; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateChoiceRequest {
    pub label: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "order")]
    pub position: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceResponse {
    pub choice: Choice,
}

#[derive(Debug, Serialize)]
pub struct ChoicesResponse {
    pub items: Vec<Choice>,
}
