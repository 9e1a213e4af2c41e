use serde::{Deserialize, Serialize};

use super::repo::Question;

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub qtype: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "order")]
    pub position: i32,
}

/// Patch body; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub qtype: Option<String>,
    pub required: Option<bool>,
    #[serde(rename = "order")]
    pub position: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: Question,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults() {
        let req: CreateQuestionRequest =
            serde_json::from_str(r#"{"title":"q","type":"single"}"#).unwrap();
        assert_eq!(req.qtype, "single");
        assert!(!req.required);
        assert_eq!(req.position, 0);
    }

    #[test]
    fn question_serializes_wire_names() {
        let q = Question {
            id: uuid::Uuid::new_v4(),
            survey_id: uuid::Uuid::new_v4(),
            title: "q".into(),
            qtype: "multi".into(),
            required: true,
            position: 3,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"type\":\"multi\""));
        assert!(json.contains("\"order\":3"));
        assert!(json.contains("surveyId"));
    }
}
