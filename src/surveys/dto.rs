use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Survey;
use crate::choices::repo::Choice;
use crate::questions::repo::Question;

#[derive(Debug, Deserialize)]
pub struct CreateSurveyRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Patch body; absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSurveyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SurveyResponse {
    pub survey: Survey,
}

#[derive(Debug, Serialize)]
pub struct SurveysResponse {
    pub items: Vec<Survey>,
}

/// Question with its choices, nested in the survey detail view.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDetail {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
    pub questions: Vec<QuestionDetail>,
}

impl SurveyDetail {
    pub fn assemble(survey: Survey, questions: Vec<Question>, mut choices: Vec<Choice>) -> Self {
        let questions = questions
            .into_iter()
            .map(|q| {
                let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut choices)
                    .into_iter()
                    .partition(|c| c.question_id == q.id);
                choices = rest;
                QuestionDetail {
                    question: q,
                    choices: own,
                }
            })
            .collect();
        Self {
            id: survey.id,
            owner_id: survey.owner_id,
            title: survey.title,
            description: survey.description,
            is_published: survey.is_published,
            created_at: survey.created_at,
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SurveyDetailResponse {
    pub survey: SurveyDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(survey_id: Uuid, title: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            survey_id,
            title: title.into(),
            qtype: "single".into(),
            required: false,
            position: 0,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn choice(question_id: Uuid, label: &str) -> Choice {
        Choice {
            id: Uuid::new_v4(),
            question_id,
            label: label.into(),
            value: label.into(),
            position: 0,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn assemble_groups_choices_under_their_question() {
        let survey = Survey {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "s".into(),
            description: None,
            is_published: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let q1 = question(survey.id, "q1");
        let q2 = question(survey.id, "q2");
        let choices = vec![choice(q1.id, "a"), choice(q2.id, "b"), choice(q1.id, "c")];

        let detail = SurveyDetail::assemble(survey, vec![q1.clone(), q2.clone()], choices);
        assert_eq!(detail.questions.len(), 2);
        assert_eq!(detail.questions[0].choices.len(), 2);
        assert_eq!(detail.questions[1].choices.len(), 1);
    }

    #[test]
    fn detail_serializes_nested_tree() {
        let survey = Survey {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "s".into(),
            description: Some("d".into()),
            is_published: true,
            created_at: OffsetDateTime::now_utc(),
        };
        let q = question(survey.id, "q");
        let detail = SurveyDetail::assemble(survey, vec![q.clone()], vec![choice(q.id, "a")]);
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("isPublished"));
        assert!(json.contains("\"questions\""));
        assert!(json.contains("\"choices\""));
    }
}
