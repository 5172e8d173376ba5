use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One element of the exam list returned to a signed-in student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    #[serde(default, alias = "_id", alias = "examId", deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    pub title: String,
    /// Minutes; the backend sends either a number or a numeric string.
    #[serde(alias = "durationMinutes", deserialize_with = "deserialize_minutes")]
    pub duration: u64,
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
    #[serde(default, alias = "questions")]
    pub question: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRecord {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "subject_id", alias = "subject", deserialize_with = "deserialize_id")]
    pub subject_id: String,
    #[serde(alias = "question")]
    pub text: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl QuestionRecord {
    /// Explicit `options` win; otherwise flattened `optionA`, `optionB`, ... fields are collected.
    pub fn option_map(&self) -> BTreeMap<String, String> {
        if !self.options.is_empty() {
            return self.options.clone();
        }

        self.extra
            .iter()
            .filter(|(key, _)| key.len() > "option".len() && key.starts_with("option"))
            .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
            .collect()
    }
}

/// Body of a single answer save.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    #[validate(length(min = 1, message = "studentId must not be empty"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "questionId must not be empty"))]
    pub question_id: String,
    #[validate(length(min = 1, message = "selectedOption must not be empty"))]
    pub selected_option: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Text(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Scalar::Text(_) => Err(D::Error::custom("id must not be empty")),
        Scalar::Integer(value) => Ok(value.to_string()),
        Scalar::Float(value) => Err(D::Error::custom(format!("invalid id: {value}"))),
    }
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_id(deserializer).map(Some)
}

fn deserialize_minutes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let minutes = match Scalar::deserialize(deserializer)? {
        Scalar::Text(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("invalid duration: {raw}")))?,
        Scalar::Integer(value) => u64::try_from(value)
            .map_err(|_| D::Error::custom(format!("invalid duration: {value}")))?,
        Scalar::Float(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            value as u64
        }
        Scalar::Float(value) => {
            return Err(D::Error::custom(format!("invalid duration: {value}")));
        }
    };
    Ok(minutes)
}
