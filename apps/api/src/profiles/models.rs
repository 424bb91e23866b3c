use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EmployeeProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub department_name: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSkillsRequest {
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CvPreviewResponse {
    pub file_name: String,
    pub extracted_skills: Vec<String>,
}
