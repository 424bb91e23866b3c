use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::{uuid, Uuid};

use crate::profiles::models::EmployeeProfile;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<EmployeeProfile>>;
    async fn get(&self, id: Uuid) -> Result<Option<EmployeeProfile>>;
    /// Replaces the profile's skills. Returns `None` when no such profile exists.
    async fn update_skills(&self, id: Uuid, skills: Vec<String>) -> Result<Option<EmployeeProfile>>;
}

pub struct InMemoryProfileRepository {
    profiles: RwLock<Vec<EmployeeProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new(profiles: Vec<EmployeeProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn list(&self) -> Result<Vec<EmployeeProfile>> {
        let mut profiles = self.profiles.read().await.clone();
        profiles.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(profiles)
    }

    async fn get(&self, id: Uuid) -> Result<Option<EmployeeProfile>> {
        Ok(self.profiles.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn update_skills(&self, id: Uuid, skills: Vec<String>) -> Result<Option<EmployeeProfile>> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.iter_mut().find(|p| p.id == id).map(|profile| {
            profile.skills = skills;
            profile.clone()
        }))
    }
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str = "id, first_name, last_name, date_of_birth, department_name, skills";

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn list(&self) -> Result<Vec<EmployeeProfile>> {
        let rows = sqlx::query_as::<_, EmployeeProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM employee_profiles ORDER BY last_name, first_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<EmployeeProfile>> {
        let row = sqlx::query_as::<_, EmployeeProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM employee_profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_skills(&self, id: Uuid, skills: Vec<String>) -> Result<Option<EmployeeProfile>> {
        let row = sqlx::query_as::<_, EmployeeProfile>(&format!(
            "UPDATE employee_profiles SET skills = $2, updated_at = NOW() WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(&skills)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

type SeedRow = (Uuid, &'static str, &'static str, (i32, u32, u32), &'static str, &'static [&'static str]);

const SEED_PROFILES: &[SeedRow] = &[
    (uuid!("2b4cc3a4-90d3-4e8b-8c16-8c50f6c5f9f1"), "Aya", "Mori", (1998, 4, 12), "Product", &["Product discovery", "Roadmapping"]),
    (uuid!("7e06c2fb-7c26-4d36-9f5a-49f5e7e78010"), "Mateo", "Silva", (1996, 11, 3), "Engineering", &["TypeScript", "API design", "React"]),
    (uuid!("63a9d4fb-6a52-4a2c-a0a6-3dfe4b5c7f12"), "Nia", "Okoye", (1999, 7, 19), "Data", &["SQL", "Python"]),
    (uuid!("b824a2f3-cb16-4a59-bc80-7c00f18c9f5d"), "Liam", "Keller", (1995, 2, 6), "Design", &["UX research", "Figma"]),
    (uuid!("cf0cf40c-90f5-4c33-8a35-9a2c85d4a3ef"), "Hana", "Sato", (1997, 9, 24), "Operations", &["Process mapping", "Vendor management"]),
    (uuid!("b2d43e2c-0e6c-42b4-b1b0-8cc663aaf5e6"), "Noah", "Ivanov", (1994, 12, 18), "Sales", &["Pipeline management", "Negotiation"]),
    (uuid!("593ea1a1-d5b2-4f59-9c4c-fb9c424f2d23"), "Priya", "Singh", (1998, 5, 30), "Marketing", &["Content strategy", "Campaign planning"]),
    (uuid!("d2151d6e-6c0a-4cd1-88de-10c525cc1fc4"), "Omar", "Zahid", (1993, 3, 14), "Finance", &["Forecasting", "Budgeting"]),
];

/// The demo profiles served when no database is configured.
/// Mirrors the rows inserted by the initial migration.
pub fn seed_profiles() -> Result<Vec<EmployeeProfile>> {
    SEED_PROFILES
        .iter()
        .map(|&(id, first_name, last_name, (y, m, d), department_name, skills)| {
            let date_of_birth = NaiveDate::from_ymd_opt(y, m, d)
                .with_context(|| format!("Invalid seed date of birth for profile {id}"))?;
            Ok::<_, anyhow::Error>(EmployeeProfile {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                date_of_birth,
                department_name: department_name.to_string(),
                skills: skills.iter().map(|s| s.to_string()).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryProfileRepository {
        InMemoryProfileRepository::new(seed_profiles().unwrap())
    }

    #[test]
    fn test_seed_profiles_are_unique() {
        let profiles = seed_profiles().unwrap();
        assert_eq!(profiles.len(), 8);
        let ids: std::collections::HashSet<_> = profiles.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let profiles = repo().list().await.unwrap();
        let last_names: Vec<_> = profiles.iter().map(|p| p.last_name.as_str()).collect();
        assert_eq!(
            last_names,
            vec!["Ivanov", "Keller", "Mori", "Okoye", "Sato", "Silva", "Singh", "Zahid"]
        );
    }

    #[tokio::test]
    async fn test_get_known_and_unknown_profile() {
        let repo = repo();
        let nia = repo
            .get(uuid!("63a9d4fb-6a52-4a2c-a0a6-3dfe4b5c7f12"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nia.first_name, "Nia");
        assert_eq!(nia.skills, vec!["SQL", "Python"]);

        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_skills_replaces_list() {
        let repo = repo();
        let id = uuid!("7e06c2fb-7c26-4d36-9f5a-49f5e7e78010");
        let updated = repo
            .update_skills(id, vec!["Rust".into(), "Go".into()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.skills, vec!["Rust", "Go"]);
        assert_eq!(repo.get(id).await.unwrap().unwrap().skills, vec!["Rust", "Go"]);
    }

    #[tokio::test]
    async fn test_update_skills_unknown_profile_is_none() {
        let repo = repo();
        let result = repo
            .update_skills(Uuid::new_v4(), vec!["Rust".into()])
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
