use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{eq, SupabaseClient};

use crate::models::{DoctorError, Specialty, SpecialtyRequest, SpecialtyWithCount};

const SPECIALTIES: &str = "specialties";

#[derive(Debug, Deserialize)]
struct SpecialtyRef {
    specialty_id: Uuid,
}

pub struct SpecialtyService {
    supabase: SupabaseClient,
}

impl SpecialtyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<Specialty>, DoctorError> {
        Ok(self.supabase.select(SPECIALTIES, "order=name.asc").await?)
    }

    pub async fn list_with_counts(&self) -> Result<Vec<SpecialtyWithCount>, DoctorError> {
        let specialties = self.list().await?;
        let refs: Vec<SpecialtyRef> = self.supabase.select("doctors", "select=specialty_id").await?;
        let counts = count_by_specialty(refs.iter().map(|r| r.specialty_id));

        Ok(specialties
            .into_iter()
            .map(|s| SpecialtyWithCount {
                doctors_count: counts.get(&s.id).copied().unwrap_or(0),
                id: s.id,
                name: s.name,
                description: s.description,
            })
            .collect())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Specialty>, DoctorError> {
        let query = format!("id={}&limit=1", eq(id.to_string()));
        Ok(self.supabase.select_one(SPECIALTIES, &query).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Specialty>, DoctorError> {
        let query = format!("name={}&limit=1", eq(name.trim()));
        Ok(self.supabase.select_one(SPECIALTIES, &query).await?)
    }

    /// Resolves the specialty a doctor form refers to, by id first and by
    /// name otherwise.
    pub async fn resolve(
        &self,
        id: Option<Uuid>,
        name: Option<&str>,
    ) -> Result<Option<Specialty>, DoctorError> {
        let found = match (id, name.map(str::trim).filter(|n| !n.is_empty())) {
            (Some(id), _) => self.find(id).await?,
            (None, Some(name)) => self.find_by_name(name).await?,
            (None, None) => return Ok(None),
        };
        found.map(Some).ok_or(DoctorError::UnknownSpecialty)
    }

    pub async fn create(&self, request: &SpecialtyRequest) -> Result<SpecialtyWithCount, DoctorError> {
        let name = required_name(request)?;
        if self.find_by_name(&name).await?.is_some() {
            return Err(DoctorError::SpecialtyNameTaken);
        }

        let created: Specialty = self.supabase.insert(SPECIALTIES, json!({
            "name": name,
            "description": request.description.as_deref().unwrap_or("").trim()
        })).await?;

        info!("Created specialty {} ({})", created.name, created.id);
        Ok(SpecialtyWithCount {
            id: created.id,
            name: created.name,
            description: created.description,
            doctors_count: 0,
        })
    }

    /// `replace` is the PUT variant, where the name is required.
    pub async fn update(
        &self,
        id: Uuid,
        request: &SpecialtyRequest,
        replace: bool,
    ) -> Result<Specialty, DoctorError> {
        let existing = self.find(id).await?.ok_or(DoctorError::SpecialtyNotFound)?;

        let mut changes = Map::new();
        let name = if replace {
            Some(required_name(request)?)
        } else {
            request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)
        };

        if let Some(name) = name {
            if name != existing.name {
                if let Some(other) = self.find_by_name(&name).await? {
                    if other.id != id {
                        return Err(DoctorError::SpecialtyNameTaken);
                    }
                }
            }
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(description) = &request.description {
            changes.insert("description".to_string(), json!(description.trim()));
        }

        if changes.is_empty() {
            return Ok(existing);
        }

        let rows: Vec<Specialty> = self.supabase.update(
            SPECIALTIES,
            &format!("id={}", eq(id.to_string())),
            Value::Object(changes),
        ).await?;

        rows.into_iter().next().ok_or(DoctorError::SpecialtyNotFound)
    }

    /// Deletes a specialty no doctor refers to.
    pub async fn delete(&self, id: Uuid) -> Result<(), DoctorError> {
        self.find(id).await?.ok_or(DoctorError::SpecialtyNotFound)?;

        let refs: Vec<SpecialtyRef> = self.supabase.select(
            "doctors",
            &format!("select=specialty_id&specialty_id={}", eq(id.to_string())),
        ).await?;

        if !refs.is_empty() {
            debug!("Specialty {} still used by {} doctor(s)", id, refs.len());
            return Err(DoctorError::SpecialtyInUse(refs.len()));
        }

        let _: Vec<Value> = self.supabase.delete(SPECIALTIES, &format!("id={}", eq(id.to_string()))).await?;
        info!("Deleted specialty {}", id);
        Ok(())
    }
}

fn required_name(request: &SpecialtyRequest) -> Result<String, DoctorError> {
    request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DoctorError::required("name"))
}

pub fn count_by_specialty(specialty_ids: impl IntoIterator<Item = Uuid>) -> HashMap<Uuid, usize> {
    let mut counts = HashMap::new();
    for id in specialty_ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}
