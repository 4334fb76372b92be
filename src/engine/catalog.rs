//! Catalog Loader: bulk-loads the plant description from JSON.
//!
//! Everything in one file is inserted in a single transaction; a file that
//! breaks any invariant inserts nothing.

use super::config::TrackerConfig;
use super::count::is_valid_count;
use super::repo::{AreaRepo, DirectoryRepo, MarkRepo, NewMark};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog is invalid:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("Catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Other(err.into())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaSpec {
    pub title: String,
    pub order: i64,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectAreaSpec {
    pub area: String,
    #[serde(default)]
    pub executors_required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkSpec {
    pub code: String,
    pub title: String,
    pub order: i64,
    pub weight: Decimal,
    pub count: Decimal,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSpec {
    pub title: String,
    #[serde(default)]
    pub areas: Vec<ProjectAreaSpec>,
    #[serde(default)]
    pub marks: Vec<MarkSpec>,
}

/// A plant description: areas, people and projects with their marks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub areas: Vec<AreaSpec>,
    #[serde(default)]
    pub employees: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub projects: Vec<ProjectSpec>,
}

/// What a load inserted.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub areas: usize,
    pub employees: usize,
    pub users: usize,
    pub projects: usize,
    pub marks: usize,
}

fn duplicates(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for v in values {
        if !seen.insert(v.clone()) && !dups.contains(&v) {
            dups.push(v);
        }
    }
    dups
}

impl Catalog {
    /// Parses a catalog from JSON text.
    ///
    /// # Errors
    /// Returns `CatalogError::Parse` for malformed JSON or unknown fields.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks the invariants that can be decided from the file alone.
    #[must_use]
    pub fn validate(&self, config: &TrackerConfig) -> Vec<String> {
        let mut errors = Vec::new();

        for area in &self.areas {
            if area.title.trim().is_empty() {
                errors.push("Area title must not be empty".to_string());
            }
            if area.order < 1 {
                errors.push(format!("Area '{}': order must be at least 1", area.title));
            }
        }
        for dup in duplicates(self.areas.iter().map(|a| a.title.to_lowercase())) {
            errors.push(format!("Area title '{dup}' is used twice"));
        }
        for dup in duplicates(self.areas.iter().map(|a| a.order.to_string())) {
            errors.push(format!("Area order {dup} is used twice"));
        }
        for dup in duplicates(self.employees.iter().map(|e| e.to_lowercase())) {
            errors.push(format!("Employee '{dup}' is listed twice"));
        }
        for dup in duplicates(self.users.iter().cloned()) {
            errors.push(format!("User '{dup}' is listed twice"));
        }
        for dup in duplicates(self.projects.iter().map(|p| p.title.clone())) {
            errors.push(format!("Project '{dup}' is listed twice"));
        }

        for project in &self.projects {
            for dup in duplicates(project.areas.iter().map(|a| a.area.to_lowercase())) {
                errors.push(format!("Project '{}': area '{dup}' is enabled twice", project.title));
            }
            for dup in duplicates(project.marks.iter().map(|m| m.code.clone())) {
                errors.push(format!("Project '{}': mark code '{dup}' is used twice", project.title));
            }
            for mark in &project.marks {
                if mark.code.trim().is_empty() {
                    errors.push(format!("Project '{}': mark code must not be empty", project.title));
                }
                if !is_valid_count(mark.count, config.count_multiplicity) {
                    errors.push(format!(
                        "Mark '{}': count {} must be a positive integer or a multiple of {}",
                        mark.code, mark.count, config.count_multiplicity
                    ));
                }
                if mark.weight <= config.min_unit_weight {
                    errors.push(format!(
                        "Mark '{}': weight {} must be greater than {}",
                        mark.code, mark.weight, config.min_unit_weight
                    ));
                }
            }
        }

        errors
    }

    /// Validates and inserts the whole catalog in one transaction.
    ///
    /// Project area references may name areas from this file or areas already stored.
    ///
    /// # Errors
    /// Returns `CatalogError::Invalid` listing every problem, or a database error.
    /// Nothing is inserted on error.
    pub fn load(
        &self,
        conn: &mut Connection,
        config: &TrackerConfig,
    ) -> Result<LoadSummary, CatalogError> {
        let errors = self.validate(config);
        if !errors.is_empty() {
            return Err(CatalogError::Invalid(errors));
        }

        let tx = conn.transaction()?;
        let mut summary = LoadSummary::default();
        {
            let areas = AreaRepo::new(&tx);
            let directory = DirectoryRepo::new(&tx);
            let marks = MarkRepo::new(&tx);

            for area in &self.areas {
                areas.add(area.title.trim(), area.order, area.remark.as_deref())?;
                summary.areas += 1;
            }
            for name in &self.employees {
                directory.add_employee(name.trim())?;
                summary.employees += 1;
            }
            for login in &self.users {
                directory.add_user(login.trim())?;
                summary.users += 1;
            }

            let mut missing = Vec::new();
            for project in &self.projects {
                let project_id = directory.add_project(project.title.trim())?;
                summary.projects += 1;

                for setting in &project.areas {
                    match areas.find_by_title(&setting.area)? {
                        Some(area) => areas.enable(project_id, area.id, setting.executors_required)?,
                        None => missing.push(format!(
                            "Project '{}': area '{}' does not exist",
                            project.title, setting.area
                        )),
                    }
                }

                for mark in &project.marks {
                    marks.add(&NewMark {
                        project_id,
                        code: mark.code.trim().to_string(),
                        title: mark.title.clone(),
                        order: mark.order,
                        weight: mark.weight,
                        count: mark.count,
                        remark: mark.remark.clone(),
                    })?;
                    summary.marks += 1;
                }
            }
            if !missing.is_empty() {
                return Err(CatalogError::Invalid(missing));
            }
        }
        tx.commit()?;

        info!(
            areas = summary.areas,
            projects = summary.projects,
            marks = summary.marks,
            "catalog loaded"
        );
        Ok(summary)
    }
}
