//! Directory Repository: projects, employees and users.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

pub struct DirectoryRepo<'a> {
    conn: &'a Connection,
}

impl<'a> DirectoryRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Adds a project.
    ///
    /// # Errors
    /// Returns an error if the title is already taken.
    pub fn add_project(&self, title: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO projects (title) VALUES (?1)", params![title])
            .with_context(|| format!("Failed to add project '{title}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Finds a project id by exact title.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_project(&self, title: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM projects WHERE title = ?1",
                params![title],
                |r| r.get(0),
            )
            .optional()
            .context("Project lookup failed")
    }

    /// Maps project ids to titles.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn project_titles(&self) -> Result<HashMap<i64, String>> {
        let mut stmt = self.conn.prepare("SELECT id, title FROM projects")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        let mut titles = HashMap::new();
        for row in rows {
            let (id, title) = row?;
            titles.insert(id, title);
        }
        Ok(titles)
    }

    /// Adds an employee who can be assigned as an executor.
    ///
    /// # Errors
    /// Returns an error if the name is already taken.
    pub fn add_employee(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO employees (name) VALUES (?1)", params![name])
            .with_context(|| format!("Failed to add employee '{name}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Finds an employee id by name (case-insensitive).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_employee(&self, name: &str) -> Result<Option<i64>> {
        let lower = name.trim().to_lowercase();
        Ok(self
            .employee_names()?
            .into_iter()
            .find(|(_, n)| n.to_lowercase() == lower)
            .map(|(id, _)| id))
    }

    /// Maps employee ids to names.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn employee_names(&self) -> Result<HashMap<i64, String>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM employees")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        let mut names = HashMap::new();
        for row in rows {
            let (id, name) = row?;
            names.insert(id, name);
        }
        Ok(names)
    }

    /// Returns true if an employee with this id exists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn employee_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT 1 FROM employees WHERE id = ?1", id)
    }

    /// Adds a user who can record completions.
    ///
    /// # Errors
    /// Returns an error if the login is already taken.
    pub fn add_user(&self, login: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO users (login) VALUES (?1)", params![login])
            .with_context(|| format!("Failed to add user '{login}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Finds a user id by exact login.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_user(&self, login: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM users WHERE login = ?1",
                params![login],
                |r| r.get(0),
            )
            .optional()
            .context("User lookup failed")
    }

    /// Maps user ids to logins.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn user_logins(&self) -> Result<HashMap<i64, String>> {
        let mut stmt = self.conn.prepare("SELECT id, login FROM users")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        let mut logins = HashMap::new();
        for row in rows {
            let (id, login) = row?;
            logins.insert(id, login);
        }
        Ok(logins)
    }

    /// Returns true if a user with this id exists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT 1 FROM users WHERE id = ?1", id)
    }

    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![id], |r| r.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::db::Db;

    #[test]
    fn test_employee_lookup() {
        let conn = Db::open_in_memory().unwrap();
        let repo = DirectoryRepo::new(&conn);
        let id = repo.add_employee("Иванов").unwrap();
        assert_eq!(repo.find_employee("иванов").unwrap(), Some(id));
        assert!(repo.employee_exists(id).unwrap());
        assert!(!repo.employee_exists(id + 1).unwrap());
        assert!(repo.add_employee("Иванов").is_err());
    }

    #[test]
    fn test_user_and_project_lookup() {
        let conn = Db::open_in_memory().unwrap();
        let repo = DirectoryRepo::new(&conn);
        let user = repo.add_user("master").unwrap();
        let project = repo.add_project("Bridge").unwrap();
        assert_eq!(repo.find_user("master").unwrap(), Some(user));
        assert!(repo.user_exists(user).unwrap());
        assert_eq!(repo.find_project("Bridge").unwrap(), Some(project));
        assert_eq!(repo.project_titles().unwrap().get(&project).map(String::as_str), Some("Bridge"));
        assert_eq!(repo.find_user("nobody").unwrap(), None);
    }
}
