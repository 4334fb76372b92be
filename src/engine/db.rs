//! Database bootstrap: locating, opening and migrating the `SQLite` store.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_DIR: &str = ".marktrack";
const DB_FILE: &str = "state.db";

pub struct Db;

impl Db {
    /// Initializes the .marktrack directory and `SQLite` database schema.
    ///
    /// # Errors
    /// Returns error if directory creation, DB opening, or migration fails.
    pub fn init() -> Result<PathBuf> {
        if !Path::new(DB_DIR).exists() {
            fs::create_dir(DB_DIR).context("Failed to create .marktrack directory")?;
        }

        let db_path = Self::path();
        let conn = Self::open(&db_path)?;
        Self::migrate(&conn)?;
        Ok(db_path)
    }

    /// Connects to an existing database.
    ///
    /// # Errors
    /// Returns error if the database file does not exist or cannot be opened.
    pub fn connect() -> Result<Connection> {
        let db_path = Self::path();
        if !db_path.exists() {
            bail!("Tracker not initialized. Run `marktrack init` first.");
        }
        Self::open(&db_path)
    }

    /// Opens a private, fully migrated in-memory database.
    ///
    /// # Errors
    /// Returns error if migration fails.
    pub fn open_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::migrate(&conn)?;
        Ok(conn)
    }

    #[must_use]
    pub fn path() -> PathBuf {
        Path::new(DB_DIR).join(DB_FILE)
    }

    fn open(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path).context("Failed to open database")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;
        Ok(conn)
    }

    /// Applies the schema migrations.
    ///
    /// # Errors
    /// Returns error if any table cannot be created.
    pub fn migrate(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS areas (
                id INTEGER PRIMARY KEY,
                title TEXT UNIQUE NOT NULL,
                ord INTEGER UNIQUE NOT NULL CHECK (ord >= 1),
                remark TEXT
            )",
            [],
        )
        .context("Failed to create areas table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                title TEXT UNIQUE NOT NULL
            )",
            [],
        )
        .context("Failed to create projects table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS project_areas (
                project_id INTEGER NOT NULL,
                area_id INTEGER NOT NULL,
                executors_required INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (project_id, area_id),
                FOREIGN KEY(project_id) REFERENCES projects(id),
                FOREIGN KEY(area_id) REFERENCES areas(id)
            )",
            [],
        )
        .context("Failed to create project_areas table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            )",
            [],
        )
        .context("Failed to create employees table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                login TEXT UNIQUE NOT NULL
            )",
            [],
        )
        .context("Failed to create users table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS marks (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL,
                code TEXT NOT NULL,
                title TEXT NOT NULL,
                ord INTEGER NOT NULL,
                weight TEXT NOT NULL,
                count TEXT NOT NULL,
                remark TEXT,
                UNIQUE (project_id, code),
                FOREIGN KEY(project_id) REFERENCES projects(id)
            )",
            [],
        )
        .context("Failed to create marks table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS completions (
                id INTEGER PRIMARY KEY,
                mark_id INTEGER NOT NULL,
                area_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                count TEXT NOT NULL,
                creator_id INTEGER NOT NULL,
                remark TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(mark_id) REFERENCES marks(id),
                FOREIGN KEY(area_id) REFERENCES areas(id),
                FOREIGN KEY(creator_id) REFERENCES users(id)
            )",
            [],
        )
        .context("Failed to create completions table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS completion_executors (
                completion_id INTEGER NOT NULL,
                employee_id INTEGER NOT NULL,
                PRIMARY KEY (completion_id, employee_id),
                FOREIGN KEY(completion_id) REFERENCES completions(id),
                FOREIGN KEY(employee_id) REFERENCES employees(id)
            )",
            [],
        )
        .context("Failed to create completion_executors table")?;

        Ok(())
    }
}
