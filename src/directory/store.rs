//! SQLite-backed account directory for users and institutions.
//!
//! Identity is the only durable state in the system; queues and tokens
//! are day-scoped and live in memory. One connection per call keeps the
//! store trivially Send + Sync.

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::PathBuf;
use uuid::Uuid;

use crate::core::token::{InstitutionId, UserId};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub reward_points: u32,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct InstitutionRecord {
    pub id: InstitutionId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)
            .map_err(|e| Error::Directory(format!("sqlite open: {}", e)))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                reward_points INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS institutions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT,
                address TEXT,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_institutions_email ON institutions(email);
            "#,
        )
        .map_err(|e| Error::Directory(format!("sqlite init: {}", e)))?;
        Ok(conn)
    }

    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRecord> {
        let name = name.trim();
        let email = normalize_email(email)?;
        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }

        let conn = self.connect()?;
        if self.find_user_by_email(&email)?.is_some() {
            return Err(Error::Validation("email already registered".to_string()));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: password_hash.to_string(),
            reward_points: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, reward_points, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.name,
                record.email,
                record.password_hash,
                record.reward_points,
                record.created_at
            ],
        )
        .map_err(|e| Error::Directory(format!("sqlite insert user: {}", e)))?;
        Ok(record)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = normalize_email(email)?;
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, password_hash, reward_points, created_at FROM users WHERE email = ?1")
            .map_err(|e| Error::Directory(format!("sqlite prepare user: {}", e)))?;
        let mut rows = stmt
            .query_map(params![email], row_to_user)
            .map_err(|e| Error::Directory(format!("sqlite query user: {}", e)))?;
        rows.next()
            .transpose()
            .map_err(|e| Error::Directory(format!("sqlite read user: {}", e)))
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, password_hash, reward_points, created_at FROM users WHERE id = ?1")
            .map_err(|e| Error::Directory(format!("sqlite prepare user: {}", e)))?;
        let mut rows = stmt
            .query_map(params![id.to_string()], row_to_user)
            .map_err(|e| Error::Directory(format!("sqlite query user: {}", e)))?;
        rows.next()
            .transpose()
            .map_err(|e| Error::Directory(format!("sqlite read user: {}", e)))
    }

    /// Add (or remove) reward points, never dropping below zero. Returns
    /// the new balance.
    pub fn adjust_reward_points(&self, id: UserId, delta: i64) -> Result<u32> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE users SET reward_points = MAX(0, reward_points + ?1) WHERE id = ?2",
            params![delta, id.to_string()],
        )
        .map_err(|e| Error::Directory(format!("sqlite update points: {}", e)))?;
        let points: i64 = conn
            .query_row(
                "SELECT reward_points FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| Error::Directory(format!("sqlite read points: {}", e)))?;
        Ok(points.max(0) as u32)
    }

    pub fn create_institution(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        address: Option<&str>,
        password_hash: &str,
    ) -> Result<InstitutionRecord> {
        let name = name.trim();
        let email = normalize_email(email)?;
        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }

        let conn = self.connect()?;
        if self.find_institution_by_email(&email)?.is_some() {
            return Err(Error::Validation("email already registered".to_string()));
        }

        let record = InstitutionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            phone: phone.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            address: address.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            password_hash: password_hash.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        conn.execute(
            "INSERT INTO institutions (id, name, email, phone, address, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.name,
                record.email,
                record.phone,
                record.address,
                record.password_hash,
                record.created_at
            ],
        )
        .map_err(|e| Error::Directory(format!("sqlite insert institution: {}", e)))?;
        Ok(record)
    }

    pub fn find_institution_by_email(&self, email: &str) -> Result<Option<InstitutionRecord>> {
        let email = normalize_email(email)?;
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, phone, address, password_hash, created_at FROM institutions WHERE email = ?1")
            .map_err(|e| Error::Directory(format!("sqlite prepare institution: {}", e)))?;
        let mut rows = stmt
            .query_map(params![email], row_to_institution)
            .map_err(|e| Error::Directory(format!("sqlite query institution: {}", e)))?;
        rows.next()
            .transpose()
            .map_err(|e| Error::Directory(format!("sqlite read institution: {}", e)))
    }

    pub fn get_institution(&self, id: InstitutionId) -> Result<Option<InstitutionRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, phone, address, password_hash, created_at FROM institutions WHERE id = ?1")
            .map_err(|e| Error::Directory(format!("sqlite prepare institution: {}", e)))?;
        let mut rows = stmt
            .query_map(params![id.to_string()], row_to_institution)
            .map_err(|e| Error::Directory(format!("sqlite query institution: {}", e)))?;
        rows.next()
            .transpose()
            .map_err(|e| Error::Directory(format!("sqlite read institution: {}", e)))
    }

    /// Case-insensitive search over institution names and addresses.
    /// An empty term lists everything.
    pub fn search_institutions(&self, term: &str) -> Result<Vec<InstitutionRecord>> {
        let conn = self.connect()?;
        let pattern = format!("%{}%", term.trim());
        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, phone, address, password_hash, created_at FROM institutions \
                 WHERE name LIKE ?1 OR address LIKE ?1 ORDER BY name",
            )
            .map_err(|e| Error::Directory(format!("sqlite prepare search: {}", e)))?;
        let rows = stmt
            .query_map(params![pattern], row_to_institution)
            .map_err(|e| Error::Directory(format!("sqlite search institutions: {}", e)))?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| Error::Directory(format!("sqlite read search: {}", e)))?);
        }
        Ok(records)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Validation("invalid email address".to_string()));
    }
    Ok(email)
}

fn parse_id(value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    let points: i64 = row.get(4)?;
    Ok(UserRecord {
        id: parse_id(row.get(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        reward_points: points.max(0) as u32,
        created_at: row.get(5)?,
    })
}

fn row_to_institution(row: &rusqlite::Row<'_>) -> rusqlite::Result<InstitutionRecord> {
    Ok(InstitutionRecord {
        id: parse_id(row.get(0)?)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory() -> (TempDir, Directory) {
        let dir = TempDir::new().unwrap();
        let store = Directory::new(dir.path().join("directory.db"));
        (dir, store)
    }

    #[test]
    fn test_user_round_trip() {
        let (_dir, store) = directory();
        let created = store.create_user("Asha", "asha@example.com", "hash").unwrap();
        assert_eq!(created.reward_points, 0);

        let found = store.find_user_by_email("ASHA@Example.COM").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Asha");
        assert_eq!(found.email, "asha@example.com");

        let by_id = store.get_user(created.id).unwrap().unwrap();
        assert_eq!(by_id.id, created.id);
        assert!(store.get_user(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (_dir, store) = directory();
        store.create_user("A", "same@example.com", "h1").unwrap();
        let err = store.create_user("B", "Same@Example.com", "h2").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_invalid_signup_input() {
        let (_dir, store) = directory();
        assert!(store.create_user("  ", "a@b.c", "h").is_err());
        assert!(store.create_user("A", "not-an-email", "h").is_err());
    }

    #[test]
    fn test_reward_points_floor_at_zero() {
        let (_dir, store) = directory();
        let user = store.create_user("Asha", "asha@example.com", "hash").unwrap();

        assert_eq!(store.adjust_reward_points(user.id, -10).unwrap(), 0);
        assert_eq!(store.adjust_reward_points(user.id, 10).unwrap(), 10);
        assert_eq!(store.adjust_reward_points(user.id, -3).unwrap(), 7);
        assert_eq!(store.adjust_reward_points(user.id, -100).unwrap(), 0);
    }

    #[test]
    fn test_institution_search() {
        let (_dir, store) = directory();
        store
            .create_institution("City Hospital", "city@example.com", Some("555-1234"), Some("12 Downtown Ave"), "h")
            .unwrap();
        store
            .create_institution("Valley Clinic", "valley@example.com", None, Some("9 Hillside Rd"), "h")
            .unwrap();

        assert_eq!(store.search_institutions("hosp").unwrap().len(), 1);
        assert_eq!(store.search_institutions("hillside").unwrap().len(), 1);
        assert_eq!(store.search_institutions("").unwrap().len(), 2);
        assert!(store.search_institutions("zzz").unwrap().is_empty());

        let all = store.search_institutions("").unwrap();
        assert_eq!(all[0].name, "City Hospital");
    }

    #[test]
    fn test_institution_round_trip() {
        let (_dir, store) = directory();
        let created = store
            .create_institution("Passport Office", "passport@example.com", None, None, "h")
            .unwrap();
        let found = store
            .find_institution_by_email("passport@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.phone.is_none());

        let by_id = store.get_institution(created.id).unwrap().unwrap();
        assert_eq!(by_id.name, "Passport Office");
    }
}
