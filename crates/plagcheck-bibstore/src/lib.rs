//! SQLite-backed bibliographic store.
//!
//! Holds known resources and their authors in a normalized
//! authors / resources / resource_authors relation and turns them into the
//! `{author}_{year}` keys the citation classifier joins against.

mod db;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

use plagcheck_parsing::citation_key;

#[derive(Error, Debug)]
pub enum BibError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid resource: {0}")]
    InvalidResource(String),
}

/// Row counts reported by [`BibDatabase::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BibStats {
    pub resources: i64,
    pub authors: i64,
    pub links: i64,
}

/// Handle to an opened bibliographic store.
pub struct BibDatabase {
    conn: Connection,
    path: Option<PathBuf>,
}

impl BibDatabase {
    /// Open (or create) a store at `path`, initializing the schema.
    pub fn open(path: &Path) -> Result<Self, BibError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        db::init_database(&conn)?;
        tracing::debug!(path = %path.display(), "opened bibliographic store");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Transient store, mainly for tests.
    pub fn open_in_memory() -> Result<Self, BibError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        db::init_database(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Record a resource with its authors.
    ///
    /// `publication_date` is free text; only a leading four-digit year is
    /// used for keys (`"2020-05-01"`, `"2020"`).
    pub fn add_resource(
        &self,
        title: &str,
        publication_date: Option<&str>,
        authors: &[&str],
    ) -> Result<i64, BibError> {
        if title.trim().is_empty() {
            return Err(BibError::InvalidResource("empty title".into()));
        }
        let authors: Vec<&str> = authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            return Err(BibError::InvalidResource(format!(
                "resource '{}' has no authors",
                title
            )));
        }
        db::insert_resource(&self.conn, title.trim(), publication_date, &authors)
    }

    /// All `{first-name-token}_{year}` keys, `{token}_unknown` when a
    /// resource has no usable date.
    pub fn fetch_reference_keys(&self) -> Result<HashSet<String>, BibError> {
        let mut keys = HashSet::new();
        for (name, date) in db::author_dates(&self.conn)? {
            let Some(first) = name.split_whitespace().next() else {
                continue;
            };
            let year = date
                .as_deref()
                .and_then(publication_year)
                .unwrap_or("unknown");
            keys.insert(citation_key(first, year));
        }
        Ok(keys)
    }

    pub fn stats(&self) -> Result<BibStats, BibError> {
        let (resources, authors, links) = db::get_counts(&self.conn)?;
        Ok(BibStats {
            resources,
            authors,
            links,
        })
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Leading four-digit year of a date string.
fn publication_year(date: &str) -> Option<&str> {
    let date = date.trim();
    let year = date.get(..4)?;
    year.bytes().all(|b| b.is_ascii_digit()).then_some(year)
}
