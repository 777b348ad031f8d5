//! SQLite schema and row-level operations for the bibliographic store.

use rusqlite::{Connection, OptionalExtension, params};

use crate::BibError;

/// Create the authors / resources / resource_authors relation if missing.
pub fn init_database(conn: &Connection) -> Result<(), BibError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            publication_date TEXT
        );

        CREATE TABLE IF NOT EXISTS resource_authors (
            resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
            PRIMARY KEY (resource_id, author_id)
        );

        CREATE INDEX IF NOT EXISTS idx_resource_authors_author ON resource_authors(author_id);
        "#,
    )?;
    Ok(())
}

/// Insert an author by name, returning the existing id when already present.
pub fn upsert_author(conn: &Connection, name: &str) -> Result<i64, BibError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM authors WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO authors (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Insert a resource and link it to each author inside one transaction.
pub fn insert_resource(
    conn: &Connection,
    title: &str,
    publication_date: Option<&str>,
    authors: &[&str],
) -> Result<i64, BibError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO resources (title, publication_date) VALUES (?1, ?2)",
        params![title, publication_date],
    )?;
    let resource_id = tx.last_insert_rowid();

    {
        let mut link_stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO resource_authors (resource_id, author_id) VALUES (?1, ?2)",
        )?;
        for author in authors {
            let author_id = upsert_author(&tx, author)?;
            link_stmt.execute(params![resource_id, author_id])?;
        }
    }

    tx.commit()?;
    Ok(resource_id)
}

/// Every (author name, publication date) pair joined through the link table.
pub fn author_dates(conn: &Connection) -> Result<Vec<(String, Option<String>)>, BibError> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.name, r.publication_date \
         FROM authors a \
         JOIN resource_authors ra ON a.id = ra.author_id \
         JOIN resources r ON r.id = ra.resource_id \
         ORDER BY r.id, a.id",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Row counts: (resources, authors, links).
pub fn get_counts(conn: &Connection) -> Result<(i64, i64, i64), BibError> {
    let resources: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
    let authors: i64 = conn.query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))?;
    let links: i64 =
        conn.query_row("SELECT COUNT(*) FROM resource_authors", [], |row| row.get(0))?;
    Ok((resources, authors, links))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = setup_db();
        init_database(&conn).unwrap();
        assert_eq!(get_counts(&conn).unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_upsert_author_reuses_id() {
        let conn = setup_db();
        let a = upsert_author(&conn, "Jane Smith").unwrap();
        let b = upsert_author(&conn, "Jane Smith").unwrap();
        assert_eq!(a, b);
        assert_eq!(get_counts(&conn).unwrap().1, 1);
    }

    #[test]
    fn test_insert_resource_links_authors() {
        let conn = setup_db();
        insert_resource(&conn, "Paper A", Some("2020-05-01"), &["Jane Smith", "Li Wei"]).unwrap();
        insert_resource(&conn, "Paper B", None, &["Jane Smith"]).unwrap();

        assert_eq!(get_counts(&conn).unwrap(), (2, 2, 3));

        let rows = author_dates(&conn).unwrap();
        assert_eq!(
            rows,
            vec![
                ("Jane Smith".to_string(), Some("2020-05-01".to_string())),
                ("Li Wei".to_string(), Some("2020-05-01".to_string())),
                ("Jane Smith".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_duplicate_author_in_one_resource_is_ignored() {
        let conn = setup_db();
        insert_resource(&conn, "Paper", Some("2001"), &["Ann Lee", "Ann Lee"]).unwrap();
        assert_eq!(get_counts(&conn).unwrap(), (1, 1, 1));
    }
}
