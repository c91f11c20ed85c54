use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use super::StorageBackend;
use crate::{Category, Note, NoteKind, NoteTag, Result, Tag};

const NOTE_COLUMNS: &str =
    "id, title, content, categoryId, createdAt, updatedAt, reminder, type, parentId";

/// Embedded SQLite backend.
///
/// Every `save_*` call runs in one transaction that upserts each passed row by
/// primary key and deletes rows missing from the collection. A failure rolls
/// the whole transaction back.
///
/// Categories, notes and tags carry a `position` column holding their index in
/// the last saved collection, so reads return them in the order they were
/// saved. Note-tag links come back in insertion order.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        // The bundled SQLite turns foreign keys on by default. Deleting a
        // category must leave its notes untouched, so they stay off.
        conn.pragma_update(None, "foreign_keys", false)?;
        conn.execute_batch(include_str!("schema.sql"))?;

        // Migrate: databases written before folders and ordering existed lack
        // these columns.
        for (table, column, definition) in [
            ("notes", "type", "TEXT NOT NULL DEFAULT 'doc'"),
            ("notes", "parentId", "TEXT"),
            ("notes", "position", "INTEGER NOT NULL DEFAULT 0"),
            ("categories", "position", "INTEGER NOT NULL DEFAULT 0"),
            ("tags", "position", "INTEGER NOT NULL DEFAULT 0"),
        ] {
            let column_exists: bool = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
                [table, column],
                |row| row.get::<_, i64>(0).map(|count| count > 0),
            )?;
            if !column_exists {
                log::info!("Adding missing {table}.{column} column");
                conn.execute(
                    &format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"),
                    [],
                )?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks and returns the underlying connection.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for SqliteStorage {
    fn mode_name(&self) -> &'static str {
        "sqlite"
    }

    fn get_all_categories(&self) -> Result<Vec<Category>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, color, createdAt, updatedAt FROM categories ORDER BY position, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    created_at: date_column(row, 3)?,
                    updated_at: date_column(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn save_categories(&self, categories: &[Category]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO categories (id, name, color, createdAt, updatedAt, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    color = excluded.color,
                    createdAt = excluded.createdAt,
                    updatedAt = excluded.updatedAt,
                    position = excluded.position",
            )?;
            for (position, c) in categories.iter().enumerate() {
                upsert.execute(params![
                    c.id,
                    c.name,
                    c.color,
                    date_text(&c.created_at),
                    date_text(&c.updated_at),
                    position as i64,
                ])?;
            }
        }
        delete_missing(&tx, "categories", categories.iter().map(|c| c.id.as_str()))?;
        tx.commit()?;
        Ok(())
    }

    fn get_all_notes(&self) -> Result<Vec<Note>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY position, rowid"
        ))?;
        let rows = stmt
            .query_map([], map_note_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(Note::normalized).collect())
    }

    fn save_notes(&self, notes: &[Note]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        for (position, note) in notes.iter().enumerate() {
            upsert_note(&tx, note, position as i64)?;
        }
        delete_missing(&tx, "notes", notes.iter().map(|n| n.id.as_str()))?;
        tx.commit()?;
        Ok(())
    }

    fn save_one_note(&self, note: &Note) -> Result<()> {
        let conn = self.connection();
        // An existing row keeps its place; a new one goes last.
        let position: i64 = conn.query_row(
            "SELECT COALESCE(
                (SELECT position FROM notes WHERE id = ?1),
                (SELECT COALESCE(MAX(position) + 1, 0) FROM notes)
             )",
            [&note.id],
            |row| row.get(0),
        )?;
        upsert_note(&conn, note, position)?;
        Ok(())
    }

    fn get_note_by_id(&self, id: &str) -> Result<Option<Note>> {
        let conn = self.connection();
        let note = conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id],
                map_note_row,
            )
            .optional()?;
        Ok(note.map(Note::normalized))
    }

    fn get_all_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, color, createdAt, updatedAt FROM tags ORDER BY position, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    created_at: date_column(row, 3)?,
                    updated_at: date_column(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn save_tags(&self, tags: &[Tag]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO tags (id, name, color, createdAt, updatedAt, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    color = excluded.color,
                    createdAt = excluded.createdAt,
                    updatedAt = excluded.updatedAt,
                    position = excluded.position",
            )?;
            for (position, t) in tags.iter().enumerate() {
                upsert.execute(params![
                    t.id,
                    t.name,
                    t.color,
                    date_text(&t.created_at),
                    date_text(&t.updated_at),
                    position as i64,
                ])?;
            }
        }
        delete_missing(&tx, "tags", tags.iter().map(|t| t.id.as_str()))?;
        tx.commit()?;
        Ok(())
    }

    fn get_all_note_tags(&self) -> Result<Vec<NoteTag>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT noteId, tagId FROM noteTags ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(NoteTag {
                    note_id: row.get(0)?,
                    tag_id: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn save_note_tags(&self, note_tags: &[NoteTag]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        {
            let mut insert =
                tx.prepare("INSERT OR IGNORE INTO noteTags (noteId, tagId) VALUES (?1, ?2)")?;
            for link in note_tags {
                insert.execute(params![link.note_id, link.tag_id])?;
            }

            let keep: HashSet<(&str, &str)> = note_tags
                .iter()
                .map(|l| (l.note_id.as_str(), l.tag_id.as_str()))
                .collect();
            let existing: Vec<(String, String)> = {
                let mut stmt = tx.prepare("SELECT noteId, tagId FROM noteTags")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };
            let mut delete = tx.prepare("DELETE FROM noteTags WHERE noteId = ?1 AND tagId = ?2")?;
            for (note_id, tag_id) in existing
                .iter()
                .filter(|(n, t)| !keep.contains(&(n.as_str(), t.as_str())))
            {
                delete.execute(params![note_id, tag_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_note(conn: &Connection, note: &Note, position: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO notes (id, title, content, categoryId, createdAt, updatedAt, reminder, type, parentId, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            categoryId = excluded.categoryId,
            createdAt = excluded.createdAt,
            updatedAt = excluded.updatedAt,
            reminder = excluded.reminder,
            type = excluded.type,
            parentId = excluded.parentId,
            position = excluded.position",
        params![
            note.id,
            note.title,
            note.content,
            note.category_id,
            date_text(&note.created_at),
            date_text(&note.updated_at),
            note.reminder.as_ref().map(date_text),
            note.kind.as_str(),
            note.parent_id,
            position,
        ],
    )
}

/// Deletes every row of `table` whose `id` is not in `keep`.
fn delete_missing<'a>(
    tx: &Transaction<'_>,
    table: &str,
    keep: impl IntoIterator<Item = &'a str>,
) -> rusqlite::Result<usize> {
    let keep: HashSet<&str> = keep.into_iter().collect();
    let existing: Vec<String> = {
        let mut stmt = tx.prepare(&format!("SELECT id FROM {table}"))?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut delete = tx.prepare(&format!("DELETE FROM {table} WHERE id = ?1"))?;
    let mut removed = 0;
    for id in existing.iter().filter(|id| !keep.contains(id.as_str())) {
        removed += delete.execute([id])?;
    }
    Ok(removed)
}

fn map_note_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let reminder: Option<String> = row.get(6)?;
    let kind: Option<String> = row.get(7)?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        category_id: row.get(3)?,
        created_at: date_column(row, 4)?,
        updated_at: date_column(row, 5)?,
        reminder: reminder.map(|text| parse_date(6, &text)).transpose()?,
        kind: NoteKind::parse(kind.as_deref()),
        parent_id: row.get(8)?,
    })
}

fn date_text(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_date(idx, &text)
}

fn parse_date(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
