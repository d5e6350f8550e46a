use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use nk_core::{Item, ItemKind};

use crate::error::Result;
use crate::schema;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Persist an item. Items are content-addressed, so re-persisting an
    /// existing id is a no-op. Returns whether a row was inserted.
    pub fn persist(&self, item: &Item) -> Result<bool> {
        let tags = serde_json::to_string(&item.tags)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO items (id, kind, created_at, content, tags, ref_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id,
                u16::from(item.kind),
                item.created_at as i64,
                item.content,
                tags,
                item.parent(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Delete by id. Deleting an absent id is a no-op; returns whether a
    /// row existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    pub fn get(&self, id: &str) -> Result<Option<Item>> {
        let row: Option<ItemRow> = self
            .conn
            .query_row(
                "SELECT id, kind, created_at, content, tags FROM items WHERE id = ?1",
                [id],
                read_row,
            )
            .optional()?;
        row.map(ItemRow::into_item).transpose()
    }

    /// All items of `kind` referencing `ref_id`, in insertion order.
    pub fn query_by_kind_and_reference(&self, kind: ItemKind, ref_id: &str) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, created_at, content, tags FROM items
             WHERE kind = ?1 AND ref_id = ?2 ORDER BY rowid",
        )?;
        let rows: Vec<ItemRow> = stmt
            .query_map(params![u16::from(kind), ref_id], read_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// All items of `kind`, in insertion order.
    pub fn query_all(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, created_at, content, tags FROM items
             WHERE kind = ?1 ORDER BY rowid",
        )?;
        let rows: Vec<ItemRow> = stmt
            .query_map([u16::from(kind)], read_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    pub fn count(&self, kind: ItemKind) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT count(*) FROM items WHERE kind = ?1",
            [u16::from(kind)],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    pub fn count_all(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM items", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

// Raw row before the tags JSON is parsed; keeps serde_json errors out of
// the rusqlite row-mapping closures.
struct ItemRow {
    id: String,
    kind: u16,
    created_at: i64,
    content: String,
    tags: String,
}

impl ItemRow {
    fn into_item(self) -> Result<Item> {
        Ok(Item {
            id: self.id,
            kind: ItemKind::from(self.kind),
            created_at: self.created_at.max(0) as u64,
            content: self.content,
            tags: serde_json::from_str(&self.tags)?,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        created_at: row.get(2)?,
        content: row.get(3)?,
        tags: row.get(4)?,
    })
}
