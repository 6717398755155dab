use std::collections::HashMap;

use crate::Database;
use crate::models::{
    BoxRow, MessageFilter, MessageRow, MessageUpdate, NewBox, NewMessage, NewUser, UserFilter,
    UserRow, UserUpdate,
};
use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

impl Database {
    // -- Users --

    pub fn insert_user(&self, user: &NewUser<'_>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, avatar) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), user.email, user.password_hash, user.avatar],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn find_user(&self, filter: UserFilter<'_>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, filter))
    }

    /// Returns false when no user matched.
    pub fn update_user(&self, id: &str, update: UserUpdate<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = match update {
                UserUpdate::SetAvatar(avatar) => conn.execute(
                    "UPDATE users
                     SET avatar = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![avatar, id],
                )?,
            };
            Ok(changed > 0)
        })
    }

    // -- Boxes --

    pub fn insert_box(&self, new_box: &NewBox<'_>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO boxes (id, name, description, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), new_box.name, new_box.description, new_box.owner_id],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn find_box(&self, id: &str) -> Result<Option<BoxRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description, owner_id, created_at, updated_at
                     FROM boxes WHERE id = ?1",
                    [id],
                    box_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// All boxes, newest first.
    pub fn find_boxes(&self) -> Result<Vec<BoxRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, owner_id, created_at, updated_at
                 FROM boxes
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], box_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &NewMessage<'_>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, box_id, sender_id, content, is_anonymous)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    message.box_id,
                    message.sender_id,
                    message.content,
                    message.is_anonymous
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn find_message(&self, filter: MessageFilter<'_>) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| Ok(query_messages(conn, filter)?.into_iter().next()))
    }

    /// Matching messages, newest first, with liker sets attached.
    pub fn find_messages(&self, filter: MessageFilter<'_>) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, filter))
    }

    /// Apply a combined liker-set/counter update in one transaction.
    ///
    /// The counter moves by exactly the number of liker rows inserted or
    /// deleted, so it always equals the set's cardinality. Returns the message
    /// as it stands after the update, or `None` if no message matched.
    pub fn update_message(&self, id: &str, update: MessageUpdate<'_>) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists = tx
                .query_row("SELECT 1 FROM messages WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            let delta = match update {
                MessageUpdate::AddLiker(user_id) => tx.execute(
                    "INSERT OR IGNORE INTO message_likes (message_id, user_id) VALUES (?1, ?2)",
                    [id, user_id],
                )? as i64,
                MessageUpdate::RemoveLiker(user_id) => -(tx.execute(
                    "DELETE FROM message_likes WHERE message_id = ?1 AND user_id = ?2",
                    [id, user_id],
                )? as i64),
            };

            if delta != 0 {
                tx.execute(
                    "UPDATE messages SET like_count = like_count + ?1 WHERE id = ?2",
                    params![delta, id],
                )?;
            }

            let updated = query_messages(&tx, MessageFilter::ById(id))?
                .into_iter()
                .next();
            tx.commit()?;
            Ok(updated)
        })
    }
}

fn query_user(conn: &Connection, filter: UserFilter<'_>) -> Result<Option<UserRow>> {
    let (column, key) = match filter {
        UserFilter::ById(id) => ("id", id),
        UserFilter::ByEmail(email) => ("email", email),
    };

    let sql = format!(
        "SELECT id, email, password, avatar, created_at, updated_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                avatar: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn box_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BoxRow> {
    Ok(BoxRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn query_messages(conn: &Connection, filter: MessageFilter<'_>) -> Result<Vec<MessageRow>> {
    let (clause, key) = match filter {
        MessageFilter::ById(id) => ("m.id = ?1", id),
        MessageFilter::ByBox(box_id) => ("m.box_id = ?1", box_id),
    };

    // JOIN users to resolve the sender email in the same query
    let sql = format!(
        "SELECT m.id, m.box_id, m.sender_id, u.email, m.content, m.is_anonymous, m.like_count, m.created_at
         FROM messages m
         LEFT JOIN users u ON m.sender_id = u.id
         WHERE {clause}
         ORDER BY m.created_at DESC, m.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let mut rows = stmt
        .query_map([key], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                box_id: row.get(1)?,
                sender_id: row.get(2)?,
                sender_email: row.get(3)?,
                content: row.get(4)?,
                is_anonymous: row.get(5)?,
                like_count: row.get(6)?,
                liked_by: Vec::new(),
                created_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    attach_likers(conn, clause, key, &mut rows)?;
    Ok(rows)
}

/// Batch-fetch liker sets for the messages selected by `clause`.
///
/// Keyed on the same filter as the message query rather than an `IN` list of
/// ids, so the bound-variable count stays at one however large the box grows.
fn attach_likers(conn: &Connection, clause: &str, key: &str, rows: &mut [MessageRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut likers: HashMap<String, Vec<String>> = HashMap::new();
    {
        let sql = format!(
            "SELECT l.message_id, l.user_id
             FROM message_likes l
             JOIN messages m ON m.id = l.message_id
             WHERE {clause}"
        );
        let mut stmt = conn.prepare(&sql)?;

        let pairs = stmt.query_map([key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for pair in pairs {
            let (message_id, user_id) = pair?;
            likers.entry(message_id).or_default().push(user_id);
        }
    }

    for row in rows.iter_mut() {
        if let Some(user_ids) = likers.remove(&row.id) {
            row.liked_by = user_ids;
        }
    }
    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
