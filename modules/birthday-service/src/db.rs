//! SQLite database operations for per-chat birthday records.

use crate::error::BirthdayError;
use crate::recurrence::parse_date;
use birthday_types::*;
use chrono::NaiveDate;
use rusqlite::Result as SqliteResult;
use std::sync::{Mutex, MutexGuard};

pub struct Db {
    conn: Mutex<rusqlite::Connection>,
}

/// Fields supplied when adding a birthday.
#[derive(Debug, Clone, Default)]
pub struct NewBirthday {
    pub name: String,
    pub date: String,
    pub external_id: Option<String>,
    pub pronoun: Option<String>,
}

impl From<AddBirthdayRequest> for NewBirthday {
    fn from(req: AddBirthdayRequest) -> Self {
        Self {
            name: req.name,
            date: req.date,
            external_id: req.external_id,
            pronoun: req.pronoun,
        }
    }
}

impl Db {
    pub fn open(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn create_tables(&self) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS birthdays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                date TEXT NOT NULL,
                external_id TEXT,
                pronoun TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_birthdays_chat
             ON birthdays(chat_id)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                birthday_id INTEGER NOT NULL REFERENCES birthdays(id) ON DELETE CASCADE,
                notified_on TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(birthday_id, notified_on)
            )",
            [],
        )?;
        Ok(())
    }

    /// Validate and store a birthday. Name and date are trimmed first.
    pub fn add_birthday(
        &self,
        chat_id: i64,
        new: NewBirthday,
    ) -> Result<BirthdayRecord, BirthdayError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(BirthdayError::EmptyName);
        }
        let date = parse_date(&new.date)?;
        let external_id = non_empty(new.external_id);
        let pronoun = non_empty(new.pronoun);

        let conn = self.conn();
        conn.execute(
            "INSERT INTO birthdays (chat_id, name, date, external_id, pronoun)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                chat_id,
                name,
                date.format("%Y-%m-%d").to_string(),
                external_id,
                pronoun
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(get_birthday_impl(&conn, id)?)
    }

    /// All birthdays of a chat in insertion order.
    pub fn list_birthdays(&self, chat_id: i64) -> Result<Vec<BirthdayRecord>, BirthdayError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, name, date, external_id, pronoun, created_at
             FROM birthdays
             WHERE chat_id = ?1
             ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map(rusqlite::params![chat_id], |row| row_to_record(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    /// Chats that have at least one birthday.
    pub fn list_chats(&self) -> Result<Vec<i64>, BirthdayError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT chat_id FROM birthdays ORDER BY chat_id")?;
        let chats = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqliteResult<Vec<i64>>>()?;
        Ok(chats)
    }

    /// Remove the single birthday called `name`, optionally narrowed by date.
    /// Zero or several matches delete nothing and report the match count.
    pub fn remove_birthday(
        &self,
        chat_id: i64,
        name: &str,
        date: Option<&str>,
    ) -> Result<BirthdayRecord, BirthdayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BirthdayError::EmptyName);
        }
        let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date(d)?.format("%Y-%m-%d").to_string()),
            None => None,
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let matches: Vec<BirthdayRecord> = {
            let mut stmt = tx.prepare(
                "SELECT id, chat_id, name, date, external_id, pronoun, created_at
                 FROM birthdays
                 WHERE chat_id = ?1 AND name = ?2 AND (?3 IS NULL OR date = ?3)",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![chat_id, name, date], |row| {
                    row_to_record(row)
                })?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows
        };

        match matches.as_slice() {
            [only] => {
                tx.execute(
                    "DELETE FROM birthdays WHERE id = ?1",
                    rusqlite::params![only.id],
                )?;
                tx.commit()?;
                Ok(only.clone())
            }
            _ => Err(BirthdayError::AmbiguousDelete {
                name: name.to_string(),
                matches: matches.len(),
            }),
        }
    }

    pub fn clear_chat(&self, chat_id: i64) -> Result<usize, BirthdayError> {
        let conn = self.conn();
        let removed = conn.execute(
            "DELETE FROM birthdays WHERE chat_id = ?1",
            rusqlite::params![chat_id],
        )?;
        Ok(removed)
    }

    /// Record that `birthday_id` was celebrated on `day`. Returns false when it
    /// already was.
    pub fn mark_notified(
        &self,
        chat_id: i64,
        birthday_id: i64,
        day: NaiveDate,
    ) -> Result<bool, BirthdayError> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO notifications (chat_id, birthday_id, notified_on)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![chat_id, birthday_id, day.format("%Y-%m-%d").to_string()],
        )?;
        Ok(inserted > 0)
    }

    pub fn was_notified(&self, birthday_id: i64, day: NaiveDate) -> Result<bool, BirthdayError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE birthday_id = ?1 AND notified_on = ?2",
            rusqlite::params![birthday_id, day.format("%Y-%m-%d").to_string()],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_stats(&self) -> Result<BirthdayStats, BirthdayError> {
        let conn = self.conn();
        let total_birthdays: i64 =
            conn.query_row("SELECT COUNT(*) FROM birthdays", [], |r| r.get(0))?;
        let chat_count: i64 =
            conn.query_row("SELECT COUNT(DISTINCT chat_id) FROM birthdays", [], |r| r.get(0))?;
        let notifications_sent: i64 =
            conn.query_row("SELECT COUNT(*) FROM notifications", [], |r| r.get(0))?;
        Ok(BirthdayStats {
            total_birthdays,
            chat_count,
            notifications_sent,
        })
    }

    /// Every record of every chat, for the dashboard and backups.
    pub fn list_all(&self) -> Result<Vec<BirthdayRecord>, BirthdayError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, name, date, external_id, pronoun, created_at
             FROM birthdays
             ORDER BY chat_id, id",
        )?;
        let records = stmt
            .query_map([], |row| row_to_record(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    /// Replace every record with `entries`. Entries are validated up front so a
    /// bad backup leaves the current data untouched.
    pub fn clear_and_restore(&self, entries: &[BackupEntry]) -> Result<usize, BirthdayError> {
        let mut validated = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(BirthdayError::EmptyName);
            }
            let date = parse_date(&entry.date)?;
            validated.push((entry, name, date.format("%Y-%m-%d").to_string()));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM notifications", [])?;
        tx.execute("DELETE FROM birthdays", [])?;

        let mut count = 0;
        for (entry, name, date) in validated {
            tx.execute(
                "INSERT INTO birthdays (chat_id, name, date, external_id, pronoun)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    entry.chat_id,
                    name,
                    date,
                    non_empty(entry.external_id.clone()),
                    non_empty(entry.pronoun.clone())
                ],
            )?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_birthday_impl(conn: &rusqlite::Connection, id: i64) -> SqliteResult<BirthdayRecord> {
    conn.query_row(
        "SELECT id, chat_id, name, date, external_id, pronoun, created_at
         FROM birthdays
         WHERE id = ?1",
        rusqlite::params![id],
        |row| row_to_record(row),
    )
}

fn row_to_record(row: &rusqlite::Row) -> SqliteResult<BirthdayRecord> {
    Ok(BirthdayRecord {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        name: row.get(2)?,
        date: row.get(3)?,
        external_id: row.get(4)?,
        pronoun: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: i64 = -1001;

    fn new(name: &str, date: &str) -> NewBirthday {
        NewBirthday {
            name: name.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_trims_and_lists_per_chat() {
        let db = Db::open(":memory:").unwrap();
        let added = db.add_birthday(CHAT, new("  Ricardo ", " 1980-07-01 ")).unwrap();
        assert_eq!(added.name, "Ricardo");
        assert_eq!(added.date, "1980-07-01");
        db.add_birthday(CHAT, new("Julia", "1986-03-06")).unwrap();
        db.add_birthday(42, new("Miguel", "1977-07-17")).unwrap();

        let names: Vec<String> = db
            .list_birthdays(CHAT)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Ricardo", "Julia"]);
        assert_eq!(db.list_chats().unwrap(), vec![CHAT, 42]);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let db = Db::open(":memory:").unwrap();
        assert_eq!(
            db.add_birthday(CHAT, new("   ", "1980-07-01")).unwrap_err(),
            BirthdayError::EmptyName
        );
        assert!(matches!(
            db.add_birthday(CHAT, new("Ricardo", "1980-13-01")),
            Err(BirthdayError::InvalidDate { .. })
        ));
        assert!(db.list_birthdays(CHAT).unwrap().is_empty());
    }

    #[test]
    fn test_remove_ambiguous_deletes_nothing() {
        let db = Db::open(":memory:").unwrap();
        db.add_birthday(CHAT, new("Ricardo", "1980-07-01")).unwrap();
        db.add_birthday(CHAT, new("Ricardo", "2010-02-14")).unwrap();

        let err = db.remove_birthday(CHAT, "Ricardo", None).unwrap_err();
        assert_eq!(
            err,
            BirthdayError::AmbiguousDelete {
                name: "Ricardo".to_string(),
                matches: 2
            }
        );
        assert_eq!(db.list_birthdays(CHAT).unwrap().len(), 2);

        let removed = db
            .remove_birthday(CHAT, "Ricardo", Some("2010-02-14"))
            .unwrap();
        assert_eq!(removed.date, "2010-02-14");
        assert_eq!(db.list_birthdays(CHAT).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_missing_reports_zero() {
        let db = Db::open(":memory:").unwrap();
        db.add_birthday(42, new("Ricardo", "1980-07-01")).unwrap();
        let err = db.remove_birthday(CHAT, "Ricardo", None).unwrap_err();
        assert!(matches!(err, BirthdayError::AmbiguousDelete { matches: 0, .. }));
    }

    #[test]
    fn test_mark_notified_once_per_day() {
        let db = Db::open(":memory:").unwrap();
        let r = db.add_birthday(CHAT, new("Julia", "1986-03-06")).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert!(!db.was_notified(r.id, day).unwrap());
        assert!(db.mark_notified(CHAT, r.id, day).unwrap());
        assert!(db.was_notified(r.id, day).unwrap());
        assert!(!db.mark_notified(CHAT, r.id, day).unwrap());
        assert!(db.mark_notified(CHAT, r.id, day.succ_opt().unwrap()).unwrap());
        assert_eq!(db.get_stats().unwrap().notifications_sent, 2);
    }

    #[test]
    fn test_clear_chat_only_touches_that_chat() {
        let db = Db::open(":memory:").unwrap();
        db.add_birthday(CHAT, new("Ricardo", "1980-07-01")).unwrap();
        db.add_birthday(CHAT, new("Julia", "1986-03-06")).unwrap();
        db.add_birthday(42, new("Miguel", "1977-07-17")).unwrap();
        assert_eq!(db.clear_chat(CHAT).unwrap(), 2);
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_birthdays, 1);
        assert_eq!(stats.chat_count, 1);
    }

    #[test]
    fn test_restore_validates_before_clearing() {
        let db = Db::open(":memory:").unwrap();
        db.add_birthday(CHAT, new("Ricardo", "1980-07-01")).unwrap();

        let bad = vec![BackupEntry {
            chat_id: CHAT,
            name: "Broken".to_string(),
            date: "someday".to_string(),
            external_id: None,
            pronoun: None,
        }];
        assert!(db.clear_and_restore(&bad).is_err());
        assert_eq!(db.list_birthdays(CHAT).unwrap().len(), 1);

        let good = vec![
            BackupEntry {
                chat_id: 7,
                name: "Madalena".to_string(),
                date: "1995-09-23".to_string(),
                external_id: Some("99".to_string()),
                pronoun: Some("f".to_string()),
            },
            BackupEntry {
                chat_id: 7,
                name: "Miguel".to_string(),
                date: "1977-07-17".to_string(),
                external_id: None,
                pronoun: None,
            },
        ];
        assert_eq!(db.clear_and_restore(&good).unwrap(), 2);
        assert!(db.list_birthdays(CHAT).unwrap().is_empty());
        let restored = db.list_birthdays(7).unwrap();
        assert_eq!(restored[0].external_id.as_deref(), Some("99"));
    }

    #[test]
    fn test_records_persist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("birthdays.db");
        let path = path.to_str().unwrap();
        {
            let db = Db::open(path).unwrap();
            db.add_birthday(CHAT, new("Avó Madá", "1951-08-21")).unwrap();
        }
        let reopened = Db::open(path).unwrap();
        let records = reopened.list_birthdays(CHAT).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Avó Madá");
    }
}
