// Database migrations for the meeting store
// Creates and updates the database schema; every step can be reverted.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

use super::models::{ChatType, MeetingStatus, QuestionKind, Role};
use super::schema::NOW_SQL;

/// A versioned schema change
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub up: fn(&Connection) -> Result<()>,
    pub down: fn(&Connection) -> Result<()>,
}

/// All migrations, in version order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users, roles, meetings and participants",
        up: up_v1,
        down: down_v1,
    },
    Migration {
        version: 2,
        name: "chats",
        up: up_v2,
        down: down_v2,
    },
    Migration {
        version: 3,
        name: "questions and attempts",
        up: up_v3,
        down: down_v3,
    },
    Migration {
        version: 4,
        name: "chat type",
        up: up_v4,
        down: down_v4,
    },
];

/// Latest schema version
pub fn latest_version() -> i32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    migrate_to(conn, latest_version())
}

/// Apply pending migrations up to and including `target`
pub fn migrate_to(conn: &Connection, target: i32) -> Result<()> {
    if target > latest_version() {
        bail!("Unknown schema version {} (latest is {})", target, latest_version());
    }
    ensure_version_table(conn)?;
    let current = get_schema_version(conn)?;
    if target < current {
        bail!(
            "Schema is at version {}, newer than {}; use rollback to go back",
            current,
            target
        );
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current && m.version <= target) {
        log::info!("Running database migration v{} - {}", migration.version, migration.name);

        let tx = conn
            .unchecked_transaction()
            .context("Failed to start migration transaction")?;
        (migration.up)(&tx).with_context(|| format!("Failed to run migration v{}", migration.version))?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            [migration.version],
        )
        .context("Failed to record migration")?;
        tx.commit()
            .with_context(|| format!("Failed to commit migration v{}", migration.version))?;

        log::info!("Migration v{} completed successfully", migration.version);
    }

    Ok(())
}

/// Revert applied migrations newer than `target`, newest first
pub fn rollback_to(conn: &Connection, target: i32) -> Result<()> {
    if target < 0 {
        bail!("Cannot roll back to negative version {}", target);
    }
    ensure_version_table(conn)?;
    let current = get_schema_version(conn)?;

    for migration in MIGRATIONS
        .iter()
        .rev()
        .filter(|m| m.version > target && m.version <= current)
    {
        log::info!("Reverting database migration v{} - {}", migration.version, migration.name);

        let tx = conn
            .unchecked_transaction()
            .context("Failed to start rollback transaction")?;
        (migration.down)(&tx).with_context(|| format!("Failed to revert migration v{}", migration.version))?;
        tx.execute(
            "DELETE FROM schema_version WHERE version = ?",
            [migration.version],
        )
        .context("Failed to unrecord migration")?;
        tx.commit()
            .with_context(|| format!("Failed to commit rollback of v{}", migration.version))?;

        log::info!("Migration v{} reverted", migration.version);
    }

    Ok(())
}

/// Migrations not yet applied
pub fn pending_migrations(conn: &Connection) -> Result<Vec<&'static Migration>> {
    let current = get_schema_version(conn)?;
    Ok(MIGRATIONS.iter().filter(|m| m.version > current).collect())
}

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
    .context("Failed to create schema_version table")
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to inspect sqlite_master")?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .context("Failed to read schema version")?;

    Ok(version.unwrap_or(0))
}

/// `'a', 'b', ...` for a CHECK constraint
fn sql_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core schema (version 1)
fn up_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        -- Accounts
        CREATE TABLE users (
            "userId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "email" TEXT NOT NULL UNIQUE,
            "password" TEXT NOT NULL
        );

        -- Meeting permissions
        CREATE TABLE roles (
            "roleId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "canPresent" INTEGER NOT NULL DEFAULT 0,
            "canModerate" INTEGER NOT NULL DEFAULT 0
        );

        -- Meetings: integer key for joins, UUID handed out to clients
        CREATE TABLE meetings (
            "_meetingId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "meetingId" TEXT NOT NULL UNIQUE,
            "hostId" INTEGER NOT NULL REFERENCES users("userId") ON DELETE CASCADE,
            "title" TEXT NOT NULL,
            "status" TEXT NOT NULL DEFAULT 'scheduled' CHECK ("status" IN ({statuses})),
            "scheduledAt" TEXT,
            "startedAt" TEXT,
            "endedAt" TEXT,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now})
        );

        CREATE INDEX idx_meetings_host ON meetings("hostId");

        -- Participants: users or guests seated in a meeting
        CREATE TABLE participants (
            "_participantId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "participantId" TEXT NOT NULL UNIQUE,
            "_meetingId" INTEGER NOT NULL REFERENCES meetings("_meetingId") ON DELETE CASCADE,
            "userId" INTEGER REFERENCES users("userId") ON DELETE SET NULL,
            "roleId" INTEGER NOT NULL REFERENCES roles("roleId"),
            "displayName" TEXT NOT NULL,
            "joinedAt" TEXT,
            "leftAt" TEXT,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now})
        );

        CREATE INDEX idx_participants_meeting ON participants("_meetingId");

        -- Seed predefined roles
        INSERT INTO roles ("name", "canPresent", "canModerate") VALUES
            ('{host}', 1, 1),
            ('{moderator}', 1, 1),
            ('{attendee}', 0, 0);
        "#,
        statuses = sql_list(MeetingStatus::ALL),
        host = Role::HOST,
        moderator = Role::MODERATOR,
        attendee = Role::ATTENDEE,
        now = NOW_SQL,
    ))
    .context("Failed to create core tables")
}

fn down_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE participants;
        DROP TABLE meetings;
        DROP TABLE roles;
        DROP TABLE users;
        "#,
    )
    .context("Failed to drop core tables")
}

/// Meeting chat (version 2)
fn up_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE chats (
            "_chatId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "chatId" TEXT NOT NULL UNIQUE,
            "_meetingId" INTEGER NOT NULL REFERENCES meetings("_meetingId") ON DELETE CASCADE,
            "_participantId" INTEGER REFERENCES participants("_participantId") ON DELETE SET NULL,
            "message" TEXT NOT NULL,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now})
        );

        -- Index for fast chat history lookups by meeting
        CREATE INDEX idx_chats_meeting ON chats("_meetingId", "createdAt");
        "#,
        now = NOW_SQL,
    ))
    .context("Failed to create chats table")
}

fn down_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch("DROP TABLE chats;")
        .context("Failed to drop chats table")
}

/// Quizzes (version 3)
fn up_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE questions (
            "_questionId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "questionId" TEXT NOT NULL UNIQUE,
            "_meetingId" INTEGER NOT NULL REFERENCES meetings("_meetingId") ON DELETE CASCADE,
            "kind" TEXT NOT NULL DEFAULT 'objective' CHECK ("kind" IN ({kinds})),
            "prompt" TEXT NOT NULL,
            "options" TEXT,
            "answer" TEXT,
            "marks" INTEGER NOT NULL DEFAULT 1,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now})
        );

        CREATE INDEX idx_questions_meeting ON questions("_meetingId");

        CREATE TABLE attempts (
            "_attemptId" INTEGER PRIMARY KEY AUTOINCREMENT,
            "attemptId" TEXT NOT NULL UNIQUE,
            "_meetingId" INTEGER NOT NULL REFERENCES meetings("_meetingId") ON DELETE CASCADE,
            "_participantId" INTEGER NOT NULL REFERENCES participants("_participantId") ON DELETE CASCADE,
            "score" REAL,
            "submittedAt" TEXT,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now})
        );

        CREATE INDEX idx_attempts_participant ON attempts("_participantId");

        -- Free-text answers, one per (attempt, question)
        CREATE TABLE subjective_attempts (
            "_attemptId" INTEGER NOT NULL REFERENCES attempts("_attemptId") ON DELETE CASCADE,
            "_questionId" INTEGER NOT NULL REFERENCES questions("_questionId") ON DELETE CASCADE,
            "response" TEXT NOT NULL,
            "marksAwarded" REAL,
            "createdAt" TEXT NOT NULL DEFAULT ({now}),
            "updatedAt" TEXT NOT NULL DEFAULT ({now}),
            PRIMARY KEY ("_attemptId", "_questionId")
        );
        "#,
        kinds = sql_list(QuestionKind::ALL),
        now = NOW_SQL,
    ))
    .context("Failed to create quiz tables")
}

fn down_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE subjective_attempts;
        DROP TABLE attempts;
        DROP TABLE questions;
        "#,
    )
    .context("Failed to drop quiz tables")
}

/// Chat type enum column (version 4)
fn up_v4(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        ALTER TABLE chats ADD COLUMN "type" TEXT NOT NULL DEFAULT '{default}'
            CHECK ("type" IN ({types}));
        "#,
        default = ChatType::DEFAULT,
        types = sql_list(ChatType::ALL),
    ))
    .context("Failed to add chats.type")
}

fn down_v4(conn: &Connection) -> Result<()> {
    conn.execute_batch(r#"ALTER TABLE chats DROP COLUMN "type";"#)
        .context("Failed to drop chats.type")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        (dir, conn)
    }

    type ColumnInfo = (String, String, bool, Option<String>, i32);

    fn table_info(conn: &Connection, table: &str) -> Vec<ColumnInfo> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))
            .unwrap();
        stmt.query_map([], |row| {
            Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap()
    }

    #[test]
    fn test_migrations() {
        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());
        assert!(pending_migrations(&conn).unwrap().is_empty());

        // Roles were seeded
        let role_count: i32 = conn
            .query_row("SELECT COUNT(*) FROM roles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(role_count, 3);

        // Running again is a no-op
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_chat_type_round_trip() {
        let (_dir, conn) = open();
        migrate_to(&conn, 3).unwrap();
        let before = table_info(&conn, "chats");
        assert!(!before.iter().any(|c| c.0 == "type"));

        migrate_to(&conn, 4).unwrap();
        let during = table_info(&conn, "chats");
        let column = during.iter().find(|c| c.0 == "type").unwrap();
        assert_eq!(column.1, "TEXT");
        assert!(column.2);
        assert_eq!(column.3.as_deref(), Some("'public'"));

        rollback_to(&conn, 3).unwrap();
        assert_eq!(table_info(&conn, "chats"), before);
        assert_eq!(get_schema_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_chat_type_default_and_check() {
        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO users ("email", "password") VALUES ('host@example.com', 'x');
            INSERT INTO meetings ("meetingId", "hostId", "title") VALUES ('m-1', 1, 'Standup');
            INSERT INTO chats ("chatId", "_meetingId", "message") VALUES ('c-1', 1, 'hello');
            "#,
        )
        .unwrap();

        let chat_type: String = conn
            .query_row(r#"SELECT "type" FROM chats"#, [], |row| row.get(0))
            .unwrap();
        assert_eq!(chat_type, "public");

        let err = conn
            .execute(
                r#"INSERT INTO chats ("chatId", "_meetingId", "message", "type") VALUES ('c-2', 1, 'hi', 'shout')"#,
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CHECK constraint failed"));
    }

    #[test]
    fn test_full_rollback() {
        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();
        rollback_to(&conn, 0).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('users', 'meetings', 'chats')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);

        // And forward again
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());
    }

    /// DDL default text with the outer parentheses of `DEFAULT (expr)` removed
    fn default_text(raw: &str) -> String {
        match raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            Some(inner) => inner.to_string(),
            None => raw.to_string(),
        }
    }

    #[test]
    fn test_descriptors_match_database() {
        use crate::database::models::all_schemas;
        use std::collections::BTreeSet;

        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();

        for schema in all_schemas() {
            let table = schema.table;

            // name, type, not null, default, primary key
            type Shape = (String, String, bool, Option<String>, bool);
            let actual: BTreeSet<Shape> = table_info(&conn, table)
                .into_iter()
                .map(|(name, sql_type, notnull, default, pk)| {
                    (name, sql_type, notnull, default.as_deref().map(default_text), pk > 0)
                })
                .collect();
            let expected: BTreeSet<Shape> = schema
                .columns
                .iter()
                .map(|c| {
                    (
                        c.name.to_string(),
                        c.column_type.sql_type().to_string(),
                        // INTEGER PRIMARY KEY columns are rowid aliases, never declared NOT NULL
                        !c.nullable && !c.auto_increment,
                        c.default.as_ref().and_then(|d| d.sql_default()),
                        c.is_primary_key(),
                    )
                })
                .collect();
            assert_eq!(actual, expected, "columns of {}", table);

            let mut stmt = conn
                .prepare(&format!("PRAGMA foreign_key_list(\"{}\")", table))
                .unwrap();
            let actual: BTreeSet<(String, String, String)> = stmt
                .query_map([], |row| Ok((row.get(3)?, row.get(2)?, row.get(4)?)))
                .unwrap()
                .collect::<std::result::Result<_, _>>()
                .unwrap();
            let expected: BTreeSet<(String, String, String)> = schema
                .columns
                .iter()
                .filter_map(|c| {
                    c.foreign_key()
                        .map(|fk| (c.name.to_string(), fk.table.to_string(), fk.column.to_string()))
                })
                .collect();
            assert_eq!(actual, expected, "foreign keys of {}", table);

            // Leading column of each UNIQUE constraint ("u") and CREATE INDEX ("c")
            let mut stmt = conn
                .prepare(&format!("PRAGMA index_list(\"{}\")", table))
                .unwrap();
            let indexes: Vec<(String, String)> = stmt
                .query_map([], |row| Ok((row.get(1)?, row.get(3)?)))
                .unwrap()
                .collect::<std::result::Result<_, _>>()
                .unwrap();
            let mut unique = BTreeSet::new();
            let mut indexed = BTreeSet::new();
            for (index, origin) in indexes {
                let leading: String = conn
                    .query_row(
                        &format!("SELECT name FROM pragma_index_info('{}') WHERE seqno = 0", index),
                        [],
                        |row| row.get(0),
                    )
                    .unwrap();
                match origin.as_str() {
                    "u" => unique.insert(leading),
                    "c" => indexed.insert(leading),
                    _ => false,
                };
            }
            let expected_unique: BTreeSet<String> =
                schema.columns.iter().filter(|c| c.unique).map(|c| c.name.to_string()).collect();
            let expected_indexed: BTreeSet<String> =
                schema.columns.iter().filter(|c| c.indexed).map(|c| c.name.to_string()).collect();
            assert_eq!(unique, expected_unique, "unique columns of {}", table);
            assert_eq!(indexed, expected_indexed, "indexed columns of {}", table);

            let sql: String = conn
                .query_row("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?", [table], |row| {
                    row.get(0)
                })
                .unwrap();
            for column in &schema.columns {
                let autoincrement = format!("\"{}\" INTEGER PRIMARY KEY AUTOINCREMENT", column.name);
                assert_eq!(sql.contains(&autoincrement), column.auto_increment, "{}.{}", table, column.name);

                if let Some(values) = column.column_type.enum_values() {
                    let check = format!("CHECK (\"{}\" IN ({}))", column.name, sql_list(values));
                    assert!(sql.contains(&check), "{}.{} lacks {}", table, column.name, check);
                }
            }
        }
    }

    #[test]
    fn test_migrate_to_older_version_is_an_error() {
        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();

        let err = migrate_to(&conn, 2).unwrap_err();
        assert!(err.to_string().contains("rollback"));
        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());

        // Re-applying the current version is still a no-op
        migrate_to(&conn, latest_version()).unwrap();
    }

    #[test]
    fn test_sql_defaults_use_store_timestamp_format() {
        let (_dir, conn) = open();
        run_migrations(&conn).unwrap();
        conn.execute(r#"INSERT INTO users ("email", "password") VALUES ('a@b.com', 'x')"#, [])
            .unwrap();
        conn.execute(r#"INSERT INTO meetings ("meetingId", "hostId", "title") VALUES ('m-1', 1, 'Standup')"#, [])
            .unwrap();

        let created: String = conn
            .query_row(r#"SELECT "createdAt" FROM meetings"#, [], |row| row.get(0))
            .unwrap();
        let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").unwrap();
        assert!(re.is_match(&created), "{}", created);
        assert_eq!(created.len(), crate::database::schema::now_timestamp().len());
    }

    #[test]
    fn test_unknown_target() {
        let (_dir, conn) = open();
        assert!(migrate_to(&conn, latest_version() + 1).is_err());
        assert!(rollback_to(&conn, -1).is_err());
    }
}
