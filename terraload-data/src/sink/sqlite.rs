//! SQLite document store used as the default batch sink.
//!
//! Documents are stored as JSON text keyed by `(id, kind)`. Each batch runs in
//! a single transaction; a row that violates a constraint (for example a
//! duplicate key under insert semantics) is counted and skipped while its
//! siblings still commit. Any other database error rolls the batch back.
//!
//! [`SqliteDocumentSink::provision_indexes`] adds secondary indexes plus two
//! lookup tables, `entity_tags` and `entity_members`, which triggers keep in
//! step with later writes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::{debug, warn};
use rusqlite::{
    CachedStatement, Connection, Error as SqliteError, ErrorCode, OptionalExtension,
};
use terraload_core::{Document, ElementKind, IdentityKey, ParseOptionError};
use thiserror::Error;

use super::{BatchOutcome, BatchSink, SinkError, WriteOp};

const CREATE_SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS entities (
    id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    version INTEGER NOT NULL,
    timestamp TEXT,
    document TEXT NOT NULL,
    PRIMARY KEY (id, kind)
)";

const CREATE_INDEXES_SQL: &str = "
CREATE INDEX IF NOT EXISTS entities_id_version ON entities (id, version);
CREATE INDEX IF NOT EXISTS entities_kind ON entities (kind);
CREATE INDEX IF NOT EXISTS entities_timestamp ON entities (timestamp);

CREATE TABLE IF NOT EXISTS entity_tags (
    id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    position INTEGER NOT NULL,
    tag_key TEXT NOT NULL,
    tag_value TEXT NOT NULL,
    PRIMARY KEY (id, kind, position)
);
CREATE INDEX IF NOT EXISTS entity_tags_key_value ON entity_tags (tag_key, tag_value);

CREATE TABLE IF NOT EXISTS entity_members (
    relation_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    member_kind TEXT NOT NULL,
    member_ref INTEGER NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (relation_id, position)
);
CREATE INDEX IF NOT EXISTS entity_members_ref ON entity_members (member_ref, member_kind);

CREATE TRIGGER IF NOT EXISTS entities_lookup_insert AFTER INSERT ON entities
BEGIN
    INSERT INTO entity_tags (id, kind, position, tag_key, tag_value)
        SELECT NEW.id, NEW.kind, tag.key,
               json_extract(tag.value, '$.key'), json_extract(tag.value, '$.value')
        FROM json_each(NEW.document, '$.tags') AS tag;
    INSERT INTO entity_members (relation_id, position, member_kind, member_ref, role)
        SELECT NEW.id, member.key, json_extract(member.value, '$.kind'),
               json_extract(member.value, '$.ref'), json_extract(member.value, '$.role')
        FROM json_each(NEW.document, '$.members') AS member
        WHERE NEW.kind = 'relation';
END;

CREATE TRIGGER IF NOT EXISTS entities_lookup_update AFTER UPDATE OF document ON entities
BEGIN
    DELETE FROM entity_tags WHERE id = OLD.id AND kind = OLD.kind;
    DELETE FROM entity_members WHERE relation_id = OLD.id AND OLD.kind = 'relation';
    INSERT INTO entity_tags (id, kind, position, tag_key, tag_value)
        SELECT NEW.id, NEW.kind, tag.key,
               json_extract(tag.value, '$.key'), json_extract(tag.value, '$.value')
        FROM json_each(NEW.document, '$.tags') AS tag;
    INSERT INTO entity_members (relation_id, position, member_kind, member_ref, role)
        SELECT NEW.id, member.key, json_extract(member.value, '$.kind'),
               json_extract(member.value, '$.ref'), json_extract(member.value, '$.role')
        FROM json_each(NEW.document, '$.members') AS member
        WHERE NEW.kind = 'relation';
END;
";

// Rebuilds the lookup tables from rows written before the triggers existed.
const BACKFILL_LOOKUPS_SQL: &str = "
DELETE FROM entity_tags;
DELETE FROM entity_members;
INSERT INTO entity_tags (id, kind, position, tag_key, tag_value)
    SELECT entity.id, entity.kind, tag.key,
           json_extract(tag.value, '$.key'), json_extract(tag.value, '$.value')
    FROM entities AS entity, json_each(entity.document, '$.tags') AS tag;
INSERT INTO entity_members (relation_id, position, member_kind, member_ref, role)
    SELECT entity.id, member.key, json_extract(member.value, '$.kind'),
           json_extract(member.value, '$.ref'), json_extract(member.value, '$.role')
    FROM entities AS entity, json_each(entity.document, '$.members') AS member
    WHERE entity.kind = 'relation';
";

const INSERT_SQL: &str = "INSERT INTO entities (id, kind, version, timestamp, document)
    VALUES (?1, ?2, ?3, ?4, ?5)";

const UPSERT_SQL: &str = "INSERT INTO entities (id, kind, version, timestamp, document)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (id, kind) DO UPDATE SET
        version = excluded.version,
        timestamp = excluded.timestamp,
        document = excluded.document";

/// Errors raised by [`SqliteDocumentSink`].
#[derive(Debug, Error)]
pub enum SqliteSinkError {
    /// Failed to create the parent directory for the database file.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `entities` table failed.
    #[error("failed to create entities table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating secondary indexes failed.
    #[error("failed to create entity indexes")]
    CreateIndexes {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the batch transaction failed.
    #[error("failed to begin batch transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A write failed for a reason other than a constraint violation; the
    /// batch was rolled back.
    #[error("failed to write {key}")]
    Execute {
        /// Key of the operation that hit the error.
        key: IdentityKey,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing a write statement failed.
    #[error("failed to prepare entity write statement")]
    PrepareStatement {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the batch transaction failed.
    #[error("failed to commit batch transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A read query failed.
    #[error("failed to query entities")]
    Query {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A stored document could not be parsed.
    #[error("stored document for {key} is not valid JSON")]
    DecodeDocument {
        /// Key of the unreadable row.
        key: IdentityKey,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A lookup row names a kind this build does not know.
    #[error("stored kind {stored:?} is not recognised")]
    DecodeKind {
        /// Text found in the `kind` column.
        stored: String,
        /// Parse failure.
        #[source]
        source: ParseOptionError,
    },
    /// A previous writer panicked while holding the connection.
    #[error("SQLite connection lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
enum OperationError {
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Execute(#[from] SqliteError),
}

/// Batch sink persisting entity documents into a SQLite database.
///
/// The connection is shared by all workers; batches are serialised on it and
/// executed on the blocking thread pool.
///
/// # Examples
/// ```
/// use terraload_core::{Document, ElementKind, Entity, IdentityKey, Path};
/// use terraload_data::{BatchSink, SqliteDocumentSink, WriteOp};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = SqliteDocumentSink::open_in_memory()?;
/// let document = Document::from(Entity::Path(Path {
///     id: 9,
///     version: 1,
///     timestamp: None,
///     tags: Vec::new(),
///     refs: vec![1, 2],
/// }));
/// let outcome = sink.bulk_write(vec![WriteOp::Insert(document)]).await?;
/// assert_eq!(outcome.written, 1);
/// assert!(sink.document(IdentityKey::new(9, ElementKind::Path))?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDocumentSink {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDocumentSink {
    /// Open (or create) a database file and initialise the schema.
    ///
    /// Parent directories are created when missing.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteSinkError> {
        ensure_parent_dir(path)?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteSinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_connection(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteSinkError> {
        let connection = Connection::open_in_memory().map_err(|source| SqliteSinkError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, SqliteSinkError> {
        connection
            .execute(CREATE_SCHEMA_SQL, [])
            .map_err(|source| SqliteSinkError::CreateSchema { source })?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Create the secondary indexes and tag/member lookup tables. Safe to
    /// call repeatedly.
    ///
    /// Intended to run after a bulk load, when building the indexes once is
    /// cheaper than maintaining them row by row. Lookup tables are rebuilt
    /// from the stored documents on every call and kept current by triggers
    /// afterwards.
    pub fn provision_indexes(&self) -> Result<(), SqliteSinkError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction()
            .map_err(|source| SqliteSinkError::BeginTransaction { source })?;
        transaction
            .execute_batch(CREATE_INDEXES_SQL)
            .and_then(|()| transaction.execute_batch(BACKFILL_LOOKUPS_SQL))
            .map_err(|source| SqliteSinkError::CreateIndexes { source })?;
        transaction
            .commit()
            .map_err(|source| SqliteSinkError::Commit { source })
    }

    /// Identifiers of the relations that list `member`, in ascending order.
    ///
    /// Reads the `entity_members` lookup table created by
    /// [`Self::provision_indexes`].
    pub fn relations_referencing(
        &self,
        member: IdentityKey,
    ) -> Result<Vec<i64>, SqliteSinkError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(
                "SELECT DISTINCT relation_id FROM entity_members
                 WHERE member_ref = ?1 AND member_kind = ?2 ORDER BY relation_id",
            )
            .map_err(|source| SqliteSinkError::Query { source })?;
        let relations: Vec<i64> = statement
            .query_map((member.id, member.kind.as_str()), |row| row.get(0))
            .and_then(Iterator::collect)
            .map_err(|source| SqliteSinkError::Query { source })?;
        Ok(relations)
    }

    /// Keys of the entities carrying the tag `key=value`.
    ///
    /// Reads the `entity_tags` lookup table created by
    /// [`Self::provision_indexes`].
    pub fn tagged(&self, key: &str, value: &str) -> Result<Vec<IdentityKey>, SqliteSinkError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(
                "SELECT DISTINCT id, kind FROM entity_tags
                 WHERE tag_key = ?1 AND tag_value = ?2 ORDER BY kind, id",
            )
            .map_err(|source| SqliteSinkError::Query { source })?;
        let rows: Vec<(i64, String)> = statement
            .query_map((key, value), |row| Ok((row.get(0)?, row.get(1)?)))
            .and_then(Iterator::collect)
            .map_err(|source| SqliteSinkError::Query { source })?;
        rows.into_iter()
            .map(|(id, stored)| match stored.parse::<ElementKind>() {
                Ok(kind) => Ok(IdentityKey::new(id, kind)),
                Err(source) => Err(SqliteSinkError::DecodeKind { stored, source }),
            })
            .collect()
    }

    /// Fetch the stored document for `key`.
    pub fn document(&self, key: IdentityKey) -> Result<Option<Document>, SqliteSinkError> {
        let connection = self.lock()?;
        let stored: Option<String> = connection
            .query_row(
                "SELECT document FROM entities WHERE id = ?1 AND kind = ?2",
                (key.id, key.kind.as_str()),
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| SqliteSinkError::Query { source })?;
        stored
            .map(|text| {
                Document::from_json(&text)
                    .map_err(|source| SqliteSinkError::DecodeDocument { key, source })
            })
            .transpose()
    }

    /// Number of stored documents.
    pub fn count(&self) -> Result<u64, SqliteSinkError> {
        let connection = self.lock()?;
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
            .map_err(|source| SqliteSinkError::Query { source })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteSinkError> {
        self.connection
            .lock()
            .map_err(|_| SqliteSinkError::Poisoned)
    }
}

#[async_trait]
impl BatchSink for SqliteDocumentSink {
    async fn bulk_write(&self, batch: Vec<WriteOp>) -> Result<BatchOutcome, SinkError> {
        let operations = batch.len();
        let connection = Arc::clone(&self.connection);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock().map_err(|_| SqliteSinkError::Poisoned)?;
            write_batch(&mut guard, &batch)
        })
        .await
        .map_err(|source| SinkError::Interrupted { source })?;
        outcome.map_err(|source| SinkError::Rejected {
            operations,
            source: Box::new(source),
        })
    }
}

fn write_batch(
    connection: &mut Connection,
    batch: &[WriteOp],
) -> Result<BatchOutcome, SqliteSinkError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SqliteSinkError::BeginTransaction { source })?;
    let mut outcome = BatchOutcome::default();
    {
        let mut insert = transaction
            .prepare_cached(INSERT_SQL)
            .map_err(|source| SqliteSinkError::PrepareStatement { source })?;
        let mut upsert = transaction
            .prepare_cached(UPSERT_SQL)
            .map_err(|source| SqliteSinkError::PrepareStatement { source })?;

        for op in batch {
            let statement = match op {
                WriteOp::Insert(_) => &mut insert,
                WriteOp::UpsertByKey { .. } => &mut upsert,
            };
            match execute(statement, op) {
                Ok(()) => outcome.written += 1,
                Err(OperationError::Execute(source)) if !is_constraint_violation(&source) => {
                    return Err(SqliteSinkError::Execute {
                        key: op.key(),
                        source,
                    });
                }
                Err(err) => {
                    outcome.failed += 1;
                    debug!("Rejected write for {}: {err}", op.key());
                }
            }
        }
    }
    transaction
        .commit()
        .map_err(|source| SqliteSinkError::Commit { source })?;

    if outcome.failed > 0 {
        warn!(
            "SQLite batch applied {} of {} operations ({} rejected)",
            outcome.written,
            batch.len(),
            outcome.failed
        );
    }
    Ok(outcome)
}

fn execute(statement: &mut CachedStatement<'_>, op: &WriteOp) -> Result<(), OperationError> {
    let key = op.key();
    let document = op.document();
    let text = document.to_json()?;
    let timestamp = document.timestamp.map(|ts| ts.to_rfc3339());
    statement.execute((
        key.id,
        key.kind.as_str(),
        document.key.version,
        timestamp,
        text,
    ))?;
    Ok(())
}

fn is_constraint_violation(err: &SqliteError) -> bool {
    matches!(
        err,
        SqliteError::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), SqliteSinkError> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let (base, relative) = parent
        .strip_prefix("/")
        .map_or((".", parent), |relative| ("/", relative));
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())
        .and_then(|dir| dir.create_dir_all(relative))
        .map_err(|source| SqliteSinkError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use terraload_core::{ElementKind, Entity, Member, Point, Relation, Tag};

    fn point(id: i64, version: i32, name: &str) -> Document {
        Document::from(Entity::Point(Point {
            id,
            version,
            timestamp: None,
            tags: vec![Tag::new("name", name)],
            location: Coord { x: 20.0, y: 10.0 },
        }))
    }

    fn relation(id: i64, version: i32, members: &[(ElementKind, i64)]) -> Document {
        Document::from(Entity::Relation(Relation {
            id,
            version,
            timestamp: None,
            tags: vec![Tag::new("type", "route")],
            members: members
                .iter()
                .map(|&(kind, reference)| Member {
                    kind,
                    reference,
                    role: "stop".into(),
                    location: None,
                    orientation: None,
                })
                .collect(),
        }))
    }

    fn upsert(document: Document) -> WriteOp {
        WriteOp::UpsertByKey {
            key: document.identity(),
            document,
        }
    }

    #[fixture]
    fn sink() -> SqliteDocumentSink {
        SqliteDocumentSink::open_in_memory().expect("open in-memory sink")
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_insert_is_counted_without_failing_siblings(sink: SqliteDocumentSink) {
        let first = sink
            .bulk_write(vec![WriteOp::Insert(point(1, 1, "a"))])
            .await
            .expect("first batch");
        assert_eq!(first, BatchOutcome { written: 1, failed: 0 });

        let second = sink
            .bulk_write(vec![
                WriteOp::Insert(point(1, 2, "dup")),
                WriteOp::Insert(point(2, 1, "b")),
            ])
            .await
            .expect("batch with a duplicate still succeeds");
        assert_eq!(second, BatchOutcome { written: 1, failed: 1 });
        assert_eq!(sink.count().expect("count"), 2);

        let kept = sink
            .document(IdentityKey::new(1, ElementKind::Point))
            .expect("query")
            .expect("document present");
        assert_eq!(kept.key.version, 1, "insert must not overwrite");
    }

    #[rstest]
    #[tokio::test]
    async fn non_constraint_failure_rolls_back_the_batch(sink: SqliteDocumentSink) {
        sink.lock()
            .expect("lock")
            .execute_batch(
                "CREATE TRIGGER overflow_on_two BEFORE INSERT ON entities WHEN NEW.id = 2
                 BEGIN SELECT abs(-9223372036854775807 - 1); END;",
            )
            .expect("install failing trigger");

        let outcome = sink
            .bulk_write(vec![
                WriteOp::Insert(point(1, 1, "a")),
                WriteOp::Insert(point(2, 1, "b")),
                WriteOp::Insert(point(3, 1, "c")),
            ])
            .await;

        match outcome {
            Err(SinkError::Rejected { operations, source }) => {
                assert_eq!(operations, 3);
                assert!(matches!(
                    source.downcast_ref::<SqliteSinkError>(),
                    Some(SqliteSinkError::Execute { key, .. }) if key.id == 2
                ));
            }
            other => panic!("expected a rejected batch, got {other:?}"),
        }
        assert_eq!(sink.count().expect("count"), 0, "earlier rows roll back");
    }

    #[rstest]
    #[tokio::test]
    async fn read_only_store_fails_the_batch(sink: SqliteDocumentSink) {
        sink.lock()
            .expect("lock")
            .execute_batch("PRAGMA query_only = ON")
            .expect("switch to read-only");

        let outcome = sink.bulk_write(vec![upsert(point(4, 1, "d"))]).await;

        assert!(
            matches!(outcome, Err(SinkError::Rejected { operations: 1, .. })),
            "expected a rejected batch, got {outcome:?}"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn replaying_an_upsert_is_idempotent(sink: SqliteDocumentSink) {
        let document = point(5, 3, "same");
        sink.bulk_write(vec![upsert(document.clone())])
            .await
            .expect("first upsert");
        let once = sink
            .document(IdentityKey::new(5, ElementKind::Point))
            .expect("query");

        sink.bulk_write(vec![upsert(document.clone())])
            .await
            .expect("replayed upsert");
        let twice = sink
            .document(IdentityKey::new(5, ElementKind::Point))
            .expect("query");

        assert_eq!(once, twice);
        assert_eq!(twice, Some(document));
        assert_eq!(sink.count().expect("count"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn later_upsert_replaces_the_document(sink: SqliteDocumentSink) {
        sink.bulk_write(vec![upsert(point(8, 1, "old")), upsert(point(8, 2, "new"))])
            .await
            .expect("upserts");
        let stored = sink
            .document(IdentityKey::new(8, ElementKind::Point))
            .expect("query")
            .expect("document present");
        assert_eq!(stored.key.version, 2);
        assert_eq!(stored.tags, vec![Tag::new("name", "new")]);
    }

    #[rstest]
    fn provisions_indexes_idempotently(sink: SqliteDocumentSink) {
        sink.provision_indexes().expect("first provisioning");
        sink.provision_indexes().expect("second provisioning");
        let connection = sink.lock().expect("lock");
        let indexes: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'entities_%'",
                [],
                |row| row.get(0),
            )
            .expect("count indexes");
        assert_eq!(indexes, 3);
    }

    #[rstest]
    #[tokio::test]
    async fn lookup_tables_cover_existing_and_later_writes(sink: SqliteDocumentSink) {
        sink.bulk_write(vec![
            WriteOp::Insert(point(1, 1, "Well")),
            WriteOp::Insert(relation(10, 1, &[(ElementKind::Point, 1)])),
        ])
        .await
        .expect("load before provisioning");
        sink.provision_indexes().expect("provision");

        sink.bulk_write(vec![
            upsert(relation(11, 1, &[(ElementKind::Path, 7), (ElementKind::Point, 1)])),
            upsert(relation(10, 2, &[(ElementKind::Path, 7)])),
        ])
        .await
        .expect("load after provisioning");

        let point_key = IdentityKey::new(1, ElementKind::Point);
        let path_key = IdentityKey::new(7, ElementKind::Path);
        assert_eq!(sink.relations_referencing(point_key).expect("query"), vec![11]);
        assert_eq!(sink.relations_referencing(path_key).expect("query"), vec![10, 11]);
        assert_eq!(sink.tagged("name", "Well").expect("query"), vec![point_key]);
        assert_eq!(
            sink.tagged("type", "route").expect("query"),
            vec![
                IdentityKey::new(10, ElementKind::Relation),
                IdentityKey::new(11, ElementKind::Relation),
            ]
        );

        sink.provision_indexes().expect("reprovision");
        assert_eq!(sink.relations_referencing(path_key).expect("query"), vec![10, 11]);
    }

    #[rstest]
    fn creates_parent_directories() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/deeper/osm.db"))
            .expect("utf-8 path");
        SqliteDocumentSink::open(&path).expect("open nested database");
        assert!(path.exists(), "database should be created at nested path");
    }

    #[rstest]
    fn missing_document_is_none(sink: SqliteDocumentSink) {
        let stored = sink
            .document(IdentityKey::new(404, ElementKind::Relation))
            .expect("query");
        assert!(stored.is_none());
    }
}
