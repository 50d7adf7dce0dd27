//! Shared embedded PostgreSQL helpers for integration tests.
//!
//! - One cluster per test binary, shared through the library's singleton.
//! - Each test gets a database cloned from a template that already carries
//!   the embedded migrations, keyed by a hash of the migrations directory.
//! - Seeding uses `postgres` directly because boards and users are owned by
//!   other services and have no write port here.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use companion::outbound::persistence::MIGRATIONS;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "companion_template";
const PROVISION_RETRIES: usize = 5;
const RETRY_DELAY: Duration = Duration::from_millis(500);

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, String> {
    let hash = hash_directory(migrations_dir()).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Returns the process-wide embedded cluster, retrying transient failures.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut last_error = String::new();
    for attempt in 1..=PROVISION_RETRIES {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) => last_error = format!("attempt {attempt}/{PROVISION_RETRIES}: {err:?}"),
        }
        std::thread::sleep(RETRY_DELAY);
    }
    Err(last_error)
}

/// Creates or reuses a template database with the latest migrations applied.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        migrate_schema(&url)?;
    }
    Ok(template_name)
}

/// Provisions a temporary database cloned from the migration template.
pub fn provision_template_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let mut last_error = String::from("create database from template: exhausted retries");
    for attempt in 1..=PROVISION_RETRIES {
        let provisioned = ensure_template_database(cluster).and_then(|template| {
            cluster
                .temporary_database_from_template(
                    format!("test_{}", Uuid::new_v4()).as_str(),
                    template.as_str(),
                )
                .map_err(|err| format!("create database from template: {err:?}"))
        });
        match provisioned {
            Ok(database) => return Ok(database),
            Err(err) => last_error = format!("attempt {attempt}/{PROVISION_RETRIES}: {err}"),
        }
        if attempt < PROVISION_RETRIES {
            std::thread::sleep(RETRY_DELAY);
        }
    }
    Err(last_error)
}

/// Runs all pending Diesel migrations against the given database.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

/// Direct SQL access for seeding and inspecting rows.
pub struct Seeder {
    client: Client,
}

impl Seeder {
    /// Connect to `url`.
    pub fn connect(url: &str) -> Self {
        let client = Client::connect(url, NoTls)
            .unwrap_or_else(|err| panic!("seed connection: {}", format_postgres_error(&err)));
        Self { client }
    }

    /// Insert a user with an optional push token.
    pub fn user(&mut self, nickname: &str, push_token: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.client
            .execute(
                "INSERT INTO users (id, nickname, push_token) VALUES ($1, $2, $3)",
                &[&id, &nickname, &push_token],
            )
            .unwrap_or_else(|err| panic!("seed user: {}", format_postgres_error(&err)));
        id
    }

    /// Insert an open board owned by `owner`.
    pub fn board(&mut self, owner: Uuid, title: &str, max_person: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.client
            .execute(
                "INSERT INTO boards (id, owner_id, title, max_person) VALUES ($1, $2, $3, $4)",
                &[&id, &owner, &title, &max_person],
            )
            .unwrap_or_else(|err| panic!("seed board: {}", format_postgres_error(&err)));
        id
    }

    /// Read a board's occupancy counter.
    pub fn current_person(&mut self, board_id: Uuid) -> i32 {
        self.client
            .query_one("SELECT current_person FROM boards WHERE id = $1", &[&board_id])
            .unwrap_or_else(|err| panic!("read board: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Read a room's participant counter.
    pub fn participant_count(&mut self, room_id: Uuid) -> i32 {
        self.client
            .query_one(
                "SELECT participant_count FROM chat_rooms WHERE id = $1",
                &[&room_id],
            )
            .unwrap_or_else(|err| panic!("read room: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Count live notifications addressed to `recipient`.
    pub fn notifications_for(&mut self, recipient: Uuid) -> i64 {
        self.client
            .query_one(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND deleted_at IS NULL",
                &[&recipient],
            )
            .unwrap_or_else(|err| panic!("count notifications: {}", format_postgres_error(&err)))
            .get(0)
    }
}
