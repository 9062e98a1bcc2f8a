//! Relational branch store
//!
//! Runs on sqlx's `Any` driver so the same queries serve MySQL (Cloud SQL) and
//! SQLite. All statements are parameterized. `branch-id` holds
//! [`Branch::storage_id`]; there is no foreign key, the registry is the only
//! source of the mapping.
//!
//! `branch_data` keeps the column names of the tables already deployed
//! (`branch-id`, `last-updated`, `current-percentage`), so identifiers are
//! quoted with backticks. SQLite accepts backtick quoting as well.

use async_trait::async_trait;
use climbwatch_common::branch::empty_branch_map;
use climbwatch_common::{time, Branch, BranchMap, ExpectedAttendanceSlot, OccupancyReading};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info, warn};

use super::{BranchStore, StoreError, StoreResult};

/// SQL flavour, picked from the connection URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> StoreResult<Self> {
        if url.starts_with("mysql:") {
            Ok(Dialect::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or_default();
            Err(StoreError::UnsupportedUrl(format!("{}://...", scheme)))
        }
    }

    fn create_statements(self) -> &'static [&'static str] {
        match self {
            Dialect::MySql => &[
                r#"
                CREATE TABLE IF NOT EXISTS `branch_data` (
                    `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    `branch-id` INT NOT NULL,
                    `last-updated` DATETIME NOT NULL,
                    `name` VARCHAR(255) NOT NULL,
                    `status` VARCHAR(255) NOT NULL,
                    `current-percentage` DOUBLE NOT NULL,
                    INDEX `idx_branch_data_branch` (`branch-id`)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS `expected_attendance` (
                    `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    `branch-id` INT NOT NULL,
                    `hour` INT NOT NULL,
                    `percentage` DOUBLE NOT NULL,
                    `remaining` DOUBLE NULL,
                    INDEX `idx_expected_attendance_branch` (`branch-id`)
                )
                "#,
            ],
            Dialect::Sqlite => &[
                r#"
                CREATE TABLE IF NOT EXISTS `branch_data` (
                    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
                    `branch-id` INTEGER NOT NULL,
                    `last-updated` TEXT NOT NULL,
                    `name` TEXT NOT NULL,
                    `status` TEXT NOT NULL,
                    `current-percentage` REAL NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS `idx_branch_data_branch` ON `branch_data` (`branch-id`)",
                r#"
                CREATE TABLE IF NOT EXISTS `expected_attendance` (
                    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
                    `branch-id` INTEGER NOT NULL,
                    `hour` INTEGER NOT NULL,
                    `percentage` REAL NOT NULL,
                    `remaining` REAL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS `idx_expected_attendance_branch` ON `expected_attendance` (`branch-id`)",
            ],
        }
    }
}

/// sqlx-backed store
#[derive(Clone)]
pub struct SqlStore {
    pool: AnyPool,
    offset_hours: i64,
}

impl SqlStore {
    /// Connect and create the tables if they are missing
    pub async fn connect(url: &str, offset_hours: i64) -> StoreResult<Self> {
        let dialect = Dialect::from_url(url)?;
        sqlx::any::install_default_drivers();

        // An in-memory SQLite database lives and dies with its connection
        let in_memory = dialect == Dialect::Sqlite && url.contains(":memory:");
        let options = if in_memory {
            AnyPoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(5)
        };

        let pool = options.connect(url).await?;
        info!(dialect = ?dialect, "Connected to database");

        Self::with_pool(pool, dialect, offset_hours).await
    }

    /// Wrap an open pool, creating any missing tables
    ///
    /// Tables that already exist are left as they are.
    pub async fn with_pool(pool: AnyPool, dialect: Dialect, offset_hours: i64) -> StoreResult<Self> {
        let store = Self { pool, offset_hours };
        store.init_tables(dialect).await?;
        Ok(store)
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn init_tables(&self, dialect: Dialect) -> StoreResult<()> {
        for statement in dialect.create_statements() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database tables initialized (branch_data, expected_attendance)");
        Ok(())
    }
}

/// Map a `branch-id` column back to its branch, skipping unknown ids
fn row_branch(row: &AnyRow, table: &str) -> StoreResult<Option<Branch>> {
    let branch_id: i64 = row.try_get("branch-id")?;
    match Branch::from_storage_id(branch_id) {
        Ok(branch) => Ok(Some(branch)),
        Err(_) => {
            warn!(table, branch_id, "Skipping row with unknown branch id");
            Ok(None)
        }
    }
}

#[async_trait]
impl BranchStore for SqlStore {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    async fn record_occupancy(&self, branch: Branch, reading: OccupancyReading) -> StoreResult<()> {
        let reading = reading.with_offset(self.offset_hours);

        sqlx::query(
            r#"
            INSERT INTO `branch_data` (`branch-id`, `last-updated`, `name`, `status`, `current-percentage`)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(branch.storage_id())
        .bind(time::to_storage(reading.last_updated))
        .bind(reading.name)
        .bind(reading.status)
        .bind(reading.current_percentage)
        .execute(&self.pool)
        .await?;

        debug!(branch = %branch, "Occupancy row inserted");
        Ok(())
    }

    async fn replace_attendance(
        &self,
        branch: Branch,
        slots: Vec<ExpectedAttendanceSlot>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM `expected_attendance` WHERE `branch-id` = ?")
            .bind(branch.storage_id())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for slot in &slots {
            sqlx::query(
                r#"
                INSERT INTO `expected_attendance` (`branch-id`, `hour`, `percentage`, `remaining`)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(branch.storage_id())
            .bind(i64::from(slot.hour))
            .bind(slot.percentage)
            .bind(slot.remaining)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(branch = %branch, deleted, inserted = slots.len(), "Attendance rows replaced");
        Ok(())
    }

    async fn read_occupancy(&self) -> StoreResult<BranchMap<OccupancyReading>> {
        let rows = sqlx::query(
            r#"
            SELECT `branch-id`, CAST(`last-updated` AS CHAR) AS `last-updated`, `name`, `status`,
                   `current-percentage`
            FROM `branch_data`
            ORDER BY `last-updated`, `branch-id`
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut map = empty_branch_map();
        for row in &rows {
            let Some(branch) = row_branch(row, "branch_data")? else {
                continue;
            };

            let stamp: String = row.try_get("last-updated")?;
            let last_updated = match time::from_storage(&stamp) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(branch = %branch, "Skipping occupancy row: {}", e);
                    continue;
                }
            };

            map.entry(branch).or_insert_with(Vec::new).push(OccupancyReading {
                last_updated,
                name: row.try_get("name")?,
                status: row.try_get("status")?,
                current_percentage: row.try_get("current-percentage")?,
            });
        }
        Ok(map)
    }

    async fn read_attendance(&self) -> StoreResult<BranchMap<ExpectedAttendanceSlot>> {
        let rows = sqlx::query(
            r#"
            SELECT `branch-id`, `hour`, `percentage`, `remaining`
            FROM `expected_attendance`
            ORDER BY `id`
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut map = empty_branch_map();
        for row in &rows {
            let Some(branch) = row_branch(row, "expected_attendance")? else {
                continue;
            };

            let hour: i64 = row.try_get("hour")?;
            let Ok(hour) = u32::try_from(hour) else {
                warn!(branch = %branch, hour, "Skipping attendance row with negative hour");
                continue;
            };

            map.entry(branch).or_insert_with(Vec::new).push(ExpectedAttendanceSlot {
                hour,
                percentage: row.try_get("percentage")?,
                remaining: row.try_get("remaining")?,
            });
        }
        Ok(map)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
