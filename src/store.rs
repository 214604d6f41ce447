use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool, Row};

use crate::error::{EngineError, EngineResult};
use crate::model::Flow;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct MysqlConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

/// Seam between the engine and wherever the active flow definition lives.
/// `FlowStore` is the production MySQL-backed implementation; tests
/// substitute an in-memory fake so the engine's traversal logic can be
/// exercised without a live database, mirroring the teacher's `Adapter`
/// trait seam in `engine/registry.rs`.
#[async_trait]
pub trait FlowSource: Send + Sync {
    async fn load_active_flow(&self) -> EngineResult<Flow>;
    async fn ping(&self) -> bool;
}

/// Adapter over the `flows` table (§6, §4.1).
///
/// Acquires a pooled connection per operation and releases it on every exit
/// path; a failed reload leaves the caller's previously loaded flow in
/// effect (the registry is only touched on success).
pub struct FlowStore {
    pool: Pool<MySql>,
}

impl FlowStore {
    pub async fn connect(config: &MysqlConfig) -> EngineResult<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|err| EngineError::Store {
                reason: format!("failed to connect to the flows database: {err}"),
            })?;

        Ok(Self { pool })
    }

    /// Load the single active flow row, decode it, and resolve its start
    /// node. Returns a [`EngineError::Store`] on connection/query failure or
    /// [`EngineError::LoadShape`] if the row's shape can't be interpreted.
    async fn load_active_flow_inner(&self) -> EngineResult<Flow> {
        let row = sqlx::query("SELECT id, name, elements FROM flows WHERE status = 'active' LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| EngineError::Store {
                reason: format!("query against the flows table failed: {err}"),
            })?
            .ok_or_else(|| EngineError::LoadShape {
                reason: "no row with status = 'active' in the flows table".to_string(),
            })?;

        let id: String = row.try_get("id").map_err(|err| EngineError::LoadShape {
            reason: format!("flows.id column: {err}"),
        })?;
        let name: String = row.try_get("name").map_err(|err| EngineError::LoadShape {
            reason: format!("flows.name column: {err}"),
        })?;
        let elements_raw: Value = match row.try_get::<Value, _>("elements") {
            Ok(value) => value,
            Err(_) => {
                let text: String = row.try_get("elements").map_err(|err| EngineError::LoadShape {
                    reason: format!("flows.elements column: {err}"),
                })?;
                serde_json::from_str(&text).map_err(|err| EngineError::LoadShape {
                    reason: format!("flows.elements column is not valid JSON text: {err}"),
                })?
            }
        };

        Flow::from_stored(id, name, &elements_raw)
    }
}

#[async_trait]
impl FlowSource for FlowStore {
    async fn load_active_flow(&self) -> EngineResult<Flow> {
        self.load_active_flow_inner().await
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
