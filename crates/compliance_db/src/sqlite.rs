//! SQLite-backed [`AuditRepository`], for deployments that want durable
//! audit storage without standing up a server-grade database. A pooled
//! connection plus an idempotent startup migration, so the table exists
//! whether this is the first run against a fresh file or the hundredth
//! against an existing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use compliance_core::model::{AuditActionType, AuditRecord, Stage};
use compliance_ids::{AuditId, CorrelationId, FileId};

use crate::error::Result;
use crate::repository::AuditRepository;

pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit_records (
                audit_id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                correlation_id TEXT NOT NULL,
                file_id TEXT,
                action_type TEXT NOT NULL,
                stage TEXT NOT NULL,
                user_id TEXT,
                success INTEGER NOT NULL,
                action_details TEXT NOT NULL,
                error_message TEXT
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_records(timestamp)")
            .execute(&pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_action_ts ON audit_records(action_type, timestamp)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }
}

fn action_type_str(a: AuditActionType) -> &'static str {
    match a {
        AuditActionType::Download => "download",
        AuditActionType::Extraction => "extraction",
        AuditActionType::Classification => "classification",
        AuditActionType::Move => "move",
        AuditActionType::Review => "review",
        AuditActionType::Export => "export",
    }
}

fn parse_action_type(s: &str) -> AuditActionType {
    match s {
        "download" => AuditActionType::Download,
        "extraction" => AuditActionType::Extraction,
        "classification" => AuditActionType::Classification,
        "move" => AuditActionType::Move,
        "review" => AuditActionType::Review,
        _ => AuditActionType::Export,
    }
}

fn stage_str(s: Stage) -> &'static str {
    match s {
        Stage::Ingestion => "ingestion",
        Stage::Extraction => "extraction",
        Stage::DecisionLogic => "decision_logic",
        Stage::Export => "export",
    }
}

fn parse_stage(s: &str) -> Stage {
    match s {
        "ingestion" => Stage::Ingestion,
        "extraction" => Stage::Extraction,
        "decision_logic" => Stage::DecisionLogic,
        _ => Stage::Export,
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_records
             (audit_id, timestamp, correlation_id, file_id, action_type, stage, user_id, success, action_details, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.audit_id.as_str())
        .bind(record.timestamp.to_rfc3339())
        .bind(record.correlation_id.as_str())
        .bind(record.file_id.as_ref().map(|f| f.as_str()))
        .bind(action_type_str(record.action_type))
        .bind(stage_str(record.stage))
        .bind(record.user_id.as_deref())
        .bind(record.success)
        .bind(record.action_details)
        .bind(record.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        action_type: Option<AuditActionType>,
        user_id: Option<&str>,
    ) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            "SELECT audit_id, timestamp, correlation_id, file_id, action_type, stage, user_id, success, action_details, error_message
             FROM audit_records
             WHERE timestamp >= ? AND timestamp <= ?
               AND (?1 IS NULL OR action_type = ?1)
               AND (?2 IS NULL OR user_id = ?2)
             ORDER BY timestamp ASC, audit_id ASC",
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .bind(action_type.map(action_type_str))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let timestamp: String = row.try_get("timestamp")?;
                Ok(AuditRecord {
                    audit_id: AuditId::parse(row.try_get::<String, _>("audit_id")?.as_str())
                        .map_err(|e| crate::error::DbError::Constraint(e.to_string()))?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| crate::error::DbError::Constraint(e.to_string()))?
                        .with_timezone(&Utc),
                    correlation_id: CorrelationId::parse(row.try_get::<String, _>("correlation_id")?.as_str())
                        .map_err(|e| crate::error::DbError::Constraint(e.to_string()))?,
                    file_id: row
                        .try_get::<Option<String>, _>("file_id")?
                        .map(|s| FileId::parse(&s))
                        .transpose()
                        .map_err(|e| crate::error::DbError::Constraint(e.to_string()))?,
                    action_type: parse_action_type(&row.try_get::<String, _>("action_type")?),
                    stage: parse_stage(&row.try_get::<String, _>("stage")?),
                    user_id: row.try_get("user_id")?,
                    success: row.try_get("success")?,
                    action_details: row.try_get("action_details")?,
                    error_message: row.try_get("error_message")?,
                })
            })
            .collect()
    }
}
