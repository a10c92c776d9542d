use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::agent::availability::override_from_stored;
use crate::domain::agent::{compute_availability, Agent, Availability, Email};
use crate::domain::repositories::{AgentRepository, AvailabilityRecompute, RepositoryError, RepositoryResult};

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    name: String,
    email: String,
    availability: Availability,
    created_at: DateTime<Utc>,
}

impl TryFrom<AgentRow> for Agent {
    type Error = RepositoryError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        let email = Email::new(row.email)
            .map_err(|e| RepositoryError::Corrupt(format!("agent {}: {}", row.id, e)))?;
        Ok(Agent::from_persistence(row.id, row.name, email, row.availability, row.created_at))
    }
}

/// PostgreSQL implementation of AgentRepository
pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    /// Creates a new PostgresAgentRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn insert(&self, agent: &Agent) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, name, email, availability, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(agent.id())
        .bind(agent.name())
        .bind(agent.email().as_str())
        .bind(agent.availability())
        .bind(agent.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, availability, created_at
            FROM agents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Agent::try_from).transpose()
    }

    async fn list(&self) -> RepositoryResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, availability, created_at
            FROM agents
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Agent::try_from).collect()
    }

    async fn set_availability(&self, id: Uuid, availability: Availability) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE agents SET availability = $2 WHERE id = $1")
            .bind(id)
            .bind(availability)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn recompute_availability(&self, id: Uuid) -> RepositoryResult<Option<AvailabilityRecompute>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes recomputes for this agent; the count below runs
        // as a new statement, so it sees every assignment committed before
        // the lock was granted.
        let previous: Option<Availability> =
            sqlx::query_scalar("SELECT availability FROM agents WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tickets
            WHERE assigned_to = $1 AND status NOT IN ('resolved', 'closed')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let active = active.max(0) as u64;

        let current = compute_availability(active, override_from_stored(previous));
        if current != previous {
            sqlx::query("UPDATE agents SET availability = $2 WHERE id = $1")
                .bind(id)
                .bind(current)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(AvailabilityRecompute {
            previous,
            current,
            active_tickets: active,
        }))
    }
}
