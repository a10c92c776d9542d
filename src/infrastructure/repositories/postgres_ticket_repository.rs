use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::repositories::{RepositoryResult, TicketRepository};
use crate::domain::ticket::{Actor, AssignmentMetadata, Priority, Ticket, TicketStatus, Update, UpdateType};

const TICKET_COLUMNS: &str = "id, title, description, category, priority, organization, created_by, \
                              status, assigned_to, created_at, updated_at, resolved_at";

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    priority: Priority,
    organization: Option<String>,
    created_by: Option<Uuid>,
    status: TicketStatus,
    assigned_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct UpdateRow {
    id: Uuid,
    ticket_id: Uuid,
    message: String,
    actor: Json<Actor>,
    update_type: UpdateType,
    metadata: Option<Json<AssignmentMetadata>>,
    created_at: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self, updates: Vec<Update>) -> Ticket {
        Ticket::from_persistence(
            self.id,
            self.title,
            self.description,
            self.category,
            self.priority,
            self.organization,
            self.created_by,
            self.status,
            self.assigned_to,
            self.created_at,
            self.updated_at,
            self.resolved_at,
            updates,
        )
    }
}

impl From<UpdateRow> for Update {
    fn from(row: UpdateRow) -> Self {
        Update {
            id: row.id,
            message: row.message,
            actor: row.actor.0,
            update_type: row.update_type,
            created_at: row.created_at,
            metadata: row.metadata.map(|m| m.0),
        }
    }
}

/// PostgreSQL implementation of TicketRepository
///
/// Assignment writes are single `UPDATE ... WHERE` statements guarded on the
/// current assignee, executed in the same transaction as the audit insert.
pub struct PostgresTicketRepository {
    pool: PgPool,
}

impl PostgresTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_update(tx: &mut Transaction<'_, Postgres>, ticket_id: Uuid, update: &Update) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_updates (id, ticket_id, message, actor, update_type, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(update.id)
        .bind(ticket_id)
        .bind(&update.message)
        .bind(Json(update.actor))
        .bind(update.update_type)
        .bind(update.metadata.as_ref().map(Json))
        .bind(update.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Loads the update logs for a set of ticket rows in one query
    async fn hydrate(&self, rows: Vec<TicketRow>) -> RepositoryResult<Vec<Ticket>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let update_rows: Vec<UpdateRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_id, message, actor, update_type, metadata, created_at
            FROM ticket_updates
            WHERE ticket_id = ANY($1)
            ORDER BY seq
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_ticket: HashMap<Uuid, Vec<Update>> = HashMap::new();
        for row in update_rows {
            by_ticket.entry(row.ticket_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let updates = by_ticket.remove(&row.id).unwrap_or_default();
                row.into_ticket(updates)
            })
            .collect())
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, title, description, category, priority, organization, created_by,
                status, assigned_to, created_at, updated_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ticket.id())
        .bind(ticket.title())
        .bind(ticket.description())
        .bind(ticket.category())
        .bind(ticket.priority())
        .bind(ticket.organization())
        .bind(ticket.created_by())
        .bind(ticket.status())
        .bind(ticket.assigned_to())
        .bind(ticket.created_at())
        .bind(ticket.updated_at())
        .bind(ticket.resolved_at())
        .execute(&mut *tx)
        .await?;

        for update in ticket.updates() {
            Self::insert_update(&mut tx, ticket.id(), update).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn assign_if_unassigned(
        &self,
        ticket_id: Uuid,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let mut tx = self.pool.begin().await?;

        let won = sqlx::query(
            r#"
            UPDATE tickets
            SET assigned_to = $2,
                status = CASE WHEN status = 'open' THEN 'in_progress'::ticket_status ELSE status END,
                updated_at = $3
            WHERE id = $1 AND assigned_to IS NULL
            "#,
        )
        .bind(ticket_id)
        .bind(agent_id)
        .bind(update.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !won {
            tx.rollback().await?;
            return Ok(None);
        }

        Self::insert_update(&mut tx, ticket_id, update).await?;
        tx.commit().await?;

        self.find_by_id(ticket_id).await
    }

    async fn reassign(
        &self,
        ticket_id: Uuid,
        expected_previous: Option<Uuid>,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let mut tx = self.pool.begin().await?;

        let won = sqlx::query(
            r#"
            UPDATE tickets
            SET assigned_to = $2,
                status = CASE WHEN status = 'open' THEN 'in_progress'::ticket_status ELSE status END,
                updated_at = $4
            WHERE id = $1 AND assigned_to IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(ticket_id)
        .bind(agent_id)
        .bind(expected_previous)
        .bind(update.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !won {
            tx.rollback().await?;
            return Ok(None);
        }

        Self::insert_update(&mut tx, ticket_id, update).await?;
        tx.commit().await?;

        self.find_by_id(ticket_id).await
    }

    async fn update_status(
        &self,
        ticket_id: Uuid,
        expected: TicketStatus,
        next: TicketStatus,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let mut tx = self.pool.begin().await?;

        let won = sqlx::query(
            r#"
            UPDATE tickets
            SET status = $3,
                updated_at = $4,
                resolved_at = CASE WHEN $5 THEN COALESCE(resolved_at, $4) ELSE NULL END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(ticket_id)
        .bind(expected)
        .bind(next)
        .bind(update.created_at)
        .bind(next.is_terminal())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !won {
            tx.rollback().await?;
            return Ok(None);
        }

        Self::insert_update(&mut tx, ticket_id, update).await?;
        tx.commit().await?;

        self.find_by_id(ticket_id).await
    }

    async fn count_active_for_agent(&self, agent_id: Uuid) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tickets
            WHERE assigned_to = $1 AND status NOT IN ('resolved', 'closed')
            "#,
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn oldest_unassigned_open(&self) -> RepositoryResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets WHERE status = 'open' AND assigned_to IS NULL ORDER BY created_at, id LIMIT 1",
            TICKET_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_unassigned(&self) -> RepositoryResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets \
             WHERE assigned_to IS NULL AND status NOT IN ('resolved', 'closed') \
             ORDER BY created_at, id",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn category_history(&self, agent_id: Uuid, limit: usize) -> RepositoryResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT category
            FROM tickets
            WHERE assigned_to = $1
            GROUP BY category
            ORDER BY COUNT(*) DESC, category
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
