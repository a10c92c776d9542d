//! Integration tests for the Postgres adapters
//!
//! These tests verify the conditional assignment writes, the availability
//! guards and the table-backed queue against a real database. They are
//! ignored by default; run them with `DATABASE_URL` set:
//!
//! ```text
//! cargo test --test repository_integration -- --ignored
//! ```

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use ticketdesk_api::domain::agent::{Agent, Availability, Email};
use ticketdesk_api::domain::repositories::{AgentRepository, RepositoryError, TicketRepository};
use ticketdesk_api::domain::ticket::{
    Actor, AssignmentMetadata, AssignmentMethod, NewTicket, Priority, Ticket, TicketStatus, Update,
};
use ticketdesk_api::events::messages::{QueueMessage, TicketEventData, TICKET_RESOLVED};
use ticketdesk_api::events::{MessageQueue, QueueError};
use ticketdesk_api::infrastructure::queue::PostgresQueue;
use ticketdesk_api::infrastructure::repositories::{PostgresAgentRepository, PostgresTicketRepository};

/// Set up test database connection pool and apply migrations
async fn setup_test_db() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn create_test_agent(repo: &PostgresAgentRepository, name: &str) -> Agent {
    let email = Email::new(format!("{}-{}@test.com", name.to_lowercase(), Uuid::new_v4())).unwrap();
    let agent = Agent::new(name, email).unwrap();
    repo.insert(&agent).await.expect("Failed to create test agent");
    agent
}

async fn create_test_ticket(repo: &PostgresTicketRepository, category: &str) -> Ticket {
    let (ticket, _events) = Ticket::new(NewTicket {
        title: "Repository test ticket".to_string(),
        description: "Created by repository_integration".to_string(),
        category: category.to_string(),
        priority: Priority::High,
        organization: Some("Acme".to_string()),
        created_by: None,
    })
    .unwrap();
    repo.insert(&ticket).await.expect("Failed to create test ticket");
    ticket
}

fn assignment_update(agent_id: Uuid) -> Update {
    Update::assignment(
        Actor::System,
        "Test Agent",
        AssignmentMetadata {
            agent_id,
            method: AssignmentMethod::WorkloadFallback,
            confidence: 0.3,
            reasoning: "least loaded".to_string(),
            estimated_response_time: Some("4 hours".to_string()),
            previous_agent_id: None,
        },
    )
}

/// Clean up test data
async fn cleanup(pool: &PgPool, tickets: &[Uuid], agents: &[Uuid]) {
    sqlx::query("DELETE FROM tickets WHERE id = ANY($1)")
        .bind(tickets)
        .execute(pool)
        .await
        .expect("Failed to cleanup tickets");
    sqlx::query("DELETE FROM agents WHERE id = ANY($1)")
        .bind(agents)
        .execute(pool)
        .await
        .expect("Failed to cleanup agents");
}

#[tokio::test]
#[ignore]
async fn test_conditional_assignment_wins_once() {
    let pool = setup_test_db().await;
    let tickets = PostgresTicketRepository::new(pool.clone());
    let agents = PostgresAgentRepository::new(pool.clone());
    let first = create_test_agent(&agents, "First").await;
    let second = create_test_agent(&agents, "Second").await;
    let ticket = create_test_ticket(&tickets, "billing").await;

    let won = tickets
        .assign_if_unassigned(ticket.id(), first.id(), &assignment_update(first.id()))
        .await
        .unwrap();
    let lost = tickets
        .assign_if_unassigned(ticket.id(), second.id(), &assignment_update(second.id()))
        .await
        .unwrap();

    let won = won.expect("first write should win");
    assert!(lost.is_none());
    assert_eq!(won.assigned_to(), Some(first.id()));
    assert_eq!(won.status(), TicketStatus::InProgress);
    assert_eq!(won.updates().len(), 1);
    assert_eq!(won.updates()[0].method(), Some(AssignmentMethod::WorkloadFallback));
    assert_eq!(tickets.count_active_for_agent(first.id()).await.unwrap(), 1);

    cleanup(&pool, &[ticket.id()], &[first.id(), second.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_reassign_checks_previous_assignee() {
    let pool = setup_test_db().await;
    let tickets = PostgresTicketRepository::new(pool.clone());
    let agents = PostgresAgentRepository::new(pool.clone());
    let a = create_test_agent(&agents, "Alpha").await;
    let b = create_test_agent(&agents, "Beta").await;
    let ticket = create_test_ticket(&tickets, "network").await;
    tickets
        .assign_if_unassigned(ticket.id(), a.id(), &assignment_update(a.id()))
        .await
        .unwrap();

    let stale = tickets
        .reassign(ticket.id(), Some(b.id()), a.id(), &assignment_update(a.id()))
        .await
        .unwrap();
    let moved = tickets
        .reassign(ticket.id(), Some(a.id()), b.id(), &assignment_update(b.id()))
        .await
        .unwrap();

    assert!(stale.is_none());
    assert_eq!(moved.unwrap().assigned_to(), Some(b.id()));

    cleanup(&pool, &[ticket.id()], &[a.id(), b.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_status_update_sets_and_clears_resolved_at() {
    let pool = setup_test_db().await;
    let tickets = PostgresTicketRepository::new(pool.clone());
    let agents = PostgresAgentRepository::new(pool.clone());
    let agent = create_test_agent(&agents, "Resolver").await;
    let ticket = create_test_ticket(&tickets, "account").await;
    tickets
        .assign_if_unassigned(ticket.id(), agent.id(), &assignment_update(agent.id()))
        .await
        .unwrap();

    let resolve = Update::status_change(Actor::System, TicketStatus::InProgress, TicketStatus::Resolved, None);
    let resolved = tickets
        .update_status(ticket.id(), TicketStatus::InProgress, TicketStatus::Resolved, &resolve)
        .await
        .unwrap()
        .unwrap();
    assert!(resolved.resolved_at().is_some());
    assert_eq!(tickets.count_active_for_agent(agent.id()).await.unwrap(), 0);

    let stale = tickets
        .update_status(ticket.id(), TicketStatus::InProgress, TicketStatus::Closed, &resolve)
        .await
        .unwrap();
    assert!(stale.is_none());

    let reopen = Update::status_change(Actor::System, TicketStatus::Resolved, TicketStatus::InProgress, None);
    let reopened = tickets
        .update_status(ticket.id(), TicketStatus::Resolved, TicketStatus::InProgress, &reopen)
        .await
        .unwrap()
        .unwrap();
    assert!(reopened.resolved_at().is_none());
    assert_eq!(reopened.updates().len(), 3);

    cleanup(&pool, &[ticket.id()], &[agent.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_recompute_availability_follows_workload_and_respects_offline() {
    let pool = setup_test_db().await;
    let agents = PostgresAgentRepository::new(pool.clone());
    let tickets = PostgresTicketRepository::new(pool.clone());
    let agent = create_test_agent(&agents, "Guarded").await;
    let ticket = create_test_ticket(&tickets, "billing").await;

    let idle = agents.recompute_availability(agent.id()).await.unwrap().unwrap();
    assert_eq!(idle.current, Availability::Available);
    assert!(!idle.changed());

    tickets
        .assign_if_unassigned(ticket.id(), agent.id(), &assignment_update(agent.id()))
        .await
        .unwrap()
        .unwrap();
    let busy = agents.recompute_availability(agent.id()).await.unwrap().unwrap();
    assert_eq!(busy.current, Availability::Busy);
    assert_eq!(busy.active_tickets, 1);
    assert!(busy.changed());

    assert!(agents.set_availability(agent.id(), Availability::Offline).await.unwrap());
    let offline = agents.recompute_availability(agent.id()).await.unwrap().unwrap();
    assert_eq!(offline.current, Availability::Offline);

    let stored = agents.find_by_id(agent.id()).await.unwrap().unwrap();
    assert_eq!(stored.availability(), Availability::Offline);
    assert!(agents.recompute_availability(Uuid::new_v4()).await.unwrap().is_none());
    assert!(!agents.set_availability(Uuid::new_v4(), Availability::Busy).await.unwrap());

    cleanup(&pool, &[ticket.id()], &[agent.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_agent_email_is_rejected() {
    let pool = setup_test_db().await;
    let agents = PostgresAgentRepository::new(pool.clone());
    let agent = create_test_agent(&agents, "Original").await;

    let copy = Agent::new("Copy", agent.email().clone()).unwrap();
    let result = agents.insert(&copy).await;

    assert!(matches!(result, Err(RepositoryError::Duplicate(_))));

    cleanup(&pool, &[], &[agent.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_oldest_unassigned_and_category_history() {
    let pool = setup_test_db().await;
    let tickets = PostgresTicketRepository::new(pool.clone());
    let agents = PostgresAgentRepository::new(pool.clone());
    let agent = create_test_agent(&agents, "Historian").await;

    let created = Utc::now() - ChronoDuration::days(3650);
    let ancient = Ticket::from_persistence(
        Uuid::new_v4(),
        "Ancient".to_string(),
        String::new(),
        "general".to_string(),
        Priority::Low,
        None,
        None,
        TicketStatus::Open,
        None,
        created,
        created,
        None,
        Vec::new(),
    );
    tickets.insert(&ancient).await.unwrap();

    let oldest = tickets.oldest_unassigned_open().await.unwrap().unwrap();
    assert_eq!(oldest.id(), ancient.id());

    let mut ids = vec![ancient.id()];
    for category in ["billing", "billing", "network"] {
        let ticket = create_test_ticket(&tickets, category).await;
        tickets
            .assign_if_unassigned(ticket.id(), agent.id(), &assignment_update(agent.id()))
            .await
            .unwrap();
        ids.push(ticket.id());
    }
    let history = tickets.category_history(agent.id(), 5).await.unwrap();
    assert_eq!(history, vec!["billing".to_string(), "network".to_string()]);

    cleanup(&pool, &ids, &[agent.id()]).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_queue_visibility_and_receipts() {
    let pool = setup_test_db().await;
    let queue = PostgresQueue::new(pool.clone());
    sqlx::query("DELETE FROM queue_messages")
        .execute(&pool)
        .await
        .expect("Failed to clear queue");

    let message = QueueMessage {
        event_type: TICKET_RESOLVED.to_string(),
        data: TicketEventData {
            agent_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        },
        timestamp: Utc::now(),
    };
    queue.publish(&message).await.unwrap();

    let first = queue.receive(10, Duration::from_secs(60)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].delivery_count, 1);
    assert!(queue.receive(10, Duration::from_secs(60)).await.unwrap().is_empty());

    sqlx::query("UPDATE queue_messages SET visible_at = NOW()")
        .execute(&pool)
        .await
        .unwrap();
    let second = queue.receive(10, Duration::from_secs(60)).await.unwrap();
    assert_eq!(second[0].delivery_count, 2);

    assert!(matches!(
        queue.delete(&first[0].receipt).await,
        Err(QueueError::UnknownReceipt(_))
    ));
    queue.delete(&second[0].receipt).await.unwrap();
    assert!(QueueMessage::route(&second[0].body).is_ok());
}
