// Queue adapters implementing events::queue::MessageQueue

pub mod in_memory_queue;
pub mod postgres_queue;

pub use in_memory_queue::InMemoryQueue;
pub use postgres_queue::PostgresQueue;

use crate::events::queue::QueueError;

/// Receipts are `<message id>:<delivery count>`
fn parse_receipt(receipt: &str) -> Result<(u64, u32), QueueError> {
    let unknown = || QueueError::UnknownReceipt(receipt.to_string());
    let (id, count) = receipt.split_once(':').ok_or_else(unknown)?;
    Ok((id.parse().map_err(|_| unknown())?, count.parse().map_err(|_| unknown())?))
}
