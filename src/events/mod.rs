use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the reconciliation engine and inventory store.
/// Delivery is fire-and-forget: a failed send is logged by the caller and
/// never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DispatchCreated(Uuid),
    DispatchUpdated(Uuid),
    DispatchDeleted {
        dispatch_id: Uuid,
        restored_lines: u32,
        total_lines: u32,
    },
    StockReserved {
        item_id: Uuid,
        quantity: i32,
        dispatch_id: Uuid,
    },
    StockReleased {
        item_id: Uuid,
        quantity: i32,
    },
    ReconciliationGap {
        dispatch_id: Uuid,
        item_id: Uuid,
        item_code: String,
        quantity: i32,
    },
    InventoryItemCreated(Uuid),
    InventoryAdjusted {
        item_id: Uuid,
        quantity_change: i32,
        new_quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::ReconciliationGap {
                dispatch_id,
                item_id,
                item_code,
                quantity,
            } => {
                warn!(
                    dispatch_id = %dispatch_id,
                    item_id = %item_id,
                    item_code = %item_code,
                    quantity,
                    "Reconciliation gap: stock could not be restored"
                );
            }
            other => {
                info!(event = ?other, "Processing event");
            }
        }
    }
    info!("Event channel closed; event processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_sender_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let dispatch_id = Uuid::new_v4();
        sender
            .send(Event::DispatchCreated(dispatch_id))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::DispatchCreated(id)) => assert_eq!(id, dispatch_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let sender = EventSender::new(tx);
        let result = sender.send(Event::DispatchUpdated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
