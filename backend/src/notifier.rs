use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::models::Transaction;
use crate::routes::AppState;

pub const NEW_TRANSACTION_EVENT: &str = "nueva-transaccion";

/// Fan-out of newly created transactions to every connected listener.
///
/// Late subscribers get no replay, and a listener that falls more than the
/// channel capacity behind skips the missed events.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Transaction>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many listeners were connected when the event was sent.
    pub fn publish(&self, tx: &Transaction) -> usize {
        self.sender.send(tx.clone()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Transaction> {
        self.sender.subscribe()
    }
}

pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|msg| {
        let tx = match msg {
            Ok(tx) => tx,
            Err(e) => {
                tracing::warn!(error = %e, "event listener lagged");
                return None;
            }
        };
        match Event::default().event(NEW_TRANSACTION_EVENT).json_data(&tx) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode transaction event");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
