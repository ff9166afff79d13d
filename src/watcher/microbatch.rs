use std::time::Duration;

use chrono::{DateTime, Local};
use notify::Event;
use tokio::sync::mpsc::Receiver;
use tokio::time::{sleep, Instant};

use crate::util;

pub struct Batch {
    pub events: Vec<Event>,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

/// Collects filesystem events into one batch: the first event opens the
/// window and every further event extends it, so a burst of drops lands in a
/// single batch.
pub async fn next_batch(rx: &mut Receiver<Event>, window: Duration) -> Option<Batch> {
    let first_event = rx.recv().await?;
    let mut events = vec![first_event];
    let started_at = util::now_local();
    let deadline = sleep(window);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                break;
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        events.push(event);
                        let next = Instant::now() + window;
                        deadline.as_mut().reset(next);
                    }
                    None => {
                        break;
                    }
                }
            }
        }
    }
    Some(Batch {
        events,
        started_at,
        ended_at: util::now_local(),
    })
}
