// Communication channels lock-free

use crate::messaging::event::EngineEvent;
use log::trace;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::{Arc, Mutex, PoisonError};

pub type EventProducer = HeapProd<EngineEvent>;
pub type EventConsumer = HeapCons<EngineEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<EngineEvent>::new(capacity);
    rb.split()
}

/// Receiving end handed to a subscriber
pub struct EventReceiver {
    consumer: EventConsumer,
}

impl EventReceiver {
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.consumer.try_pop()
    }

    /// Everything queued so far
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.consumer.try_pop() {
            events.push(event);
        }
        events
    }
}

/// Fan-in point for engine events; one subscriber at a time
///
/// Sending never blocks beyond a short producer lock. Events are dropped
/// when nobody subscribed or the subscriber's queue is full.
#[derive(Clone)]
pub struct EventSender {
    producer: Arc<Mutex<Option<EventProducer>>>,
    capacity: usize,
}

impl EventSender {
    pub fn new(capacity: usize) -> Self {
        Self {
            producer: Arc::new(Mutex::new(None)),
            capacity: capacity.max(1),
        }
    }

    /// Replace the current subscriber with a fresh channel
    pub fn subscribe(&self) -> EventReceiver {
        let (producer, consumer) = create_event_channel(self.capacity);
        *self.producer.lock().unwrap_or_else(PoisonError::into_inner) = Some(producer);
        EventReceiver { consumer }
    }

    pub fn send(&self, event: EngineEvent) {
        let mut guard = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(producer) = guard.as_mut() {
            if let Err(event) = producer.try_push(event) {
                trace!("Event queue full, dropping {:?}", event);
            }
        }
    }
}
