// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Manages a generic event channel.
///
/// The bus is generic over the event type `T` so that `rhea-core` does not
/// depend on the event types of the crates that use it.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiver is disconnected.
    ///
    /// ## Arguments
    /// * `event` - The event to be sent over the channel.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every event currently queued, in send order.
    ///
    /// ## Returns
    /// The pending events. Never blocks.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::{SendError, TryRecvError};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        CameraDestroyed(u32),
        TargetDestroyed(u32),
    }

    #[test]
    fn try_receive_empty() {
        let bus = EventBus::<TestEvent>::new();
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn drain_preserves_send_order() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        sender
            .send(TestEvent::CameraDestroyed(1))
            .expect("Send 1 should succeed");
        bus.publish(TestEvent::TargetDestroyed(2));

        assert_eq!(
            bus.drain(),
            vec![TestEvent::CameraDestroyed(1), TestEvent::TargetDestroyed(2)]
        );
        assert!(bus.receiver().is_empty());
    }

    #[test]
    fn send_error_on_receiver_drop() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        drop(bus);

        match sender.send(TestEvent::CameraDestroyed(7)) {
            Err(SendError(_)) => {}
            Ok(()) => panic!("Send unexpectedly succeeded after receiver drop"),
        }
    }
}
