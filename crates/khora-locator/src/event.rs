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

//! Diagnostics events published by the registries.
//!
//! Every warning a registry logs is also sent as a [`RegistryEvent`] when a
//! channel is attached, so tools and tests can observe them without parsing
//! log output.

use crate::capability::CapabilityId;
use crate::subsystem::SubsystemId;

/// Something notable that happened inside a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A subsystem was registered.
    Registered {
        /// The registered subsystem.
        subsystem: SubsystemId,
        /// The capability key, for keyed registries.
        capability: Option<CapabilityId>,
    },
    /// A subsystem was removed.
    Unregistered {
        /// The removed subsystem.
        subsystem: SubsystemId,
    },
    /// A registration was rejected because the entry already exists.
    DuplicateRegistration {
        /// The rejected subsystem.
        subsystem: SubsystemId,
        /// The capability key, for keyed registries.
        capability: Option<CapabilityId>,
    },
    /// A lookup found nothing.
    CapabilityNotFound {
        /// The requested capability.
        capability: CapabilityId,
    },
    /// Entries whose subsystem had been dropped were removed.
    Pruned {
        /// How many entries were removed.
        count: usize,
    },
}

/// Sends `event` if a channel is attached.
pub(crate) fn emit(events: Option<&flume::Sender<RegistryEvent>>, event: RegistryEvent) {
    if let Some(sender) = events {
        if sender.send(event).is_err() {
            log::trace!("Registry event dropped: receiver disconnected.");
        }
    }
}

/// Manages a generic, thread-safe event channel.
///
/// Generic over the event type `T`; the registries publish
/// [`RegistryEvent`]s through it.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Attempts to send an event, logging an error if the receiver is disconnected.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    /// Hand this to the registries that should report into this bus.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Takes every event currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
