// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Message, Recipient};
use std::fmt::Display;
use std::hash::Hash;

/// Trait that must be implemented by events used with EventBus
pub trait Event:
    Message<Result = ()> + Clone + Display + Send + Sync + Unpin + Sized + 'static
{
    type Id: Hash + Eq + Clone + Unpin + Send + Sync + Display;

    /// Payload for the Event
    type Data;

    fn event_type(&self) -> String;
    fn event_id(&self) -> Self::Id;
    fn get_data(&self) -> &Self::Data;
    fn into_data(self) -> Self::Data;
}

/// Trait for events that can carry an error report
pub trait ErrorEvent: Event {
    type ErrType;
    type Error;

    fn as_error(&self) -> Option<&Self::Error>;
}

/// An EventPublisher stamps event data and hands it to the bus
pub trait EventPublisher<E: Event> {
    fn publish(&self, data: impl Into<E::Data>);
}

/// Trait for dispatching errors to an inner event bus
pub trait ErrorDispatcher<E: ErrorEvent> {
    fn err(&self, err_type: E::ErrType, error: impl Display);
}

/// Trait to subscribe to events
pub trait EventSubscriber<E: Event> {
    /// Subscribe the recipient to events matching the given event type
    fn subscribe(&self, event_type: &str, recipient: Recipient<E>);
    /// Subscribe the recipient to events matching any of the given event types
    fn subscribe_all(&self, event_types: &[&str], recipient: Recipient<E>);
}
