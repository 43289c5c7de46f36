//! Per-tick physics event drain
//!
//! rapier reports events through an `EventHandler` during the step; the sink
//! buffers them so the simulation loop can consume exactly one batch per
//! tick, after the step returns.

use std::sync::Mutex;

use rapier3d::prelude::*;

/// One engine-reported event, still expressed as a raw collider pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawContact {
    /// Collision started (sensor entries and blocker clips)
    Started(ColliderHandle, ColliderHandle),
    /// Contact force above the collider's configured threshold
    Force(ColliderHandle, ColliderHandle, f32),
}

impl RawContact {
    pub fn pair(&self) -> (ColliderHandle, ColliderHandle) {
        match *self {
            RawContact::Started(a, b) => (a, b),
            RawContact::Force(a, b, _) => (a, b),
        }
    }
}

/// Buffers one tick's worth of events. Collision-stop events carry no
/// gameplay meaning here and are dropped at the source.
#[derive(Default)]
pub struct EventSink {
    events: Mutex<Vec<RawContact>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the buffered batch, leaving the sink empty.
    pub fn drain(&self) -> Vec<RawContact> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }

    fn push(&self, contact: RawContact) {
        if let Ok(mut events) = self.events.lock() {
            events.push(contact);
        }
    }
}

impl EventHandler for EventSink {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            self.push(RawContact::Started(a, b));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        total_force_magnitude: Real,
    ) {
        self.push(RawContact::Force(
            contact_pair.collider1,
            contact_pair.collider2,
            total_force_magnitude,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_sink() {
        let sink = EventSink::new();
        sink.push(RawContact::Started(
            ColliderHandle::invalid(),
            ColliderHandle::invalid(),
        ));
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.drain().is_empty());
    }
}
