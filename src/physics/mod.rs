//! Physics layer
//!
//! Thin ownership wrapper around rapier3d: scene construction, the fixed
//! world step, and the collision/contact-force event drain. All gameplay
//! meaning of an event is assigned elsewhere (`sim::dispatch`).

pub mod events;
pub mod world;

pub use events::{EventSink, RawContact};
pub use world::{PhysicsWorld, WorldHandles};
