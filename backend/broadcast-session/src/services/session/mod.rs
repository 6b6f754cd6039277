//! Session Controller: owns one broadcast, merges remote results, channel events,
//! connectivity and timers into the state published to observers

mod controller;
mod handle;
mod publisher;

pub use controller::SessionController;
pub use handle::SessionHandle;
pub use publisher::{SessionObservers, SessionPublisher};
