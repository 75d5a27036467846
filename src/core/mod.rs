//! Core simulation services
//!
//! Frame clock, timer, signal queue and scene transitions that the pooling
//! system plugs into.

mod events;
mod scene;
mod time;
mod timer;

pub use events::EventQueue;
pub use scene::{
    LoadMode, SceneCatalog, SceneChange, SceneError, SceneRequest, SubscriptionId, TransitionHub,
};
pub use time::{Time, seconds};
pub use timer::{Timer, TimerHandle};
