// src/lifecycle/mod.rs
//! Client-observed application lifecycle: transition gates, the clock-in
//! window, signature checks and the view that ties them to the server.

pub mod clock_window;
pub mod rules;
pub mod signature;
pub mod view;

pub use clock_window::{Clock, ClockInWindow, SystemClock};
pub use rules::{available_actions, LifecycleAction};
pub use view::{
    ApplicationLifecycleView, ClockInOutcome, FixedLocation, LocationProvider, Tracked,
    TransitionOutcome,
};
