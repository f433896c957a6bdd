//! Data types exchanged with the upstream platform
//!
//! This module contains the payloads the bridge receives and forwards.

pub mod event;
mod state;

pub use event::HassEvent;
pub use state::{domain_of, EntityState};
