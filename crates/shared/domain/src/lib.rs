//! # Domain Models
//!
//! Pure types shared by the relay, the event client and the server shell:
//! lead records, the socket event contract, configuration and the slice
//! registry. Keep it lean: no I/O, networking, or heavy logic, just data and
//! simple helpers.

pub mod config;
pub mod constants;
pub mod events;
pub mod leads;
pub mod registry;
pub mod wire;
