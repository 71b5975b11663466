//! # Broadcast Group
//!
//! A set of live members, each owning a bounded mailbox, with fan-out
//! delivery to all of them.
//!
//! ## Overview
//!
//! A [`BroadcastGroup`] maps a [`ConnectionId`] to the sending half of the
//! member's mailbox. [`BroadcastGroup::join`] hands back a [`Membership`]
//! holding the receiving half; dropping it leaves the group.
//!
//! Delivery is at-most-once: an event offered to a member whose mailbox is
//! full is dropped for that member only. Members joining later never see
//! earlier events.
//!
//! # Example
//!
//! ```rust
//! use leadhub_events::{BroadcastGroup, GroupError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), GroupError> {
//!     let group = BroadcastGroup::<String>::new("leads");
//!
//!     let mut alice = group.join("alice")?;
//!     let mut bob = group.join("bob")?;
//!     assert_eq!(group.broadcast("hello".to_owned()), 2);
//!
//!     assert_eq!(alice.recv().await.as_deref().map(String::as_str), Some("hello"));
//!     assert_eq!(bob.recv().await.as_deref().map(String::as_str), Some("hello"));
//!
//!     drop(bob);
//!     assert_eq!(group.len(), 1);
//!     Ok(())
//! }
//! ```

mod error;
mod group;
mod membership;

pub use error::{GroupError, GroupErrorExt};
pub use group::{BroadcastGroup, ConnectionId, DEFAULT_MAILBOX_CAPACITY, Event};
pub use membership::Membership;
