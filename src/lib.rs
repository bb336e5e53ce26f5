//! This crate provides a public schedule board, and a gateway to manage its schedules.
//!
//! Schedules are read from a backend (see the [`store`] module), either directly or through the HTTP [`client`] of a [`gateway`]. \
//! Raw rows go through the [`normalizer`], and the upcoming ones are kept in a [`Board`], which searches, filters and sorts them
//! (see the [`pipeline`] module).
//!
//! The [`gateway`] exposes list/create/update/delete routes over a store. Writes require a user with the admin role,
//! whose identity is checked against an identity provider. On the board side, the logged-in user is tracked by an [`IdentityHub`](identity::IdentityHub).

pub mod traits;

mod schedule;
pub use schedule::{ScheduleDraft, ScheduleId, ScheduleRecord, NO_PARTICIPANTS};
pub mod normalizer;
pub use normalizer::{KeyMapping, Normalizer};
pub mod pipeline;
pub mod board;
pub use board::Board;
pub mod identity;

pub mod client;
pub use client::Client;
pub mod store;
pub mod gateway;

pub mod config;
pub mod error;
pub mod mock_behaviour;
pub mod utils;
