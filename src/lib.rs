//! Durable hotel booking: reserve a room now, take payment later.
//!
//! A booking process reserves the room and hands payment to a detached
//! payment process, which waits for the payment date (or an earlier check-in
//! signal) before charging the card.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod runtime;
