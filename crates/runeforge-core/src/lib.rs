//! Runeforge Core — shared domain abstractions.
//!
//! Every procedure crate builds on the traits defined here: event-sourced
//! aggregates, commands, an injectable clock and random source, and the
//! persistence seams. No infrastructure lives in this crate.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
pub mod rng;
