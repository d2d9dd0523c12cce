//! Runeforge — in-memory persistence.
//!
//! Implements the `EventRepository` and `ActiveProcedureIndex` seams from
//! `runeforge-core` over process-local maps.

pub mod active_index;
pub mod memory_event_repository;

pub use active_index::InMemoryActiveIndex;
pub use memory_event_repository::InMemoryEventRepository;
