//! Domain Layer - Flow vocabulary and rules
//!
//! This layer contains:
//! - Domain entities (ExclusiveSession, FlowState)
//! - Domain value objects (FlowStage, FlowAction, ReservationId, ProximitySignal)
//! - Domain services (transition table)
//! - Repository traits (server API interface)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
