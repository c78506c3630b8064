//! Domain Layer

pub mod intent;
