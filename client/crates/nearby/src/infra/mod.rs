//! Infrastructure Layer

pub mod dto;
