//! Infrastructure Layer

pub mod dto;
pub mod http_api;
pub mod reservation_store;
