//! REST API server: routes, authentication, result cache, DTOs, and OpenAPI documentation.

pub mod auth;
pub mod cache;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
