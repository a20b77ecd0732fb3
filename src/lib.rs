//! Aula: a self-hosted online course platform.
//!
//! Layering follows the hexagonal split used throughout the codebase:
//! `domain` holds entities and invariants, `application` holds services and
//! repository traits, `infra` holds the Postgres/HTTP/storage adapters,
//! `cache` holds the key-value cache system, and `presentation` holds the
//! askama views.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
