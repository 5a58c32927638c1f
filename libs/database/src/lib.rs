//! Connection plumbing shared by the worker host and services.
//!
//! - `redis`: broker connection (`ConnectionManager`) with startup retry
//! - `postgres`: sea-orm connection pool with startup retry
//! - `common`: the retry/backoff helper both connectors use

pub mod common;
pub mod postgres;
pub mod redis;
