#![cfg_attr(not(test), forbid(unsafe_code))]

//! Shared models, configuration, and stream decoding for the `RelayChat` platform.

pub mod config;
pub mod models;
pub mod sse;
