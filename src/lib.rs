//! # connect-sim - connected-vehicle REST API simulator
//!
//! A stand-in for a vehicle manufacturer's connected-vehicle cloud API, for
//! developing and testing client applications without real cars or real
//! credentials. Tokens, remote commands, vehicle state, charge schedules and
//! departure times are all simulated in memory.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with environment overrides
//! - `logging`: Structured logging and tracing
//! - `clock`: Injectable wall clock
//! - `token`: OAuth-style authorization code, access and refresh tokens
//! - `command`: Remote command lifecycle
//! - `vehicle`: Built-in fleet and wire types
//! - `state`: Mutable per-vehicle state and id resolution
//! - `schedule`: Charge schedules by location
//! - `departure`: Next departure over a simulated week
//! - `engine`: The `Simulator` tying the registries together
//! - `web`: HTTP routes and error bodies

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod clock;
pub mod command;
pub mod config;
pub mod departure;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod schedule;
pub mod state;
pub mod token;
pub mod vehicle;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use engine::Simulator;
pub use error::{Result, SimError};
