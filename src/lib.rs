//! Taskmarket: task lifecycle and wallet settlement for a campus task
//! marketplace.
//!
//! Users post paid tasks, other users accept and fulfil them, and money
//! moves between in-app wallets when a task completes or is cancelled with
//! a fee. This crate is the engine behind those flows; screens,
//! authentication, and payment-provider glue live elsewhere.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business rules with no infrastructure dependencies
//! - **Ports**: Async trait interfaces for storage and delivery
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`task`]: Task store, progress log, and the lifecycle orchestrator
//! - [`wallet`]: Balances and the append-only transaction ledger
//! - [`chat`]: One canonical thread per pair of users
//! - [`notification`]: Inbox storage and push fan-out
//! - [`outbox`]: Deferred side effects and their redelivery
//! - [`config`]: Fee, retry, and commit policies
//! - [`telemetry`]: Tracing subscriber bootstrap

pub mod chat;
pub mod config;
pub mod identity;
pub mod live;
pub mod notification;
pub mod outbox;
pub mod postgres;
pub mod retry;
pub mod task;
pub mod telemetry;
pub mod wallet;
