//! # docwindow
//!
//! Hybrid document search over a two-table SQLite index, with
//! context-window expansion for categories where a lone chunk is not enough.
//!
//! The search algorithm, data model, and storage traits live in
//! [`docwindow_core`]. This crate supplies the concrete pieces around them:
//! configuration, the SQLite store, embedding providers, the filesystem
//! crawler, the indexing pipeline, and the `dw` CLI and HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────────────┐
//! │ Filesystem  │──▶│ Index pipeline       │──▶│ SQLite           │
//! │ crawler     │   │ chunk+metadata+embed │   │ documents/chunks │
//! └─────────────┘   └──────────────────────┘   └────────┬─────────┘
//!                                                       │
//!                               ┌───────────────────────┤
//!                               ▼                       ▼
//!                          ┌──────────┐           ┌──────────┐
//!                          │   CLI    │           │   HTTP   │
//!                          │   (dw)   │           │   API    │
//!                          └──────────┘           └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and rebuild |
//! | [`sqlite_store`] | SQLite `Store` / `IndexSink` |
//! | [`embedding`] | Concrete embedding providers |
//! | [`connector_fs`] | Filesystem crawler |
//! | [`ingest`] | Indexing pipeline |
//! | [`search`] | `dw search` |
//! | [`get`] | Document retrieval |
//! | [`stats`] | Index statistics |
//! | [`server`] | JSON HTTP API |

pub mod config;
pub mod connector_fs;
pub mod db;
pub mod embedding;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
