//! # docwindow core
//!
//! Backend-agnostic logic for docwindow: the two-table data model,
//! overlapping chunker, path metadata rules, keyword extraction and lexical
//! scoring, the embedding trait, the [`store::Store`] abstraction, and the
//! hybrid search algorithm with context-window expansion.
//!
//! This crate contains no SQL driver, HTTP client, or filesystem I/O. The
//! `docwindow` application crate supplies the SQLite store and the concrete
//! embedding providers.
//!
//! ```text
//! source file ─▶ chunk ─▶ metadata ─▶ embed ─▶ Store (documents + chunks)
//!                                                   │
//!                       query ─▶ HybridSearcher ◀───┘
//!                                  │ keywords → lexical → semantic → fuse
//!                                  ▼
//!                           ranked hits (+ context windows)
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod models;
pub mod prepare;
pub mod search;
pub mod store;
pub mod text;
