#![doc = "docs-server-core: reconciliation engine for docs-server."]

//! This crate mirrors versioned documentation from a remote source into an
//! in-memory registry and keeps it fresh by polling.
//!
//! # Layout
//! - [`contract`]: the [`Provider`](contract::Provider) trait every backend implements
//! - [`error`]: provider error classification (rate limited / not found / other)
//! - [`registry`]: the concurrency-safe `version -> files` table
//! - [`synchronise`]: the poll loop that reconciles registry and provider
//! - [`cache`]: proxy content cache
//! - [`service`]: read facade for serving code
//! - [`github`], [`local`]: concrete providers
//!
//! # Usage
//! Build a provider, share a [`Registry`](registry::Registry) between a
//! [`Reconciler`](synchronise::Reconciler) and a [`DocsService`](service::DocsService),
//! and spawn [`Reconciler::run`](synchronise::Reconciler::run).

pub mod cache;
pub mod config;
pub mod contract;
pub mod error;
pub mod github;
pub mod local;
pub mod registry;
pub mod service;
pub mod synchronise;
