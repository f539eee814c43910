//! # Ledgerline Testkit
//!
//! Testing utilities for Ledgerline.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: an in-memory world (storage, remote, session, network)
//!   that can build engines and simulate restarts
//! - **Generators**: Proptest strategies for records, patches and operations
//! - **Datasets**: sample financial defaults (categories, accounts, goals)
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use ledgerline::CollectionSpec;
//! use ledgerline_testkit::fixtures::{collection_name, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::manual();
//!     let engine = fixture.engine();
//!     let tags = engine
//!         .collection(CollectionSpec::new(collection_name("tags")))
//!         .unwrap();
//!     tags.flush().await.unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledgerline_core::Operation;
//! use ledgerline_testkit::generators::record;
//!
//! proptest! {
//!     #[test]
//!     fn insert_then_delete_leaves_nothing(r in record()) {
//!         let mut visible = Vec::new();
//!         Operation::Insert(r.clone()).apply_to(&mut visible);
//!         Operation::Delete(r.id.clone()).apply_to(&mut visible);
//!         prop_assert!(visible.is_empty());
//!     }
//! }
//! ```

pub mod datasets;
pub mod fixtures;
pub mod generators;

pub use datasets::{financial_collections, initial_accounts, initial_categories, initial_goals};
pub use fixtures::{collection_name, init_tracing, TestFixture};
pub use generators::{operation, patch, record, MutationStep};
