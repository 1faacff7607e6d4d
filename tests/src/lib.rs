//! # WX Callback Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Credentials, message bodies, call builders
//! └── integration/      # Cross-crate flows
//!     ├── flows.rs      # Plaintext dispatch lifecycle
//!     ├── envelope.rs   # Sealed handshake, messages and replies
//!     └── http.rs       # axum router in front of the dispatcher
//!
//! tests/benches/
//! └── callback_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p wx-tests
//!
//! # By category
//! cargo test -p wx-tests integration::envelope::
//!
//! # Benchmarks
//! cargo bench -p wx-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
