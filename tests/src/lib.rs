//! # Aerie Test Suite
//!
//! Cross-crate tests and benchmarks.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs      # Scriptable sources and modules
//! │   └── integration/     # End-to-end scenarios through the Nest
//! └── benches/             # Criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p aerie-tests
//! cargo test -p aerie-tests integration::scenarios
//! cargo bench -p aerie-tests
//! ```

pub mod fixtures;
pub mod integration;
