//! Integration test suite.
//!
//! 1. Round trips through the relational layout
//! 2. Schema compilation
//! 3. Failure modes
//! 4. JSON object store

pub mod failure_tests;
pub mod helpers;
pub mod object_store_tests;
pub mod roundtrip_tests;
pub mod schema_tests;
