//! fincap Test - shared test utilities.
//!
//! Add to a crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! fincap-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fincap_test::MockToolServer;
//!
//! let server = Arc::new(
//!     MockToolServer::new()
//!         .with_tool("market_data", "get_stock_quote")
//!         .with_response("get_stock_quote", serde_json::json!({"price": 1.0})),
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod harness;
pub mod mocks;

pub use harness::*;
pub use mocks::*;
