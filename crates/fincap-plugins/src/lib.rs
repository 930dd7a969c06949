//! fincap Plugins - plugin registry and dynamic tool discovery.
//!
//! A plugin is a named capability provider that contributes tools to the
//! advisor. Two kinds exist:
//!
//! - **Native** plugins are compiled into the binary and registered in a
//!   [`NativeCatalog`]. [`EchoPlugin`] and [`CompliancePlugin`] ship by
//!   default.
//! - **Protocol adapters** expose one remote tool category (for example
//!   `market_data`) served through the shared [`fincap_mcp::RemoteClient`].
//!   Their tools are synchronous closures that cross into async code via
//!   the [`RuntimeBridge`].
//!
//! The [`PluginRegistry`] owns the records and the lifecycle; the
//! [`PluginManager`] serializes operator requests and keeps
//! [`ToolConsumer`]s current.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fincap_mcp::{RemoteClient, SimulatedToolServer};
//! use fincap_plugins::{ConfigStore, PluginRegistry};
//!
//! # async fn example() -> fincap_plugins::PluginResult<()> {
//! let client = Arc::new(RemoteClient::new(Arc::new(SimulatedToolServer::new())));
//! let store = Arc::new(ConfigStore::in_memory().await?);
//! let registry = PluginRegistry::new(client, store);
//! registry.initialize_all().await;
//!
//! if let Some(tool) = registry.find_tool("get_stock_quote").await {
//!     println!("{}", tool.invoke("How is $AAPL doing?")?);
//! }
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapter;
pub mod bridge;
pub mod builtin;
pub mod config_store;
pub mod consumer;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod native;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod synthesis;
pub mod tool;

pub use adapter::ProtocolAdapterProvider;
pub use bridge::{InvocationBridge, RuntimeBridge};
pub use builtin::{CompliancePlugin, EchoPlugin};
pub use config_store::ConfigStore;
pub use consumer::{ToolBelt, ToolConsumer, refresh_consumer};
pub use discovery::{Candidate, CandidateKind, PluginManifest};
pub use error::{PluginError, PluginResult};
pub use manager::{ManageAction, ManageError, ManageRequest, ManageResponse, ManageResult, PluginManager};
pub use native::{NativeCatalog, NativeFactory};
pub use plugin::{
    ConfigDocument, PluginCategory, PluginMetadata, PluginRecord, PluginStatus, PluginSummary,
    UnknownCategory,
};
pub use provider::CapabilityProvider;
pub use registry::{PluginRegistry, RegistryStats};
pub use tool::{Tool, ToolInput};
