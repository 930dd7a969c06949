//! MCP servers reached over stdio, one child process per category.
//!
//! The rmcp sessions are driven by a small runtime owned by this server
//! rather than by whichever runtime happened to call `connect`. Bridged tool
//! calls arrive from short-lived runtimes (a fresh current-thread runtime on
//! the caller, or one on a dedicated thread), and those runtimes are
//! dropped as soon as the call returns; a session spawned on one of them
//! would die with it. Every rmcp future is therefore spawned onto the owned
//! runtime and only its `JoinHandle` is awaited by the caller.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde_json::Value;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{McpError, McpResult};
use crate::server::ToolServer;
use crate::types::{RemoteTool, ToolResult};

type Service = RunningService<RoleClient, ()>;

struct Session {
    service: Service,
    peer: Peer<RoleClient>,
    tools: Vec<RemoteTool>,
}

/// Remote tool server backed by MCP child processes.
pub struct StdioToolServer {
    configs: BTreeMap<String, ServerConfig>,
    sessions: RwLock<HashMap<String, Session>>,
    runtime: Option<Runtime>,
    handle: Handle,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for StdioToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioToolServer")
            .field("categories", &self.configs.keys().collect::<Vec<_>>())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

impl StdioToolServer {
    /// Create a server for the given per-category configs.
    ///
    /// Nothing is spawned until [`ToolServer::connect`].
    ///
    /// # Errors
    ///
    /// Returns [`McpError::ConfigError`] if two configs claim the same
    /// category, or if the session runtime cannot be built.
    pub fn new(
        configs: impl IntoIterator<Item = ServerConfig>,
        shutdown_timeout: Duration,
    ) -> McpResult<Self> {
        let mut by_category = BTreeMap::new();
        for config in configs {
            let category = config.category.clone();
            if by_category.insert(category.clone(), config).is_some() {
                return Err(McpError::ConfigError(format!(
                    "duplicate server for category {category}"
                )));
            }
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("fincap-mcp-io")
            .enable_all()
            .build()
            .map_err(|e| McpError::ConfigError(format!("failed to build session runtime: {e}")))?;
        let handle = runtime.handle().clone();

        Ok(Self {
            configs: by_category,
            sessions: RwLock::new(HashMap::new()),
            runtime: Some(runtime),
            handle,
            shutdown_timeout,
        })
    }

    fn build_command(config: &ServerConfig) -> McpResult<tokio::process::Command> {
        let program = which::which(&config.command).map_err(|e| McpError::ServerStartFailed {
            name: config.category.clone(),
            reason: format!("cannot find binary {}: {e}", config.command),
        })?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(&config.args);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        Ok(cmd)
    }

    async fn open_session(config: ServerConfig) -> McpResult<Session> {
        let category = config.category.clone();
        let cmd = Self::build_command(&config)?;

        let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::ServerStartFailed {
            name: category.clone(),
            reason: e.to_string(),
        })?;

        let service = <() as ServiceExt<RoleClient>>::serve((), transport)
            .await
            .map_err(|e| {
                McpError::ConnectionFailed(format!("MCP handshake failed for {category}: {e}"))
            })?;

        let rmcp_tools = service.list_all_tools().await.map_err(|e| {
            McpError::ConnectionFailed(format!("failed to list tools for {category}: {e}"))
        })?;
        let tools: Vec<RemoteTool> = rmcp_tools
            .iter()
            .map(|t| RemoteTool::from_rmcp(t, &category))
            .collect();
        let peer = service.peer().clone();

        info!(
            category = %category,
            tool_count = tools.len(),
            "MCP connection established"
        );

        Ok(Session {
            service,
            peer,
            tools,
        })
    }

    async fn close_session(category: String, mut session: Session, timeout: Duration) {
        match session.service.close_with_timeout(timeout).await {
            Ok(Some(reason)) => {
                info!(category = %category, ?reason, "MCP session closed gracefully");
            },
            Ok(None) => {
                warn!(category = %category, "MCP session close timed out; dropping");
            },
            Err(e) => {
                error!(category = %category, error = %e, "MCP session close join error");
            },
        }
    }
}

impl Drop for StdioToolServer {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[async_trait]
impl ToolServer for StdioToolServer {
    fn kind(&self) -> &'static str {
        "stdio"
    }

    fn categories(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }

    async fn connect(&self) -> McpResult<()> {
        let mut opened = HashMap::new();
        for (category, config) in &self.configs {
            let session = self
                .handle
                .spawn(Self::open_session(config.clone()))
                .await
                .map_err(|e| McpError::ConnectionFailed(format!("session task failed: {e}")))?;

            match session {
                Ok(session) => {
                    opened.insert(category.clone(), session);
                },
                Err(e) => {
                    for (name, session) in opened {
                        let _ = self
                            .handle
                            .spawn(Self::close_session(name, session, self.shutdown_timeout))
                            .await;
                    }
                    return Err(e);
                },
            }
        }

        self.sessions.write().await.extend(opened);
        Ok(())
    }

    async fn list_tools(&self, category: &str) -> McpResult<Vec<RemoteTool>> {
        if !self.configs.contains_key(category) {
            return Err(McpError::ServerNotFound {
                category: category.to_string(),
            });
        }
        let sessions = self.sessions.read().await;
        let session = sessions.get(category).ok_or(McpError::NotConnected)?;
        Ok(session.tools.clone())
    }

    async fn call_tool(&self, category: &str, tool: &str, args: Value) -> McpResult<ToolResult> {
        let peer = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(category).ok_or_else(|| {
                if self.configs.contains_key(category) {
                    McpError::NotConnected
                } else {
                    McpError::ServerNotFound {
                        category: category.to_string(),
                    }
                }
            })?;
            if !session.tools.iter().any(|t| t.name == tool) {
                return Err(McpError::ToolNotFound {
                    category: category.to_string(),
                    tool: tool.to_string(),
                });
            }
            session.peer.clone()
        };

        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Some(map)
            },
        };
        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(tool.to_string()),
            arguments,
            task: None,
        };

        let call_failed = |reason: String| McpError::ToolCallFailed {
            category: category.to_string(),
            tool: tool.to_string(),
            reason,
        };

        let result = self
            .handle
            .spawn(async move { peer.call_tool(params).await })
            .await
            .map_err(|e| call_failed(format!("call task failed: {e}")))?
            .map_err(|e| call_failed(e.to_string()))?;

        Ok(ToolResult::from(result))
    }

    async fn shutdown(&self) -> McpResult<()> {
        let drained: Vec<(String, Session)> = self.sessions.write().await.drain().collect();
        for (category, session) in drained {
            let _ = self
                .handle
                .spawn(Self::close_session(category, session, self.shutdown_timeout))
                .await;
        }
        Ok(())
    }
}
