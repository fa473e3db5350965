//! gopls-backed oracle.
//!
//! The server is started lazily on the first query and kept for the whole
//! run. Answers are cached per interface position. A failed start is
//! remembered so later queries degrade immediately instead of retrying.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::framing::{read_message, write_message};
use super::{ImplementationOracle, ImplementorLocation, InterfaceQuery, OracleAnswer, OracleError};

/// Launch settings for gopls.
#[derive(Debug, Clone)]
pub struct GoplsOptions {
    /// Binary to run; `serve` is appended.
    pub command: String,
    /// Bound on every request, including `initialize`.
    pub timeout: Duration,
}

impl Default for GoplsOptions {
    fn default() -> Self {
        Self {
            command: "gopls".to_string(),
            timeout: Duration::from_millis(30_000),
        }
    }
}

/// LSP client for `gopls serve`.
pub struct GoplsClient {
    root: PathBuf,
    options: GoplsOptions,
    runtime: Option<Runtime>,
    session: Option<Session>,
    failure: Option<String>,
    cache: HashMap<InterfaceQuery, Vec<ImplementorLocation>>,
}

impl GoplsClient {
    /// Client for the module at `root`. Nothing is spawned until the first query.
    pub fn new(root: &Path, options: GoplsOptions) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            options,
            runtime: None,
            session: None,
            failure: None,
            cache: HashMap::new(),
        }
    }

    /// Whether the server was started and has not failed since.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Why the client stopped answering, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn ensure_started(&mut self) -> Result<(), String> {
        if let Some(reason) = &self.failure {
            return Err(reason.clone());
        }
        if self.session.is_some() {
            return Ok(());
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => return Err(self.fail(format!("failed to create runtime: {}", e))),
        };
        match runtime.block_on(Session::start(&self.root, &self.options)) {
            Ok(session) => {
                info!(command = %self.options.command, root = %self.root.display(), "gopls started");
                self.session = Some(session);
                self.runtime = Some(runtime);
                Ok(())
            }
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    fn fail(&mut self, reason: String) -> String {
        warn!(reason = %reason, "gopls unavailable, falling back to heuristic matching");
        self.failure = Some(reason.clone());
        self.session = None;
        reason
    }

    /// Send `shutdown`/`exit` and stop the server. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        let (Some(runtime), Some(mut session)) = (self.runtime.as_ref(), self.session.take()) else {
            return;
        };
        if let Err(e) = runtime.block_on(session.shutdown()) {
            debug!(error = %e, "gopls shutdown was not clean");
        }
    }
}

impl ImplementationOracle for GoplsClient {
    fn name(&self) -> &str {
        "gopls"
    }

    fn implementors(&mut self, query: &InterfaceQuery) -> OracleAnswer {
        if let Some(cached) = self.cache.get(query) {
            return OracleAnswer::Implementors(cached.clone());
        }
        if let Err(reason) = self.ensure_started() {
            return OracleAnswer::Unavailable(reason);
        }
        let (Some(runtime), Some(session)) = (self.runtime.as_ref(), self.session.as_mut()) else {
            return OracleAnswer::Unavailable("gopls is not running".to_string());
        };

        match runtime.block_on(session.implementation(&self.root, query)) {
            Ok(found) => {
                debug!(interface = %query.name, implementors = found.len(), "gopls answered");
                self.cache.insert(query.clone(), found.clone());
                OracleAnswer::Implementors(found)
            }
            // A timeout can abandon a frame half read, so anything short of a
            // well-formed server error leaves the stream unusable.
            Err(
                e @ (OracleError::Closed
                | OracleError::Io(_)
                | OracleError::Timeout { .. }
                | OracleError::Protocol(_)
                | OracleError::Json(_)),
            ) => OracleAnswer::Unavailable(self.fail(e.to_string())),
            Err(e) => {
                warn!(interface = %query.name, error = %e, "gopls query failed");
                OracleAnswer::Unavailable(e.to_string())
            }
        }
    }
}

impl Drop for GoplsClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Session {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: i64,
    opened: HashSet<String>,
    timeout: Duration,
}

impl Session {
    async fn start(root: &Path, options: &GoplsOptions) -> Result<Self, OracleError> {
        let mut child = Command::new(&options.command)
            .arg("serve")
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OracleError::Spawn {
                command: options.command.clone(),
                source,
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| OracleError::Protocol("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OracleError::Protocol("child stdout unavailable".to_string()))?;

        let mut session = Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
            opened: HashSet::new(),
            timeout: options.timeout,
        };

        let root_uri = file_uri(root);
        session
            .request(
                "initialize",
                json!({
                    "processId": std::process::id(),
                    "rootUri": root_uri,
                    "workspaceFolders": [{ "uri": root_uri, "name": "root" }],
                    "capabilities": {
                        "textDocument": { "implementation": { "linkSupport": false } }
                    }
                }),
            )
            .await?;
        session.notify("initialized", json!({})).await?;
        Ok(session)
    }

    async fn implementation(
        &mut self,
        root: &Path,
        query: &InterfaceQuery,
    ) -> Result<Vec<ImplementorLocation>, OracleError> {
        let path = root.join(&query.file);
        let uri = file_uri(&path);
        let text = std::fs::read_to_string(&path)?;

        if self.opened.insert(uri.clone()) {
            self.notify(
                "textDocument/didOpen",
                json!({
                    "textDocument": { "uri": uri, "languageId": "go", "version": 1, "text": text }
                }),
            )
            .await?;
        }

        let line = query.line.saturating_sub(1);
        let character = name_column(&text, line, &query.name, query.column);
        let result = self
            .request(
                "textDocument/implementation",
                json!({
                    "textDocument": { "uri": uri },
                    "position": { "line": line, "character": character }
                }),
            )
            .await?;
        Ok(parse_locations(&result, root))
    }

    async fn shutdown(&mut self) -> Result<(), OracleError> {
        self.request("shutdown", Value::Null).await?;
        self.notify("exit", Value::Null).await
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), OracleError> {
        write_message(
            &mut self.stdin,
            &json!({ "jsonrpc": "2.0", "method": method, "params": params }),
        )
        .await
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, OracleError> {
        let id = self.next_id;
        self.next_id += 1;
        write_message(
            &mut self.stdin,
            &json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }),
        )
        .await?;

        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.wait_for(id)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                method: method.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Read until the response to `id`. Server requests are answered with
    /// `null`; notifications and stale responses are skipped.
    async fn wait_for(&mut self, id: i64) -> Result<Value, OracleError> {
        loop {
            let message = read_message(&mut self.stdout).await?;
            let message_id = message.get("id");

            if let Some(method) = message.get("method").and_then(Value::as_str) {
                if let Some(request_id) = message_id {
                    debug!(method, "answering server request with null");
                    write_message(
                        &mut self.stdin,
                        &json!({ "jsonrpc": "2.0", "id": request_id, "result": null }),
                    )
                    .await?;
                }
                continue;
            }

            if message_id.and_then(Value::as_i64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                return Err(OracleError::Server {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
            return Ok(message.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// 0-indexed column of `name` on `line`: the known column, else the first
/// occurrence of the name after `type`, else the first occurrence.
fn name_column(text: &str, line: usize, name: &str, column: Option<usize>) -> usize {
    if let Some(column) = column {
        return column.saturating_sub(1);
    }
    let Some(source_line) = text.lines().nth(line) else {
        return 0;
    };
    let search_from = source_line.find("type ").map(|i| i + 5).unwrap_or(0);
    source_line[search_from..]
        .find(name)
        .map(|i| i + search_from)
        .or_else(|| source_line.find(name))
        .unwrap_or(0)
}

/// Extract module-relative locations from a `Location`, `Location[]` or
/// `LocationLink[]` result. Locations outside the module are dropped.
fn parse_locations(result: &Value, root: &Path) -> Vec<ImplementorLocation> {
    let items: Vec<&Value> = match result {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![result],
        _ => Vec::new(),
    };

    let mut locations = Vec::new();
    for item in items {
        let uri = item
            .get("uri")
            .or_else(|| item.get("targetUri"))
            .and_then(Value::as_str);
        let range = item
            .get("range")
            .or_else(|| item.get("targetSelectionRange"))
            .or_else(|| item.get("targetRange"));
        let line = range
            .and_then(|r| r.pointer("/start/line"))
            .and_then(Value::as_u64);
        let (Some(uri), Some(line)) = (uri, line) else {
            continue;
        };
        let Some(file) = module_relative(uri, root) else {
            continue;
        };
        let location = ImplementorLocation {
            file,
            line: line as usize + 1,
        };
        if !locations.contains(&location) {
            locations.push(location);
        }
    }
    locations
}

fn module_relative(uri: &str, root: &Path) -> Option<String> {
    let path = Path::new(uri.strip_prefix("file://")?);
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}
