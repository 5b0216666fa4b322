use async_trait::async_trait;
use layout_protocol::{
    AssetDb, AssetInfo, AssetMeta, HostError, HostResult, NodeDump, NodeHandle, PropertyDump,
    SceneHost, SceneNode, SceneScript,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

const MAX_BRIDGE_LINE_BYTES: usize = if cfg!(test) { 4 * 1024 } else { 16 * 1024 * 1024 };

const SCENE: &str = "scene";
const ASSET_DB: &str = "asset-db";

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    channel: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Talks to the editor-side relay over newline-delimited JSON.
///
/// One request is in flight at a time. The socket is opened on first use and
/// dropped after any transport failure so the next request reconnects.
pub struct EditorBridge {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
    next_id: AtomicU64,
}

impl EditorBridge {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            conn: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    async fn request(&self, channel: &str, method: &str, args: Vec<Value>) -> HostResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_vec(&BridgeRequest {
            id,
            channel,
            method,
            args,
        })?;
        line.push(b'\n');

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(HostError::Transport("bridge connection unavailable".to_string()));
        };

        let exchanged = tokio::time::timeout(self.timeout, async {
            conn.writer.write_all(&line).await?;
            conn.writer.flush().await?;
            read_line_limited(&mut conn.reader, MAX_BRIDGE_LINE_BYTES).await
        })
        .await;

        let raw = match exchanged {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                *guard = None;
                return Err(HostError::Transport(format!("{method}: {e}")));
            }
            Err(_) => {
                *guard = None;
                return Err(HostError::Timeout(format!("{channel}/{method}")));
            }
        };

        let response: BridgeResponse = match serde_json::from_slice(&raw) {
            Ok(response) => response,
            Err(e) => {
                *guard = None;
                return Err(e.into());
            }
        };
        if response.id != id {
            *guard = None;
            return Err(HostError::Transport(format!(
                "{method}: response id {} does not match request {id}",
                response.id
            )));
        }
        drop(guard);

        if !response.ok {
            return Err(HostError::Rejected {
                method: method.to_string(),
                message: response.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        log::debug!("{channel}/{method} -> ok");
        Ok(response.result)
    }

    async fn connect(&self) -> HostResult<Connection> {
        log::debug!("Connecting to editor bridge at {}", self.addr);
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| HostError::Timeout(format!("connect {}", self.addr)))?
            .map_err(|e| HostError::Transport(format!("connect {}: {e}", self.addr)))?;
        let (read, write) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read),
            writer: write,
        })
    }
}

/// Read one `\n`-terminated line, keeping whatever follows it buffered.
async fn read_line_limited<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            if out.is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "bridge closed the connection",
                ));
            }
            break;
        }

        if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            if out.len() + pos > max_bytes {
                return Err(oversized(max_bytes));
            }
            out.extend_from_slice(&buf[..pos]);
            reader.consume(pos + 1);
            break;
        }

        let n = buf.len();
        if out.len() + n > max_bytes {
            return Err(oversized(max_bytes));
        }
        out.extend_from_slice(buf);
        reader.consume(n);
    }

    if out.last() == Some(&b'\r') {
        out.pop();
    }
    Ok(out)
}

fn oversized(max_bytes: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("bridge message exceeds {max_bytes} bytes"),
    )
}

/// Editor acknowledgements: `null` and `false` are refusals.
fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn optional<T: serde::de::DeserializeOwned>(value: Value) -> HostResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[async_trait]
impl SceneHost for EditorBridge {
    async fn query_node_tree(&self) -> HostResult<Option<SceneNode>> {
        optional(self.request(SCENE, "query-node-tree", Vec::new()).await?)
    }

    async fn query_node(&self, node: &NodeHandle) -> HostResult<Option<NodeDump>> {
        optional(self.request(SCENE, "query-node", vec![json!(node)]).await?)
    }

    async fn create_node(
        &self,
        parent: &NodeHandle,
        name: &str,
    ) -> HostResult<Option<NodeHandle>> {
        let result = self
            .request(SCENE, "create-node", vec![json!({ "parent": parent, "name": name })])
            .await?;
        Ok(result
            .as_str()
            .filter(|uuid| !uuid.is_empty())
            .map(NodeHandle::from))
    }

    async fn create_component(&self, node: &NodeHandle, component: &str) -> HostResult<()> {
        self.request(
            SCENE,
            "create-component",
            vec![json!({ "uuid": node, "component": component })],
        )
        .await?;
        Ok(())
    }

    async fn set_property(
        &self,
        node: &NodeHandle,
        path: &str,
        dump: PropertyDump,
    ) -> HostResult<bool> {
        let result = self
            .request(
                SCENE,
                "set-property",
                vec![json!({ "uuid": node, "path": path, "dump": dump })],
            )
            .await?;
        Ok(truthy(&result))
    }

    async fn move_node(
        &self,
        node: &NodeHandle,
        parent: &NodeHandle,
        index: usize,
    ) -> HostResult<bool> {
        let result = self
            .request(
                SCENE,
                "move-node",
                vec![json!({ "uuid": node, "parent": parent, "index": index })],
            )
            .await?;
        // The editor answers moves with nothing at all on success.
        Ok(result != Value::Bool(false))
    }

    async fn execute_scene_script(&self, script: SceneScript) -> HostResult<bool> {
        let result = self
            .request(SCENE, "execute-scene-script", vec![serde_json::to_value(&script)?])
            .await?;
        Ok(result != Value::Bool(false))
    }
}

#[async_trait]
impl AssetDb for EditorBridge {
    async fn refresh_asset(&self, db_path: &str) -> HostResult<()> {
        self.request(ASSET_DB, "refresh-asset", vec![json!(db_path)])
            .await?;
        Ok(())
    }

    async fn query_asset_info(&self, db_path: &str) -> HostResult<Option<AssetInfo>> {
        optional(
            self.request(ASSET_DB, "query-asset-info", vec![json!(db_path)])
                .await?,
        )
    }

    async fn query_asset_meta(&self, db_path: &str) -> HostResult<Option<AssetMeta>> {
        optional(
            self.request(ASSET_DB, "query-asset-meta", vec![json!(db_path)])
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    /// Accepts one connection and answers each request line with `reply`.
    async fn relay<F>(reply: F) -> (String, tokio::task::JoinHandle<Vec<Value>>)
    where
        F: Fn(&Value) -> Value + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut seen = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                let mut response = reply(&request).to_string();
                response.push('\n');
                write.write_all(response.as_bytes()).await.unwrap();
                seen.push(request);
            }
            seen
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn round_trips_requests_on_one_connection() {
        let (addr, relay) = relay(|request| {
            let result = match request["method"].as_str() {
                Some("query-node-tree") => json!({
                    "name": "scene",
                    "uuid": "root",
                    "children": [{ "name": "Canvas", "uuid": "canvas", "children": [] }]
                }),
                Some("create-node") => json!("new-node"),
                Some("set-property") => json!(true),
                _ => Value::Null,
            };
            json!({ "id": request["id"], "ok": true, "result": result })
        })
        .await;

        let bridge = EditorBridge::new(addr, Duration::from_secs(5));
        let tree = bridge.query_node_tree().await.unwrap().unwrap();
        assert_eq!(tree.children[0].handle, NodeHandle::from("canvas"));

        let created = bridge.create_node(&"canvas".into(), "A").await.unwrap();
        assert_eq!(created, Some(NodeHandle::from("new-node")));

        let set = bridge
            .set_property(&"new-node".into(), "position", PropertyDump::vec3(1.0, 2.0, 0.0))
            .await
            .unwrap();
        assert!(set);
        assert!(bridge
            .move_node(&"new-node".into(), &"canvas".into(), 0)
            .await
            .unwrap());

        drop(bridge);
        let seen = relay.await.unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1]["channel"], json!("scene"));
        assert_eq!(seen[1]["args"][0], json!({ "parent": "canvas", "name": "A" }));
        assert_eq!(seen[2]["args"][0]["dump"]["type"], json!("cc.Vec3"));
    }

    #[tokio::test]
    async fn editor_errors_become_rejections() {
        let (addr, _relay) = relay(|request| {
            json!({ "id": request["id"], "ok": false, "error": "no such asset" })
        })
        .await;

        let bridge = EditorBridge::new(addr, Duration::from_secs(5));
        let err = bridge.query_asset_info("db://assets/x.png").await.unwrap_err();
        match err {
            HostError::Rejected { method, message } => {
                assert_eq!(method, "query-asset-info");
                assert_eq!(message, "no such asset");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let bridge = EditorBridge::new(addr, Duration::from_secs(5));
        assert!(matches!(
            bridge.query_node_tree().await,
            Err(HostError::Transport(_)) | Err(HostError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn line_reader_keeps_following_lines_and_enforces_limit() {
        let data: &[u8] = b"{\"a\":1}\r\n{\"b\":2}\n";
        let mut reader = BufReader::new(data);
        assert_eq!(read_line_limited(&mut reader, 64).await.unwrap(), b"{\"a\":1}");
        assert_eq!(read_line_limited(&mut reader, 64).await.unwrap(), b"{\"b\":2}");
        assert!(read_line_limited(&mut reader, 64).await.is_err());

        let long = vec![b'x'; 100];
        let mut reader = BufReader::new(long.as_slice());
        assert!(read_line_limited(&mut reader, 10).await.is_err());
    }
}
