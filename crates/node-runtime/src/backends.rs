//! Backend construction from `BACKEND_URL` entries.
//!
//! The URL scheme selects the backend kind; several backends compose as
//! broadcast writes over first-match reads, giving a replicated store.

use anyhow::{bail, Context, Result};
use composition::{Broadcast, FirstMatch, ReadWritePair, Validated};
use remote_http::{HttpClientConfig, RemoteHttpStore};
use remote_ws::{RemoteWsStore, WsClientConfig};
use schema_registry::named_set;
use shared_types::Node;
use std::sync::Arc;
use storage_kv::{FileKv, KvStore};
use storage_memory::MemoryStore;
use tracing::info;

/// Namespace file-backed stores use inside their document.
const KV_NAMESPACE: &str = "lattice";

/// Build one backend from a URL.
pub async fn build_backend(url: &str) -> Result<Arc<dyn Node>> {
    let (scheme, rest) = url
        .split_once("://")
        .with_context(|| format!("backend url {:?} has no scheme", url))?;
    let node: Arc<dyn Node> = match scheme {
        "memory" => Arc::new(MemoryStore::new()),
        "file" => {
            if rest.is_empty() {
                bail!("file backend needs a path: file:///var/lib/lattice.json");
            }
            let backend = FileKv::open(rest)
                .with_context(|| format!("cannot open store file {:?}", rest))?;
            Arc::new(KvStore::new(backend, KV_NAMESPACE))
        }
        "http" | "https" => Arc::new(
            RemoteHttpStore::new(HttpClientConfig::new(url))
                .map_err(|e| anyhow::anyhow!("http backend: {}", e))?,
        ),
        "ws" | "wss" => Arc::new(
            RemoteWsStore::connect(WsClientConfig::new(url))
                .await
                .map_err(|e| anyhow::anyhow!("ws backend: {}", e))?,
        ),
        other => bail!("unknown backend scheme {:?} in {:?}", other, url),
    };
    info!(url, "backend ready");
    Ok(node)
}

/// Build the full stack: compose the backends, then apply the schema.
pub async fn build_stack(urls: &[String], schema_module: &str) -> Result<Arc<dyn Node>> {
    let mut peers = Vec::with_capacity(urls.len());
    for url in urls {
        peers.push(build_backend(url).await?);
    }

    let composed: Arc<dyn Node> = if peers.len() == 1 {
        peers.into_iter().next().expect("one peer")
    } else {
        Arc::new(ReadWritePair::new(
            Arc::new(Broadcast::new(peers.clone())),
            Arc::new(FirstMatch::new(peers)),
        ))
    };

    let registry = named_set(schema_module)
        .with_context(|| format!("unknown SCHEMA_MODULE {:?}", schema_module))?;
    if registry.is_empty() {
        // `none` disables validation entirely.
        return Ok(composed);
    }
    Ok(Arc::new(Validated::new(registry, composed)))
}
