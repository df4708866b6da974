use crate::node::NodeId;
use crc32fast::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Per-process seed so ids minted by different runs don't collide.
static SESSION_SEED: LazyLock<String> =
    LazyLock::new(|| uuid::Uuid::new_v4().simple().to_string()[..8].to_string());

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Derive a stable id from a namespace and a key using CRC32.
///
/// Used for nodes whose identity is implied by the files they come from
/// (root, theme, code components, pages without an explicit id).
pub fn stable_id(namespace: &str, key: &str) -> NodeId {
    let mut hasher = Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    NodeId::new(format!("{}{:08x}", id_prefix(namespace), hasher.finalize()))
}

/// Mint a fresh, process-unique id.
pub fn fresh_id() -> NodeId {
    let count = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    NodeId::new(format!("{}{:x}", SESSION_SEED.as_str(), count))
}

fn id_prefix(namespace: &str) -> &'static str {
    match namespace {
        "app" => "app_",
        "page" => "pg_",
        "theme" => "th_",
        "codeComponent" => "cc_",
        _ => "n_",
    }
}
