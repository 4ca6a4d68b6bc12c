//! JSON document on disk with a single serialized writer.
//!
//! Every mutation is a job on an unbounded FIFO channel drained by one
//! writer task, so read-modify-write cycles never interleave. Each job
//! carries a oneshot reply so the caller learns whether its write landed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use zergling_core::{Result, ZerglingError};

use crate::cache::Cache;

type Transform = Box<dyn FnOnce(Value) -> Value + Send>;

struct WriteJob {
    /// Whether the transform needs the current file contents.
    read_current: bool,
    transform: Transform,
    reply: oneshot::Sender<Result<Value>>,
}

/// A JSON file owned by one writer task.
pub struct JsonDocument {
    path: PathBuf,
    writes: mpsc::UnboundedSender<WriteJob>,
}

impl JsonDocument {
    /// Open a document and spawn its writer. Must be called inside a tokio runtime.
    pub fn open(path: PathBuf) -> Self {
        Self::open_with_cache(path, None)
    }

    /// Like [`JsonDocument::open`], but every successful write also primes `cache`
    /// with the written value, in write order.
    pub fn open_with_cache(path: PathBuf, cache: Option<Arc<Cache<Value>>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path.clone(), rx, cache));
        Self { path, writes: tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file as it is on disk right now. A missing file reads as `{}`.
    pub async fn read(&self) -> Result<Value> {
        read_json(&self.path).await
    }

    /// Queue a read-modify-write. The job is queued when this is called,
    /// not when the returned future is first polled. Resolves with the
    /// value that was written.
    pub fn update<F>(&self, transform: F) -> impl Future<Output = Result<Value>> + Send + 'static
    where
        F: FnOnce(Value) -> Value + Send + 'static,
    {
        self.submit(true, Box::new(transform))
    }

    /// Queue a full replacement of the document.
    pub fn replace(&self, value: Value) -> impl Future<Output = Result<Value>> + Send + 'static {
        self.submit(false, Box::new(move |_| value))
    }

    fn submit(
        &self,
        read_current: bool,
        transform: Transform,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let job = WriteJob {
            read_current,
            transform,
            reply,
        };
        let sent = self.writes.send(job).is_ok();
        let path = self.path.clone();
        async move {
            if !sent {
                return Err(writer_gone(&path));
            }
            rx.await.map_err(|_| writer_gone(&path))?
        }
    }
}

fn writer_gone(path: &Path) -> ZerglingError {
    ZerglingError::Channel(format!("writer for {} has stopped", path.display()))
}

async fn run_writer(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
    cache: Option<Arc<Cache<Value>>>,
) {
    while let Some(job) = rx.recv().await {
        let result = apply_job(&path, job.read_current, job.transform).await;
        if let Err(e) = &result {
            tracing::warn!("⚠️ Write to {} failed: {e}", path.display());
        } else if let (Ok(value), Some(cache)) = (&result, &cache) {
            cache.prime(value.clone()).await;
        }
        // The caller may have given up waiting; the write still happened.
        let _ = job.reply.send(result);
    }
    tracing::debug!("Writer for {} stopped", path.display());
}

async fn apply_job(path: &Path, read_current: bool, transform: Transform) -> Result<Value> {
    let current = if read_current {
        read_json(path).await?
    } else {
        Value::Object(Map::new())
    };
    let next = transform(current);
    write_json(path, &next).await?;
    tracing::debug!("💾 Saved {}", path.display());
    Ok(next)
}

/// Read a JSON file. A missing file reads as `{}`.
pub async fn read_json(path: &Path) -> Result<Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Map::new())),
        Err(e) => Err(e.into()),
    }
}

/// Write a value as pretty JSON, creating parent directories.
pub async fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text).await?;
    Ok(())
}

/// Shallow merge: top-level keys of `partial` replace those of `current`.
/// When either side is not an object the result is `partial`.
pub fn shallow_merge(current: Value, partial: Value) -> Value {
    match (current, partial) {
        (Value::Object(mut current), Value::Object(partial)) => {
            current.extend(partial);
            Value::Object(current)
        }
        (_, partial) => partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::open(dir.path().join("nope.json"));
        assert_eq!(doc.read().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_update_merges_and_replace_discards() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::open(dir.path().join("doc.json"));

        doc.replace(json!({"a": 1, "b": 2})).await.unwrap();
        let merged = doc.update(|cur| shallow_merge(cur, json!({"b": 3}))).await.unwrap();
        assert_eq!(merged, json!({"a": 1, "b": 3}));

        doc.replace(json!({"c": 4})).await.unwrap();
        assert_eq!(doc.read().await.unwrap(), json!({"c": 4}));
    }

    #[tokio::test]
    async fn test_writes_apply_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Arc::new(JsonDocument::open(dir.path().join("order.json")));

        // Each update appends its index; submission order must be preserved.
        let mut pending = Vec::new();
        for i in 0..20 {
            let fut = doc.update(move |cur| {
                let mut seen = cur
                    .get("seen")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                seen.push(json!(i));
                json!({ "seen": seen })
            });
            pending.push(fut);
        }
        futures::future::join_all(pending).await;

        let expected: Vec<Value> = (0..20).map(|i| json!(i)).collect();
        assert_eq!(doc.read().await.unwrap()["seen"], Value::Array(expected));
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let doc = JsonDocument::open(path.clone());
        let err = doc.update(|cur| cur).await.unwrap_err();
        assert!(matches!(err, ZerglingError::Json(_)));
        // Replace does not need to read, so it recovers the file.
        doc.replace(json!({"ok": true})).await.unwrap();
        assert_eq!(doc.read().await.unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_shallow_merge_is_one_level() {
        let merged = shallow_merge(json!({"a": {"x": 1}, "b": 1}), json!({"a": {"y": 2}}));
        assert_eq!(merged, json!({"a": {"y": 2}, "b": 1}));
        assert_eq!(shallow_merge(json!([1]), json!({"a": 1})), json!({"a": 1}));
    }
}
