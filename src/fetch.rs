//! The parallel fetch engine (spec §4.6): a bounded worker pool pulling
//! from a shared queue, atomic progress counters, bounded-rate progress
//! events, SHA-1/size verification with retry, and chunk-boundary
//! cancellation.
//!
//! Replaces the teacher's `async-fetcher`-backed `utils/download.rs`: the
//! semantics here (retry-on-mismatch count, write-then-rename, per-chunk
//! cancellation) are specified precisely enough that a direct
//! `reqwest` + `futures_util::stream::buffer_unordered` pool is simpler
//! than bending a third-party scheduler to fit. Grounded in the teacher's
//! own commented-out sketch of exactly this shape in
//! `Conic-Sections-Amethyst-Launcher-Core/src/utils/download.rs`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{DownloadFailure, Error, Result};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct FetchEntry {
    pub url: String,
    pub dest: PathBuf,
    pub size: Option<u64>,
    pub sha1: Option<String>,
    pub executable: bool,
}

/// How often progress events may be emitted, whichever comes first (spec
/// §4.6: "every ~100ms or every ~1% change").
const PROGRESS_MIN_INTERVAL: Duration = Duration::from_millis(100);
const PROGRESS_MIN_PERCENT_STEP: f64 = 1.0;

struct Progress {
    done_count: AtomicUsize,
    total_count: usize,
    done_bytes: AtomicU64,
    total_bytes: u64,
    last_emit: AsyncMutex<(Instant, f64)>,
}

pub struct FetchEngine {
    client: reqwest::Client,
    workers: usize,
    retries: usize,
    strict: bool,
    cancel: Arc<AtomicBool>,
}

impl FetchEngine {
    pub fn new(client: reqwest::Client, workers: usize, retries: usize, strict: bool) -> Self {
        Self {
            client,
            workers: workers.max(1),
            retries,
            strict,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A flag callers can set to request cancellation; observed at chunk
    /// boundaries inside the download loop.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run one install batch to completion. Entries have no ordering
    /// guarantee relative to each other; call this once per phase that
    /// needs a happens-before boundary (spec §4.6 "Ordering").
    pub async fn run(
        &self,
        entries: Vec<FetchEntry>,
        events: Option<UnboundedSender<Event>>,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let total_bytes: u64 = entries.iter().filter_map(|e| e.size).sum();
        let progress = Arc::new(Progress {
            done_count: AtomicUsize::new(0),
            total_count: entries.len(),
            done_bytes: AtomicU64::new(0),
            total_bytes,
            last_emit: AsyncMutex::new((Instant::now(), 0.0)),
        });

        let client = self.client.clone();
        let retries = self.retries;
        let strict = self.strict;
        let cancel = self.cancel.clone();

        let results: Vec<std::result::Result<(), DownloadFailure>> = stream::iter(entries)
            .map(|entry| {
                let client = client.clone();
                let progress = progress.clone();
                let events = events.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.load(Ordering::SeqCst) {
                        return Err(DownloadFailure {
                            url: entry.url.clone(),
                            dest: entry.dest.clone(),
                            cause: "cancelled".to_string(),
                        });
                    }
                    let outcome =
                        fetch_one_with_retry(&client, &entry, retries, strict, &cancel).await;
                    match &outcome {
                        Ok(bytes) => {
                            progress.done_count.fetch_add(1, Ordering::SeqCst);
                            progress.done_bytes.fetch_add(*bytes, Ordering::SeqCst);
                            emit_progress(&progress, &events).await;
                        }
                        Err(_) => {
                            progress.done_count.fetch_add(1, Ordering::SeqCst);
                            emit_progress(&progress, &events).await;
                        }
                    }
                    outcome.map(|_| ()).map_err(|cause| DownloadFailure {
                        url: entry.url.clone(),
                        dest: entry.dest.clone(),
                        cause,
                    })
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        if cancel.load(Ordering::SeqCst) {
            if let Some(tx) = &events {
                let _ = tx.send(Event::DownloadResourcesCancelled);
            }
            return Err(Error::DownloadCancelled);
        }

        let failures: Vec<DownloadFailure> = results.into_iter().filter_map(|r| r.err()).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            if let Some(tx) = &events {
                let _ = tx.send(Event::DownloadFailed {
                    failures: failures.clone(),
                });
            }
            let total = progress.total_count;
            Err(Error::Download { failures, total })
        }
    }
}

async fn emit_progress(progress: &Progress, events: &Option<UnboundedSender<Event>>) {
    let Some(tx) = events else { return };
    let done_count = progress.done_count.load(Ordering::SeqCst);
    let done_bytes = progress.done_bytes.load(Ordering::SeqCst);
    let percent = if progress.total_bytes > 0 {
        (done_bytes as f64 / progress.total_bytes as f64) * 100.0
    } else if progress.total_count > 0 {
        (done_count as f64 / progress.total_count as f64) * 100.0
    } else {
        100.0
    };

    let mut last = progress.last_emit.lock().await;
    let (last_time, last_percent) = *last;
    let is_final = done_count == progress.total_count;
    if !is_final
        && last_time.elapsed() < PROGRESS_MIN_INTERVAL
        && (percent - last_percent).abs() < PROGRESS_MIN_PERCENT_STEP
    {
        return;
    }
    *last = (Instant::now(), percent);
    drop(last);

    let _ = tx.send(Event::DownloadProgress {
        done_count,
        total_count: progress.total_count,
        done_bytes,
        total_bytes: progress.total_bytes,
    });
}

async fn fetch_one_with_retry(
    client: &reqwest::Client,
    entry: &FetchEntry,
    retries: usize,
    strict: bool,
    cancel: &Arc<AtomicBool>,
) -> std::result::Result<u64, String> {
    let mut last_err = String::new();
    for attempt in 0..=retries {
        match fetch_one(client, entry, strict, cancel).await {
            Ok(bytes) => return Ok(bytes),
            Err(FetchError::Cancelled) => return Err("cancelled".to_string()),
            Err(FetchError::Other(msg)) => {
                tracing::debug!(url = %entry.url, attempt, "download attempt failed: {msg}");
                last_err = msg;
            }
        }
    }
    Err(last_err)
}

enum FetchError {
    Cancelled,
    Other(String),
}

/// Spec §4.4 skip condition: a destination already satisfies an entry when
/// it exists and either strict checking is off or its size and SHA-1 both
/// already match. Checked before every attempt so a second `install` run
/// against a fully-populated directory performs zero writes.
async fn already_satisfied(entry: &FetchEntry, strict: bool) -> bool {
    let Ok(metadata) = tokio::fs::metadata(&entry.dest).await else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    if !strict {
        return true;
    }
    if let Some(expected_size) = entry.size {
        if metadata.len() != expected_size {
            return false;
        }
    }
    match &entry.sha1 {
        Some(expected) => match tokio::fs::read(&entry.dest).await {
            Ok(bytes) => {
                let mut hasher = Sha1::new();
                hasher.update(&bytes);
                to_hex(&hasher.finalize()) == *expected
            }
            Err(_) => false,
        },
        None => true,
    }
}

async fn fetch_one(
    client: &reqwest::Client,
    entry: &FetchEntry,
    strict: bool,
    cancel: &Arc<AtomicBool>,
) -> std::result::Result<u64, FetchError> {
    if already_satisfied(entry, strict).await {
        return Ok(entry.size.unwrap_or(0));
    }

    if let Some(parent) = entry.dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;
    }

    let response = client
        .get(&entry.url)
        .send()
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?
        .error_for_status()
        .map_err(|e| FetchError::Other(e.to_string()))?;

    let tmp_path = entry.dest.with_extension(format!(
        "{}.part",
        entry
            .dest
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("tmp")
    ));

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;

    let mut hasher = entry.sha1.as_ref().filter(|_| strict).map(|_| Sha1::new());
    let mut total: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel.load(Ordering::SeqCst) {
            drop(file);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(FetchError::Cancelled);
        }
        let chunk = chunk.map_err(|e| FetchError::Other(e.to_string()))?;
        if let Some(h) = hasher.as_mut() {
            h.update(&chunk);
        }
        total += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;
    }
    file.flush().await.map_err(|e| FetchError::Other(e.to_string()))?;
    drop(file);

    if let Some(expected_size) = entry.size {
        if total != expected_size {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(FetchError::Other(format!(
                "size mismatch: expected {expected_size}, got {total}"
            )));
        }
    }

    if let Some(hasher) = hasher {
        let digest = to_hex(&hasher.finalize());
        if let Some(expected) = &entry.sha1 {
            if &digest != expected {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(FetchError::Other(format!(
                    "sha1 mismatch: expected {expected}, got {digest}"
                )));
            }
        }
    }

    tokio::fs::rename(&tmp_path, &entry.dest)
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;

    #[cfg(unix)]
    if entry.executable {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&entry.dest)
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        tokio::fs::set_permissions(&entry.dest, perms)
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;
    }

    Ok(total)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }

    #[test]
    fn empty_batch_is_trivially_ok() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let engine = FetchEngine::new(reqwest::Client::new(), 4, 3, true);
        rt.block_on(async { engine.run(vec![], None).await }).unwrap();
    }

    #[test]
    fn already_satisfied_checks_size_and_sha1_under_strict() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        std::fs::write(&dest, b"hello").unwrap();

        let mut hasher = Sha1::new();
        hasher.update(b"hello");
        let sha1 = to_hex(&hasher.finalize());

        let matching = FetchEntry {
            url: "http://example.invalid/lib.jar".to_string(),
            dest: dest.clone(),
            size: Some(5),
            sha1: Some(sha1),
            executable: false,
        };
        let wrong_size = FetchEntry {
            size: Some(999),
            ..matching.clone()
        };
        let wrong_sha1 = FetchEntry {
            sha1: Some("0000000000000000000000000000000000000000".to_string()),
            ..matching.clone()
        };

        rt.block_on(async {
            assert!(already_satisfied(&matching, true).await);
            assert!(!already_satisfied(&wrong_size, true).await);
            assert!(!already_satisfied(&wrong_sha1, true).await);
            assert!(already_satisfied(&wrong_sha1, false).await);
        });
    }
}
