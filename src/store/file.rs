//! # File-Backed Fact Store
//!
//! One append-only file per log under `<data_dir>/logs/<name>.log`. Every
//! record is length-prefixed and checksummed, and a fact is durable once
//! the file has been synced past it.
//!
//! The file is the durable copy, not the working copy: on first touch a
//! log's records are parsed once into an in-memory image, and every read
//! afterwards is answered from that image. All file access for a log runs
//! under the log's lock, so a load never races an in-flight append and no
//! reader can observe, or disturb, a half-written record.
//!
//! Loading verifies that positions run 1..n with no gaps. A torn record
//! at the end of the file is the residue of an interrupted append: it was
//! never acknowledged, so the load drops it and truncates the file back
//! to the last whole record. A bad checksum anywhere else is corruption
//! and stops the log from serving.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::errors::{StoreError, StoreResult};
use super::record::{FactRecord, RecordError};
use super::FactStore;
use crate::db::fact::Fact;
use crate::db::is_valid_log_name;

/// In-memory image of one log's record file.
struct LogImage {
    /// Whether `facts` and `bytes` mirror the file.
    loaded: bool,
    /// Every recorded fact; positions are implied by order, 1-based.
    facts: Vec<Fact>,
    /// Byte length of the verified prefix of the file.
    bytes: u64,
}

impl LogImage {
    fn new() -> Self {
        Self {
            loaded: false,
            facts: Vec::new(),
            bytes: 0,
        }
    }
}

/// Durable store writing one record file per log, serving reads from
/// per-log images parsed once on first touch.
pub struct FileStore {
    logs_dir: PathBuf,
    logs: RwLock<HashMap<String, Arc<Mutex<LogImage>>>>,
}

impl FileStore {
    /// Open a store rooted at `data_dir`, creating directories as needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let logs_dir = data_dir.into().join("logs");
        std::fs::create_dir_all(&logs_dir)
            .map_err(|source| StoreError::io(format!("creating {}", logs_dir.display()), source))?;
        Ok(Self {
            logs_dir,
            logs: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the log files.
    pub fn logs_dir(&self) -> &PathBuf {
        &self.logs_dir
    }

    fn log_path(&self, log: &str) -> PathBuf {
        self.logs_dir.join(format!("{log}.log"))
    }

    /// Fetch the image slot for `log`, creating it on first touch.
    fn log_image(&self, log: &str) -> StoreResult<Arc<Mutex<LogImage>>> {
        if !is_valid_log_name(log) {
            return Err(StoreError::InvalidName {
                log: log.to_string(),
            });
        }
        {
            let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(image) = logs.get(log) {
                return Ok(Arc::clone(image));
            }
        }
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        let image = logs
            .entry(log.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LogImage::new())));
        Ok(Arc::clone(image))
    }

    /// Parse the record file of `log` into its image, verifying checksums
    /// and position contiguity, dropping a torn tail if one is found. A
    /// no-op once loaded. The caller holds the image lock, so the file is
    /// parsed at most once per process and never while an append to the
    /// log is in flight.
    async fn ensure_loaded(&self, log: &str, image: &mut LogImage) -> StoreResult<()> {
        if image.loaded {
            return Ok(());
        }
        let path = self.log_path(log);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                image.facts = Vec::new();
                image.bytes = 0;
                image.loaded = true;
                return Ok(());
            }
            Err(source) => return Err(StoreError::io(format!("log {log}"), source)),
        };

        let mut facts = Vec::new();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match FactRecord::deserialize(&bytes[offset..]) {
                Ok((record, consumed)) => {
                    let expected = facts.len() as u64 + 1;
                    if record.position != expected {
                        return Err(StoreError::corrupt(
                            log,
                            format!("position {} where {} expected", record.position, expected),
                        ));
                    }
                    facts.push(Fact::new(record.payload));
                    offset += consumed;
                }
                Err(RecordError::Truncated) => {
                    warn!(
                        log,
                        offset,
                        dropped = bytes.len() - offset,
                        "dropping torn record at end of log file"
                    );
                    self.truncate_to(log, &path, offset as u64).await?;
                    break;
                }
                Err(reason) => {
                    return Err(StoreError::corrupt(
                        log,
                        format!("at byte {offset}: {reason}"),
                    ));
                }
            }
        }

        image.bytes = offset as u64;
        image.facts = facts;
        image.loaded = true;
        debug!(log, facts = image.facts.len(), "log file loaded");
        Ok(())
    }

    async fn truncate_to(&self, log: &str, path: &PathBuf, len: u64) -> StoreResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        file.set_len(len)
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        file.sync_all()
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        debug!(log, len, "log file truncated to durable prefix");
        Ok(())
    }

    async fn write_record(&self, log: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.log_path(log);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        file.write_all(bytes)
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        file.sync_all()
            .await
            .map_err(|source| StoreError::io(format!("log {log}"), source))?;
        Ok(())
    }
}

#[async_trait]
impl FactStore for FileStore {
    async fn length(&self, log: &str) -> StoreResult<u64> {
        let handle = self.log_image(log)?;
        let mut image = handle.lock().await;
        self.ensure_loaded(log, &mut image).await?;
        Ok(image.facts.len() as u64)
    }

    async fn append(&self, log: &str, fact: &Fact) -> StoreResult<u64> {
        let handle = self.log_image(log)?;
        let mut image = handle.lock().await;
        self.ensure_loaded(log, &mut image).await?;

        let position = image.facts.len() as u64 + 1;
        let bytes = FactRecord::new(position, fact.as_str()).serialize();
        if let Err(source) = self.write_record(log, &bytes).await {
            // The failed write may have left part of the record behind.
            // Cut the file back to the acknowledged prefix; if even that
            // fails, force a re-parse on the next touch.
            let path = self.log_path(log);
            if self.truncate_to(log, &path, image.bytes).await.is_err() {
                image.loaded = false;
                image.facts = Vec::new();
                image.bytes = 0;
            }
            return Err(source);
        }

        image.bytes += bytes.len() as u64;
        image.facts.push(fact.clone());
        Ok(position)
    }

    async fn read_at(&self, log: &str, index: u64) -> StoreResult<Fact> {
        let handle = self.log_image(log)?;
        let mut image = handle.lock().await;
        self.ensure_loaded(log, &mut image).await?;
        index
            .checked_sub(1)
            .and_then(|slot| image.facts.get(slot as usize))
            .cloned()
            .ok_or(StoreError::MissingIndex {
                log: log.to_string(),
                index,
            })
    }

    async fn read_range(&self, log: &str, from: u64) -> StoreResult<Vec<Fact>> {
        let handle = self.log_image(log)?;
        let mut image = handle.lock().await;
        self.ensure_loaded(log, &mut image).await?;
        let skip = from.saturating_sub(1) as usize;
        Ok(image.facts.iter().skip(skip).cloned().collect())
    }
}
