//! Stream-processing engine boundary and the bundled line-delimited engine.
//!
//! The engine owns everything about the message stream: framing, buffering
//! per stream, flush policy and STATE acknowledgement. The harness only calls
//! [`StreamEngine::process`] or [`StreamEngine::process_stdin`].

use crate::error::TargetError;
use crate::models::{Message, RecordBatch, TargetConfig};
use crate::services::loader::WarehouseLoader;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};

/// Drives a loader from a structured message stream.
#[async_trait]
pub trait StreamEngine: Send + Sync {
    /// Process `input` into `loader`.
    async fn process(
        &self,
        input: &mut (dyn BufRead + Send),
        output: &mut (dyn Write + Send),
        loader: &mut dyn WarehouseLoader,
        config: &TargetConfig,
    ) -> Result<(), TargetError>;

    /// Default entry point: process the process's standard input.
    async fn process_stdin(
        &self,
        output: &mut (dyn Write + Send),
        loader: &mut dyn WarehouseLoader,
        config: &TargetConfig,
    ) -> Result<(), TargetError> {
        let mut input = BufReader::new(std::io::stdin());
        self.process(&mut input, output, loader, config).await
    }
}

/// Buffered records for one stream plus how many it has seen in total.
struct StreamBuffer {
    batch: RecordBatch,
    total_records: usize,
}

/// Counters reported when a stream finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: usize,
    pub records: usize,
    pub batches: usize,
    pub states: usize,
}

/// Engine for newline-delimited JSON messages (`SCHEMA`, `RECORD`, `STATE`,
/// `ACTIVATE_VERSION`).
///
/// Records are buffered per stream and flushed when a stream reaches
/// `max_batch_rows`, before every STATE is acknowledged, and at end of input.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingerEngine;

impl SingerEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    async fn flush(
        loader: &mut dyn WarehouseLoader,
        buffer: &mut StreamBuffer,
        stats: &mut StreamStats,
    ) -> Result<(), TargetError> {
        if buffer.batch.is_empty() {
            return Ok(());
        }
        let batch = buffer.batch.take();
        tracing::debug!(stream = %batch.stream, rows = batch.len(), "Flushing batch");
        loader.write_batch(&batch).await?;
        stats.batches += 1;
        Ok(())
    }

    async fn flush_all(
        loader: &mut dyn WarehouseLoader,
        streams: &mut BTreeMap<String, StreamBuffer>,
        stats: &mut StreamStats,
    ) -> Result<(), TargetError> {
        for buffer in streams.values_mut() {
            Self::flush(loader, buffer, stats).await?;
        }
        Ok(())
    }

    fn emit_state(
        output: &mut (dyn Write + Send),
        value: &Value,
        config: &TargetConfig,
    ) -> Result<(), TargetError> {
        if !config.state_support {
            return Ok(());
        }
        let line = serde_json::to_string(value)?;
        writeln!(output, "{line}")
            .and_then(|_| output.flush())
            .map_err(|e| TargetError::delegation_with_source("Failed to emit STATE", e))
    }
}

#[async_trait]
impl StreamEngine for SingerEngine {
    async fn process(
        &self,
        input: &mut (dyn BufRead + Send),
        output: &mut (dyn Write + Send),
        loader: &mut dyn WarehouseLoader,
        config: &TargetConfig,
    ) -> Result<(), TargetError> {
        let mut streams: BTreeMap<String, StreamBuffer> = BTreeMap::new();
        let mut stats = StreamStats::default();
        let mut line = String::new();

        loader.before_run().await?;

        loop {
            line.clear();
            let read = input.read_line(&mut line).map_err(|e| {
                TargetError::delegation_with_source(
                    format!("Failed to read input after line {}", stats.lines),
                    e,
                )
            })?;
            if read == 0 {
                break;
            }
            stats.lines += 1;
            let line_no = stats.lines;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let message: Message = serde_json::from_str(text).map_err(|e| {
                let message = format!("line {line_no}: invalid message: {e}");
                TargetError::delegation_with_source(message, e)
            })?;

            match message {
                Message::Schema { stream, schema, key_properties } => {
                    match streams.get_mut(&stream) {
                        Some(buffer) => {
                            let changed = buffer.batch.schema != schema
                                || buffer.batch.key_properties != key_properties;
                            if changed {
                                // Records already buffered belong to the old schema.
                                Self::flush(loader, buffer, &mut stats).await?;
                                buffer.batch.schema = schema;
                                buffer.batch.key_properties = key_properties;
                            }
                        }
                        None => {
                            tracing::debug!(stream = %stream, "Stream registered");
                            let batch = RecordBatch::new(stream.clone(), schema, key_properties);
                            streams.insert(stream, StreamBuffer { batch, total_records: 0 });
                        }
                    }
                }
                Message::Record { stream, record } => {
                    let buffer = streams.get_mut(&stream).ok_or_else(|| {
                        TargetError::delegation(format!(
                            "line {line_no}: RECORD for stream `{stream}` before its SCHEMA"
                        ))
                    })?;
                    buffer.batch.records.push(record);
                    buffer.total_records += 1;
                    stats.records += 1;
                    if buffer.batch.len() >= config.max_batch_rows {
                        Self::flush(loader, buffer, &mut stats).await?;
                    }
                }
                Message::State { value } => {
                    Self::flush_all(loader, &mut streams, &mut stats).await?;
                    Self::emit_state(output, &value, config)?;
                    stats.states += 1;
                }
                Message::ActivateVersion { stream, version } => {
                    tracing::debug!(stream = %stream, version, "Ignoring ACTIVATE_VERSION");
                }
            }
        }

        Self::flush_all(loader, &mut streams, &mut stats).await?;

        // Streams that saw no records are handed over as empty batches; the
        // loader decides what persisting them means (PostgresLoader skips them).
        if config.persist_empty_tables {
            for buffer in streams.values().filter(|b| b.total_records == 0) {
                loader.write_batch(&buffer.batch).await?;
            }
        }

        loader.after_run().await?;

        tracing::info!(
            lines = stats.lines,
            records = stats.records,
            batches = stats.batches,
            states = stats.states,
            streams = streams.len(),
            "Stream processed"
        );
        Ok(())
    }
}
