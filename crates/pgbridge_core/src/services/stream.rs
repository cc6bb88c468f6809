//! Stream delegation.
//!
//! Hands the invocation's input and the built loader to the stream engine.
//! Message contents are never inspected here and collaborator errors are
//! returned as-is.

use crate::error::TargetError;
use crate::models::TargetConfig;
use crate::services::engine::StreamEngine;
use crate::services::io::{InputSource, IoContext};
use crate::services::loader::WarehouseLoader;

/// Line written to the output after a successful run.
pub const FINISHED_MARKER: &str = "finished";

/// Run the engine over the context's input, then write [`FINISHED_MARKER`].
pub async fn delegate(
    engine: &dyn StreamEngine,
    loader: &mut dyn WarehouseLoader,
    config: &TargetConfig,
    io: &mut IoContext,
) -> Result<(), TargetError> {
    let (input, output) = io.split();
    match input {
        InputSource::Reader(reader) => {
            tracing::debug!("Delegating explicit input stream");
            engine.process(reader.as_mut(), output, loader, config).await?;
        }
        InputSource::Stdin => {
            tracing::debug!("Delegating standard input");
            engine.process_stdin(output, loader, config).await?;
        }
    }

    io.write_line(FINISHED_MARKER)?;
    tracing::info!("Stream delegation finished");
    Ok(())
}
