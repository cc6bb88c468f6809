//! Process-level wiring: logging, runtime and the PostgreSQL harness.

use pgbridge_core::logging::{init_logging, LogConfig};
use pgbridge_core::{Harness, Invocation, InvocationArgs, TargetError};

/// Run one invocation to completion.
///
/// Configuration and I/O bindings are resolved before logging starts, so
/// their errors surface on stderr through the caller.
pub fn run(args: &InvocationArgs) -> Result<(), TargetError> {
    let mut invocation = Invocation::prepare(args)?;
    let _logging_guard = init_logging(LogConfig::from_target(invocation.config()));

    tracing::info!(
        invocation_id = %invocation.id(),
        target = %invocation.config().display_url(),
        test_mode = invocation.is_test_mode(),
        "Starting pgbridge"
    );

    // One exclusive connection, so a single-threaded runtime is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TargetError::internal(format!("Failed to start async runtime: {e}")))?;

    runtime.block_on(Harness::postgres().execute(&mut invocation))
}
