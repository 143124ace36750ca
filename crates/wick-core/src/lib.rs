// ABOUTME: Dispatch engine for wick: session pool, repeated operations, rendering and lifecycle.
// ABOUTME: Everything runs through one bounded worker pool and reports failures as flat aggregates.

pub mod args;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod operations;
pub mod pool;
pub mod render;
pub mod session_pool;

// Argument coercion
pub use args::{coerce, coerce_dict, coerce_list, parse_key_value};

// Dispatcher
pub use dispatcher::{AggregatedResult, OperationRequest};

// Error types
pub use error::{AggregateError, EstablishError, FormatError, OperationError};

// Lifecycle
pub use lifecycle::{run_until_shutdown, supervise, wait_for_shutdown, ShutdownCause, Termination};

// Command drivers
pub use operations::{across_sessions, CallOutput, RegisterRequest, INVOKE_LIMIT_GRACE};

// Worker pool
pub use pool::fan_out;

// Rendering
pub use render::{dump_raw, render, render_progress};

// Session pool
pub use session_pool::{close_sessions, establish, preflight};
