//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running job intended to be spawned onto the
//! runtime. All jobs accept a [`tokio_util::sync::CancellationToken`] for
//! graceful shutdown.

pub mod session_cleanup;
