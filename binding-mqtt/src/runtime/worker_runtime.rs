//! Runtime helper for running blocking broker work on dedicated OS threads.

use crate::observability::events;
use std::io;
use std::thread;
use tracing::{debug, info, warn};

const COMPONENT: &str = "worker_runtime";

/// Handle to a named worker thread.
pub(crate) struct WorkerHandle {
    thread_name: String,
    join_handle: thread::JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

/// Spawns `run` on a thread called `thread_name`; `run` may block for the life of the process.
pub(crate) fn spawn_named_worker<F>(thread_name: &str, run: F) -> io::Result<WorkerHandle>
where
    F: FnOnce() + Send + 'static,
{
    let name_for_exit = thread_name.to_string();
    let spawn_res = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            run();
            info!(
                event = events::RUNTIME_EXITED,
                component = COMPONENT,
                worker_thread = name_for_exit.as_str(),
                "worker thread exited"
            );
        });

    match spawn_res {
        Ok(join_handle) => {
            debug!(
                event = events::RUNTIME_SPAWN_OK,
                component = COMPONENT,
                worker_thread = thread_name,
                "spawned worker thread"
            );
            Ok(WorkerHandle {
                thread_name: thread_name.to_string(),
                join_handle,
            })
        }
        Err(err) => {
            warn!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                worker_thread = thread_name,
                err = %err,
                "failed to spawn worker thread"
            );
            Err(err)
        }
    }
}
