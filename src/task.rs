// src/task.rs

//! Background task plumbing: one shutdown flag shared by every listener and
//! loop, and a group that spawns named threads and joins them on shutdown.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Shared stop signal, checked once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A set of named OS threads sharing one [`ShutdownFlag`].
#[derive(Debug, Default)]
pub struct TaskGroup {
    shutdown: ShutdownFlag,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl TaskGroup {
    /// Creates an empty group with a fresh flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The flag every task of this group should watch.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Spawns `job` on a named thread.
    pub fn spawn<F>(&mut self, name: &str, job: F) -> io::Result<()>
    where
        F: FnOnce(ShutdownFlag) + Send + 'static,
    {
        let flag = self.shutdown.clone();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || job(flag))?;
        self.handles.push((name.to_owned(), handle));
        Ok(())
    }

    /// Adopts a thread spawned elsewhere.
    pub fn adopt(&mut self, name: &str, handle: JoinHandle<()>) {
        self.handles.push((name.to_owned(), handle));
    }

    /// Number of tasks still owned by the group.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the group owns no tasks.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Raises the flag and joins every task. Returns how many panicked.
    pub fn shutdown(mut self) -> usize {
        self.shutdown.trigger();
        let mut panicked = 0;
        for (name, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("task `{}` panicked", name);
                panicked += 1;
            } else {
                log::info!("task `{}` exited", name);
            }
        }
        panicked
    }
}
