//! The worker pool: stateless physics workers that drain work packages from
//! an MPMC queue, integrate them, and hand the results back.
//!
//! Exclusive delivery comes from the channel itself: exactly one worker
//! receives any given package. Workers keep no state between packages; every
//! package adds its bodies to the worker's integrator, steps, reads back, and
//! removes them again.

#[cfg(test)]
mod tests;

use std::thread::JoinHandle;

use azrael_log::{debug, error};
use azrael_physics::Integrator;
use azrael_types::prelude::{WorkPackage, WorkResult};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Builds one integrator instance per worker.
pub type IntegratorFactory = Box<dyn Fn() -> Box<dyn Integrator> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    /// Rebuild the worker's integrator after this many packages. `None`
    /// keeps one instance for the worker's lifetime.
    pub recycle_after: Option<u64>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            recycle_after: None,
        }
    }
}

/// Handle to a running pool. Dropping it closes the work queue, which lets
/// the workers drain and exit.
pub struct WorkerPool {
    work_tx: Sender<WorkPackage>,
    result_rx: Receiver<WorkResult>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig, factory: IntegratorFactory) -> Self {
        assert!(config.workers > 0, "worker pool needs at least one worker");

        let (work_tx, work_rx) = unbounded::<WorkPackage>();
        let (result_tx, result_rx) = unbounded::<WorkResult>();
        let factory = std::sync::Arc::new(factory);

        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let factory = factory.clone();
            let recycle_after = config.recycle_after;
            handles.push(
                std::thread::Builder::new()
                    .name(format!("azrael-worker-{worker_id}"))
                    .spawn(move || worker_loop(worker_id, work_rx, result_tx, &factory, recycle_after))
                    .expect("unable to spawn worker thread"),
            );
        }

        Self {
            work_tx,
            result_rx,
            handles,
        }
    }

    /// Queues a package for exactly one worker.
    pub fn submit(&self, package: WorkPackage) {
        // Receivers only disappear on shutdown; a failed send means the pool
        // is already gone and the package can be dropped.
        let _ = self.work_tx.send(package);
    }

    /// The channel on which finished packages arrive.
    pub fn results(&self) -> &Receiver<WorkResult> {
        &self.result_rx
    }

    /// Closes the queue and joins all workers.
    pub fn shutdown(self) {
        drop(self.work_tx);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    work_rx: Receiver<WorkPackage>,
    result_tx: Sender<WorkResult>,
    factory: &IntegratorFactory,
    recycle_after: Option<u64>,
) {
    let mut integrator = factory();
    let mut processed: u64 = 0;

    while let Ok(package) = work_rx.recv() {
        let result = process_package(integrator.as_mut(), &package);
        processed += 1;
        if result_tx.send(result).is_err() {
            break;
        }

        // Workers may restart between packages; a recycled worker behaves
        // exactly like a fresh process with a new integrator.
        if let Some(limit) = recycle_after {
            if processed % limit == 0 {
                debug!("worker {worker_id}: recycling integrator after {processed} packages");
                integrator = factory();
            }
        }
    }
}

/// Runs one work package through an integrator. On any integrator error the
/// input bodies are returned unchanged with the `failed` flag set, which
/// Leonard treats as "no progress" for those ids.
pub fn process_package(integrator: &mut dyn Integrator, package: &WorkPackage) -> WorkResult {
    let mut added = Vec::with_capacity(package.bodies.len());
    let mut failed = false;

    for entry in &package.bodies {
        let outcome = integrator
            .add_body(entry.object_id, &entry.body)
            .and_then(|_| integrator.apply_force(entry.object_id, entry.force, entry.torque));
        match outcome {
            Ok(()) => added.push(entry.object_id),
            Err(err) => {
                error!(
                    "work package {}: could not stage body {}: {err}",
                    package.wpid, entry.object_id
                );
                failed = true;
                break;
            }
        }
    }

    if !failed {
        integrator.step(package.dt, package.max_substeps);
    }

    let contacts = if failed { Vec::new() } else { integrator.contacts() };

    let bodies = package
        .bodies
        .iter()
        .map(|entry| {
            let body = if failed {
                entry.body.clone()
            } else {
                integrator
                    .get_body(entry.object_id)
                    .unwrap_or_else(|_| entry.body.clone())
            };
            (entry.object_id, body)
        })
        .collect();

    for id in added {
        if let Err(err) = integrator.remove_body(id) {
            error!("work package {}: could not evict body {id}: {err}", package.wpid);
        }
    }

    WorkResult {
        wpid: package.wpid,
        token: package.token,
        bodies,
        contacts,
        failed,
    }
}
