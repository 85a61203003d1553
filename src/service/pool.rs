//! A fixed-size pool of named worker threads.

use crossbeam_channel::{self, Receiver, Sender};
use error::Error;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted jobs on a fixed set of threads
///
/// Jobs are pulled from one shared queue in submission order, every worker
/// holding its own handle on the receiving end. A panicking job
/// is logged and the worker that ran it keeps serving. Once `shutdown` has
/// been called no more jobs are accepted; jobs already queued still run.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers named `<name>-<index>`. At least one worker is
    /// always spawned.
    pub fn new<S>(name: S, threads: usize) -> io::Result<WorkerPool>
    where
        S: Into<String>,
    {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let mut workers = Vec::new();
        for idx in 0..::std::cmp::max(1, threads) {
            let receiver = receiver.clone();
            let worker_name = format!("{}-{}", name, idx);
            let handle = thread::Builder::new()
                .name(worker_name.clone())
                .spawn(move || work(&worker_name, &receiver))?;
            workers.push(handle);
        }
        debug!("started {} with {} workers", name, workers.len());

        Ok(WorkerPool {
            name: name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// The pool's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `job` for execution. Fails with `Error::PoolClosed` after
    /// shutdown.
    pub fn execute<F>(&self, job: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match *sender {
            Some(ref sender) => sender.send(Box::new(job)).map_err(|_| Error::PoolClosed),
            None => Err(Error::PoolClosed),
        }
    }

    /// Stop accepting jobs, let the queue drain and join every worker.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let workers: Vec<thread::JoinHandle<()>> = self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for worker in workers {
            if worker.join().is_err() {
                error!("a worker of {} exited abnormally", self.name);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(name: &str, receiver: &Receiver<Job>) {
    // recv fails once every sender is gone and the queue is drained
    for job in receiver.iter() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("{} recovered from a panicking job", name);
        }
    }
    trace!("{} exiting", name);
}
