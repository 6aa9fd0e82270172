//! Background dispatch of storage jobs.
//!
//! # Responsibility
//! - Run scan/list/load/save/create jobs off the UI thread on a fixed set of
//!   worker threads fed by one job queue.
//! - Deliver results to a single-threaded consumer through a channel that is
//!   polled once per frame.
//!
//! # Invariants
//! - The number of worker threads is fixed at construction; submitting more
//!   jobs queues them instead of spawning threads.
//! - Every submitted job yields exactly one `Completion`, unless cancelled.
//! - Cancelled requests still run to completion; only their result is
//!   dropped on delivery.
//! - Jobs on distinct notes run concurrently; the backend's atomic replace
//!   keeps same-note saves and loads from interleaving.
//! - Dropping the loader closes the queue and joins the workers after they
//!   finish the jobs already queued.

use crate::error::{NoteError, NoteResult};
use crate::model::category::NoteHandle;
use crate::model::note::MarkdownNote;
use crate::repo::fs_backend::NoteBackend;
use log::{debug, error};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Worker threads started by `BackgroundLoader::new`.
pub const DEFAULT_WORKERS: usize = 2;

/// Identifier of one submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage job to run in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Rescan,
    ListNotes { category: String },
    LoadNote { category: String, index: usize },
    SaveNote {
        category: String,
        index: usize,
        text: String,
    },
    CreateNote { category: String, text: String },
}

impl Job {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Rescan => "rescan",
            Self::ListNotes { .. } => "list_notes",
            Self::LoadNote { .. } => "load_note",
            Self::SaveNote { .. } => "save_note",
            Self::CreateNote { .. } => "create_note",
        }
    }
}

/// Successful job output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Rescanned { categories: usize },
    Notes(Vec<NoteHandle>),
    Note(MarkdownNote),
    Saved,
    Created(MarkdownNote),
}

/// Result of one job delivered to the consumer.
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub job: &'static str,
    pub result: NoteResult<JobOutput>,
}

struct Envelope {
    id: RequestId,
    job: Job,
}

type JobQueue = Arc<Mutex<Receiver<Envelope>>>;

/// Dispatches jobs to a fixed worker pool and collects their completions.
pub struct BackgroundLoader<B> {
    backend: Arc<B>,
    jobs: Option<Sender<Envelope>>,
    workers: Vec<JoinHandle<()>>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    next_id: u64,
    in_flight: HashSet<RequestId>,
    cancelled: HashSet<RequestId>,
}

impl<B> BackgroundLoader<B>
where
    B: NoteBackend + Send + Sync + 'static,
{
    /// Starts `DEFAULT_WORKERS` worker threads.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_workers(backend, DEFAULT_WORKERS)
    }

    /// Starts `count` worker threads (at least one).
    ///
    /// A worker that fails to spawn is logged and skipped; with no worker
    /// running, every submitted job completes immediately with an error.
    pub fn with_workers(backend: Arc<B>, count: usize) -> Self {
        let (sender, receiver) = mpsc::channel();
        let (jobs, queue) = mpsc::channel::<Envelope>();
        let queue: JobQueue = Arc::new(Mutex::new(queue));

        let workers = (0..count.max(1))
            .filter_map(|slot| {
                let spawned = std::thread::Builder::new()
                    .name(format!("notecase-worker-{slot}"))
                    .spawn({
                        let backend = Arc::clone(&backend);
                        let queue = Arc::clone(&queue);
                        let sender = sender.clone();
                        move || run_worker(backend.as_ref(), &queue, &sender)
                    });
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        error!(
                            "event=worker_spawn module=service status=error slot={slot} error={err}"
                        );
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        Self {
            backend,
            jobs: Some(jobs),
            workers,
            sender,
            receiver,
            next_id: 0,
            in_flight: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Number of running worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job` for the worker pool.
    pub fn submit(&mut self, job: Job) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.in_flight.insert(id);

        let kind = job.kind_name();
        let queued = match self.jobs.as_ref() {
            Some(jobs) if !self.workers.is_empty() => jobs.send(Envelope { id, job }).is_ok(),
            _ => false,
        };
        if !queued {
            error!(
                "event=worker_job module=service status=error job={kind} request={id} error_code=no_worker"
            );
            let _ = self.sender.send(Completion {
                id,
                job: kind,
                result: Err(NoteError::io(
                    PathBuf::new(),
                    std::io::Error::new(std::io::ErrorKind::Other, "no background worker running"),
                )),
            });
        }
        id
    }

    pub fn request_rescan(&mut self) -> RequestId {
        self.submit(Job::Rescan)
    }

    pub fn request_notes(&mut self, category: impl Into<String>) -> RequestId {
        self.submit(Job::ListNotes {
            category: category.into(),
        })
    }

    pub fn request_load(&mut self, category: impl Into<String>, index: usize) -> RequestId {
        self.submit(Job::LoadNote {
            category: category.into(),
            index,
        })
    }

    pub fn request_save(
        &mut self,
        category: impl Into<String>,
        index: usize,
        text: impl Into<String>,
    ) -> RequestId {
        self.submit(Job::SaveNote {
            category: category.into(),
            index,
            text: text.into(),
        })
    }

    /// Drops the result of `id` when it arrives. Returns `false` when `id`
    /// is not in flight.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        if self.in_flight.contains(&id) {
            self.cancelled.insert(id)
        } else {
            false
        }
    }

    /// Number of submitted jobs whose completion was not delivered yet.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns every completion available right now without blocking.
    pub fn poll(&mut self) -> Vec<Completion> {
        let mut ready = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            if let Some(completion) = self.accept(completion) {
                ready.push(completion);
            }
        }
        ready
    }

    /// Blocks up to `timeout` for the next non-cancelled completion.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completion> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    if let Some(completion) = self.accept(completion) {
                        return Some(completion);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    fn accept(&mut self, completion: Completion) -> Option<Completion> {
        self.in_flight.remove(&completion.id);
        if self.cancelled.remove(&completion.id) {
            debug!(
                "event=worker_job module=service status=cancelled job={} request={}",
                completion.job, completion.id
            );
            return None;
        }
        Some(completion)
    }
}

impl<B> Drop for BackgroundLoader<B> {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("event=worker_join module=service status=error error_code=worker_panicked");
            }
        }
    }
}

fn run_worker<B>(backend: &B, queue: &JobQueue, completions: &Sender<Completion>)
where
    B: NoteBackend + ?Sized,
{
    loop {
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(Envelope { id, job }) = next else {
            return;
        };

        let kind = job.kind_name();
        let started_at = Instant::now();
        let result = run_job(backend, job);
        debug!(
            "event=worker_job module=service status={} job={} request={} duration_ms={}",
            if result.is_ok() { "ok" } else { "error" },
            kind,
            id,
            started_at.elapsed().as_millis()
        );
        // The consumer may have gone away; nothing left to report to.
        let _ = completions.send(Completion {
            id,
            job: kind,
            result,
        });
    }
}

fn run_job<B>(backend: &B, job: Job) -> NoteResult<JobOutput>
where
    B: NoteBackend + ?Sized,
{
    match job {
        Job::Rescan => backend
            .rescan()
            .map(|categories| JobOutput::Rescanned { categories }),
        Job::ListNotes { category } => backend.list_notes(&category).map(JobOutput::Notes),
        Job::LoadNote { category, index } => {
            backend.load_note(&category, index).map(JobOutput::Note)
        }
        Job::SaveNote {
            category,
            index,
            text,
        } => backend
            .save_note(&category, index, &text)
            .map(|()| JobOutput::Saved),
        Job::CreateNote { category, text } => {
            backend.create_note(&category, &text).map(JobOutput::Created)
        }
    }
}
