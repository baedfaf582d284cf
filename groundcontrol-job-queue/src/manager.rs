//! Job manager implementation.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use groundcontrol_model::{
    publish, Event, Hub, Job, JobFilter, JobMetrics, JobStatus, NodeRegistry,
};
use groundcontrol_relay::{paginate, to_id, Connection, ConnectionArgs, NodeType};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::JobQueueError;

/// Number of jobs allowed to run at the same time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 2;

type Work = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct QueuedWork {
    job_id: String,
    work: Work,
}

/// Job log plus counters, guarded by one lock.
#[derive(Debug, Default)]
struct JobQueueState {
    next_seq: u64,
    /// Job ids, newest first.
    order: VecDeque<String>,
    jobs: HashMap<String, Job>,
    metrics: JobMetrics,
}

impl JobQueueState {
    fn allocate_id(&mut self) -> String {
        self.next_seq += 1;
        to_id(NodeType::Job, [self.next_seq.to_string()])
    }

    fn insert(&mut self, job: Job) {
        self.order.push_front(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
        self.metrics.record_new();
    }

    fn iter_recent(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|id| self.jobs.get(id))
    }
}

/// Accepts work, runs it with bounded parallelism and publishes every
/// status change on the hub.
///
/// Submitting is synchronous. Nothing runs until [`JobManager::work`] is
/// driving the queue.
#[derive(Clone)]
pub struct JobManager {
    state: Arc<Mutex<JobQueueState>>,
    nodes: Arc<NodeRegistry>,
    hub: Hub,
    concurrency: usize,
    sender: mpsc::UnboundedSender<QueuedWork>,
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<QueuedWork>>>>,
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobManager")
            .field("state", &"<Mutex<JobQueueState>>")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl JobManager {
    pub fn new(nodes: Arc<NodeRegistry>, hub: Hub, concurrency: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(JobQueueState::default())),
            nodes,
            hub,
            concurrency: concurrency.max(1),
            sender,
            receiver: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[inline]
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    #[inline]
    pub fn nodes(&self) -> &Arc<NodeRegistry> {
        &self.nodes
    }

    fn lock(&self) -> MutexGuard<'_, JobQueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job acting on `owner_id` and queue `work` for execution.
    ///
    /// Returns the job as created (`QUEUED`). The outcome of `work` is only
    /// visible through later status changes.
    pub fn submit<F, Fut>(&self, name: impl Into<String>, owner_id: impl Into<String>, work: F) -> Job
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut state = self.lock();

        let id = state.allocate_id();
        let job = Job::new(id, name, owner_id);
        state.insert(job.clone());
        self.nodes.store(job.clone());

        publish(&self.hub, Event::JobUpserted(job.clone()));
        publish(&self.hub, Event::JobMetricsUpdated(state.metrics));

        let queued = QueuedWork {
            job_id: job.id.clone(),
            work: Box::new(move || work().boxed()),
        };
        if self.sender.send(queued).is_err() {
            warn!(job_id = %job.id, "job dispatcher has stopped, failing job");
            return self
                .apply_transition(&mut state, &job.id, JobStatus::Failed)
                .unwrap_or(job);
        }

        info!(job_id = %job.id, job_name = %job.name, owner_id = %job.owner_id, "job queued");
        job
    }

    /// Apply a status change and publish it. Returns the new snapshot.
    fn transition(&self, job_id: &str, status: JobStatus) -> Option<Job> {
        let mut state = self.lock();
        self.apply_transition(&mut state, job_id, status)
    }

    fn apply_transition(
        &self,
        state: &mut JobQueueState,
        job_id: &str,
        status: JobStatus,
    ) -> Option<Job> {
        let job = state.jobs.get_mut(job_id)?;
        let from = job.status;
        if !job.transition(status) {
            warn!(job_id, from = %from, to = %status, "ignoring illegal job transition");
            return None;
        }
        let snapshot = job.clone();
        state.metrics.record_transition(from, status);

        self.nodes.store(snapshot.clone());
        publish(&self.hub, Event::JobUpserted(snapshot.clone()));
        publish(&self.hub, Event::JobMetricsUpdated(state.metrics));

        debug!(job_id, status = %status, "job status changed");
        Some(snapshot)
    }

    async fn run(&self, queued: QueuedWork) {
        let QueuedWork { job_id, work } = queued;

        if self.transition(&job_id, JobStatus::Running).is_none() {
            return;
        }

        let outcome = AssertUnwindSafe(async move { work().await })
            .catch_unwind()
            .await;

        let status = match outcome {
            Ok(Ok(())) => {
                info!(job_id = %job_id, "job done");
                JobStatus::Done
            }
            Ok(Err(err)) => {
                warn!(job_id = %job_id, error = %format!("{err:#}"), "job failed");
                JobStatus::Failed
            }
            Err(panic) => {
                warn!(job_id = %job_id, panic = panic_message(panic.as_ref()), "job panicked");
                JobStatus::Failed
            }
        };

        self.transition(&job_id, status);
    }

    /// Drive the queue until `shutdown` is cancelled.
    ///
    /// Jobs are admitted in submission order, at most `concurrency` at a
    /// time. On shutdown, jobs already running are awaited, jobs still
    /// queued move to `FAILED`, and jobs submitted afterwards are created
    /// failed. Only one dispatcher may run per manager.
    pub async fn work(&self, shutdown: CancellationToken) -> Result<(), JobQueueError> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(JobQueueError::AlreadyRunning)?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut running = JoinSet::new();

        info!(concurrency = self.concurrency, "job dispatcher started");

        loop {
            while running.try_join_next().is_some() {}

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let queued = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                queued = receiver.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
            };

            let manager = self.clone();
            running.spawn(async move {
                manager.run(queued).await;
                drop(permit);
            });
        }

        // Nothing will run what is still queued. Closing first makes later
        // submissions fail straight away.
        receiver.close();
        let mut abandoned = 0usize;
        while let Ok(queued) = receiver.try_recv() {
            if self.transition(&queued.job_id, JobStatus::Failed).is_some() {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            warn!(abandoned, "failed jobs still queued at shutdown");
        }

        let in_flight = running.len();
        if in_flight > 0 {
            info!(in_flight, "waiting for running jobs before stopping");
        }
        while running.join_next().await.is_some() {}

        info!("job dispatcher stopped");
        Ok(())
    }

    /// Page through jobs matching `filter`, newest first.
    pub fn find(
        &self,
        filter: &JobFilter,
        args: &ConnectionArgs,
    ) -> Result<Connection<Job>, JobQueueError> {
        let jobs: Vec<Job> = {
            let state = self.lock();
            state
                .iter_recent()
                .filter(|job| filter.matches(job))
                .cloned()
                .collect()
        };
        Ok(paginate(&jobs, args, |job| job.id.as_str())?)
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.lock().jobs.get(job_id).cloned()
    }

    pub fn metrics(&self) -> JobMetrics {
        self.lock().metrics
    }

    /// Number of jobs ever submitted.
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::anyhow;
    use groundcontrol_model::Topic;
    use groundcontrol_relay::{from_id, PaginationError};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};

    use super::*;

    fn manager(concurrency: usize) -> JobManager {
        JobManager::new(Arc::new(NodeRegistry::new()), Hub::new(), concurrency)
    }

    fn start(manager: &JobManager) -> (CancellationToken, JoinHandle<Result<(), JobQueueError>>) {
        let token = CancellationToken::new();
        let worker = manager.clone();
        let child = token.clone();
        let handle = tokio::spawn(async move { worker.work(child).await });
        (token, handle)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn status(manager: &JobManager, job: &Job) -> JobStatus {
        manager.get(&job.id).unwrap().status
    }

    #[tokio::test]
    async fn submit_returns_queued_job_with_sequential_ids() {
        let manager = manager(2);
        let first = manager.submit("first", "owner", || async { Ok(()) });
        let second = manager.submit("second", "owner", || async { Ok(()) });

        assert_eq!(first.status, JobStatus::Queued);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(from_id(&first.id).unwrap(), (NodeType::Job, vec!["1".to_string()]));
        assert_eq!(from_id(&second.id).unwrap(), (NodeType::Job, vec!["2".to_string()]));

        let page = manager.find(&JobFilter::default(), &ConnectionArgs::default()).unwrap();
        let names: Vec<&str> = page.nodes().map(|job| job.name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);

        assert!(manager.nodes().get(&first.id).is_some());
        assert_eq!(manager.metrics().queued, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_runs_more_than_concurrency() {
        let manager = manager(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(Mutex::new(Vec::new()));
        let mut releases = Vec::new();
        let mut jobs = Vec::new();

        for n in 0..5 {
            let (tx, rx) = oneshot::channel::<()>();
            releases.push(tx);
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            let started = Arc::clone(&started);
            jobs.push(manager.submit(format!("job {n}"), "owner", move || async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                started.lock().unwrap().push(n);
                let _ = rx.await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        let (token, handle) = start(&manager);

        wait_until(|| started.lock().unwrap().len() == 2).await;
        sleep(Duration::from_millis(30)).await;
        assert_eq!(manager.metrics().running, 2);
        assert_eq!(manager.metrics().queued, 3);
        let mut first_two = started.lock().unwrap().clone();
        first_two.sort_unstable();
        assert_eq!(first_two, vec![0, 1]);

        let mut releases = releases.into_iter();
        for expected_started in 3..=5 {
            releases.next().unwrap().send(()).unwrap();
            wait_until(|| started.lock().unwrap().len() == expected_started).await;
            assert_eq!(
                started.lock().unwrap().last().copied(),
                Some(expected_started - 1)
            );
            assert!(manager.metrics().running <= 2);
        }
        for release in releases {
            release.send(()).unwrap();
        }

        wait_until(|| manager.metrics().done == 5).await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert!(jobs.iter().all(|job| status(&manager, job) == JobStatus::Done));

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn statuses_are_published_in_order() {
        let manager = manager(2);
        let mut events = manager.hub().subscribe(Topic::JobUpserted);
        let (token, handle) = start(&manager);

        let ok = manager.submit("ok", "owner", || async { Ok(()) });
        let bad = manager.submit("bad", "owner", || async { Err(anyhow!("boom")) });

        wait_until(|| manager.metrics().done + manager.metrics().failed == 2).await;

        let mut seen: HashMap<String, Vec<JobStatus>> = HashMap::new();
        while let Some(event) = events.try_recv() {
            let job = event.as_job().unwrap();
            seen.entry(job.id.clone()).or_default().push(job.status);
        }

        assert_eq!(
            seen[&ok.id],
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Done]
        );
        assert_eq!(
            seen[&bad.id],
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Failed]
        );

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failures_and_panics_are_isolated() {
        let manager = manager(2);
        let (token, handle) = start(&manager);

        let failing = manager.submit("fails", "owner", || async { Err(anyhow!("nope")) });
        let passing = manager.submit("passes", "owner", || async {
            sleep(Duration::from_millis(10)).await;
            Ok(())
        });
        let panicking = manager.submit("panics", "owner", || async {
            let explode = true;
            if explode {
                panic!("worker exploded");
            }
            Ok(())
        });

        wait_until(|| manager.metrics().queued + manager.metrics().running == 0).await;
        assert_eq!(status(&manager, &failing), JobStatus::Failed);
        assert_eq!(status(&manager, &passing), JobStatus::Done);
        assert_eq!(status(&manager, &panicking), JobStatus::Failed);

        let later = manager.submit("later", "owner", || async { Ok(()) });
        wait_until(|| status(&manager, &later) == JobStatus::Done).await;

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cursor_is_stable_while_jobs_are_added() {
        let manager = manager(2);
        for n in 0..10 {
            manager.submit(format!("job {n}"), "owner", || async { Ok(()) });
        }

        let all = manager.find(&JobFilter::default(), &ConnectionArgs::default()).unwrap();
        let cursor = all.edges[4].cursor.clone();
        let args = ConnectionArgs::default().after(cursor);
        let before: Vec<String> = manager
            .find(&JobFilter::default(), &args)
            .unwrap()
            .nodes()
            .map(|job| job.name.clone())
            .collect();

        for n in 10..13 {
            manager.submit(format!("job {n}"), "owner", || async { Ok(()) });
        }
        let after: Vec<String> = manager
            .find(&JobFilter::default(), &args)
            .unwrap()
            .nodes()
            .map(|job| job.name.clone())
            .collect();

        assert_eq!(before, vec!["job 4", "job 3", "job 2", "job 1", "job 0"]);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn negative_window_arguments_are_rejected() {
        let manager = manager(2);
        manager.submit("job", "owner", || async { Ok(()) });

        let err = manager
            .find(&JobFilter::default(), &ConnectionArgs::default().first(-1))
            .unwrap_err();
        assert!(matches!(
            err,
            JobQueueError::Pagination(PaginationError::InvalidArgument { argument: "first" })
        ));

        let err = manager
            .find(&JobFilter::default(), &ConnectionArgs::default().last(-1))
            .unwrap_err();
        assert!(matches!(
            err,
            JobQueueError::Pagination(PaginationError::InvalidArgument { argument: "last" })
        ));
    }

    #[tokio::test]
    async fn find_filters_by_status_and_owner() {
        let manager = manager(1);
        manager.submit("a", "project-a", || async { Ok(()) });
        manager.submit("b", "project-b", || async { Ok(()) });

        let by_owner = manager
            .find(
                &JobFilter::default().with_owner("project-b"),
                &ConnectionArgs::default(),
            )
            .unwrap();
        assert_eq!(by_owner.edges.len(), 1);
        assert_eq!(by_owner.edges[0].node.name, "b");

        let done = manager
            .find(
                &JobFilter::default().with_statuses([JobStatus::Done]),
                &ConnectionArgs::default(),
            )
            .unwrap();
        assert!(done.edges.is_empty());
    }

    #[tokio::test]
    async fn job_completes_and_updates_timestamp() {
        let manager = manager(2);
        let (token, handle) = start(&manager);

        let job = manager.submit("clone x", "project-x", || async {
            sleep(Duration::from_millis(50)).await;
            Ok(())
        });

        let page = manager.find(&JobFilter::default(), &ConnectionArgs::default()).unwrap();
        let listed = page.nodes().find(|j| j.id == job.id).unwrap();
        assert!(matches!(listed.status, JobStatus::Queued | JobStatus::Running));

        sleep(Duration::from_millis(100)).await;
        wait_until(|| status(&manager, &job) == JobStatus::Done).await;

        let done = manager.get(&job.id).unwrap();
        assert!(done.updated_at > done.created_at);
        assert_eq!(done.created_at, job.created_at);

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_and_fails_queued() {
        let manager = manager(1);
        let mut events = manager.hub().subscribe(Topic::JobUpserted);
        let (release, gate) = oneshot::channel::<()>();
        let running = manager.submit("running", "owner", move || async move {
            let _ = gate.await;
            Ok(())
        });
        let waiting = manager.submit("waiting", "owner", || async { Ok(()) });

        let (token, handle) = start(&manager);
        wait_until(|| status(&manager, &running) == JobStatus::Running).await;

        token.cancel();
        sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        release.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(status(&manager, &running), JobStatus::Done);
        assert_eq!(status(&manager, &waiting), JobStatus::Failed);
        assert_eq!(manager.metrics().queued, 0);
        assert_eq!(manager.metrics().failed, 1);

        let mut waiting_statuses = Vec::new();
        while let Some(event) = events.try_recv() {
            let job = event.as_job().unwrap();
            if job.id == waiting.id {
                waiting_statuses.push(job.status);
            }
        }
        assert_eq!(waiting_statuses, vec![JobStatus::Queued, JobStatus::Failed]);
    }

    #[tokio::test]
    async fn submit_after_dispatcher_stopped_fails_job() {
        let manager = manager(1);
        let token = CancellationToken::new();
        token.cancel();
        manager.work(token).await.unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let late = manager.submit("late", "owner", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(late.status, JobStatus::Failed);
        assert_eq!(status(&manager, &late), JobStatus::Failed);
        assert_eq!(manager.metrics().queued, 0);
        assert_eq!(manager.metrics().failed, 1);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn only_one_dispatcher() {
        let manager = manager(1);
        let (token, handle) = start(&manager);
        wait_until(|| manager.receiver.lock().unwrap().is_none()).await;

        let err = manager.work(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, JobQueueError::AlreadyRunning));

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn metrics_are_published() {
        let manager = manager(1);
        let mut metrics = manager.hub().subscribe(Topic::JobMetricsUpdated);
        manager.submit("job", "owner", || async { Ok(()) });

        let event = metrics.recv().await.unwrap();
        assert_eq!(
            event,
            Event::JobMetricsUpdated(JobMetrics {
                queued: 1,
                ..JobMetrics::default()
            })
        );
    }
}
