//! Named-job registry with idempotent registration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::cron::CronSpec;

/// When a job fires.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Every N seconds, first tick immediately.
    Interval { every_secs: u64 },
    /// At a wall-clock time parsed from a 5-field cron expression.
    Daily { cron: String },
}

struct JobHandle {
    schedule: Schedule,
    handle: JoinHandle<()>,
}

/// Process-wide registry of background jobs, keyed by job name.
///
/// Registration is checked-then-inserted under the lock: a name that is
/// already present is a no-op, which makes job setup safe to run from
/// both process start and the webhook path.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register and start a job. Returns false without spawning anything
    /// when a job with this name already exists.
    pub fn register<F, Fut>(&self, name: &str, schedule: Schedule, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(name) {
            tracing::info!("Job '{name}' already scheduled, skipping registration");
            return false;
        }

        let handle = match &schedule {
            Schedule::Interval { every_secs } => spawn_interval(name.to_string(), *every_secs, job),
            Schedule::Daily { cron } => {
                let Some(spec) = CronSpec::parse(cron) else {
                    tracing::error!("Job '{name}' not scheduled: bad cron '{cron}'");
                    return false;
                };
                spawn_daily(name.to_string(), spec, job)
            }
        };

        tracing::info!("Job '{name}' scheduled ({schedule:?})");
        jobs.insert(name.to_string(), JobHandle { schedule, handle });
        true
    }

    /// Whether a job with this name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(name)
    }

    /// Names of all registered jobs.
    pub fn names(&self) -> Vec<String> {
        let jobs = self.jobs.lock().unwrap();
        let mut names: Vec<String> = jobs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stop and forget a job. Returns whether it existed.
    pub fn cancel(&self, name: &str) -> bool {
        match self.jobs.lock().unwrap().remove(name) {
            Some(job) => {
                job.handle.abort();
                tracing::info!("Job '{name}' cancelled");
                true
            }
            None => false,
        }
    }
}

impl Drop for JobRegistry {
    fn drop(&mut self) {
        for job in self.jobs.lock().unwrap().values() {
            job.handle.abort();
        }
    }
}

/// Interval loop. Each tick body runs in its own task so a stuck external
/// call cannot starve the timer or other jobs; overlapping runs are
/// expected and tolerated by the engines' conditional writes.
fn spawn_interval<F, Fut>(name: String, every_secs: u64, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(every_secs.max(1)));
        loop {
            interval.tick().await;
            tracing::debug!("Job '{name}' tick");
            tokio::spawn(job());
        }
    })
}

/// Daily loop: sleep until the next cron occurrence, fire, repeat.
fn spawn_daily<F, Fut>(name: String, spec: CronSpec, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = spec.next_after(now) else {
                tracing::error!("Job '{name}' has no next occurrence, stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            tracing::debug!("Job '{name}' daily fire");
            tokio::spawn(job());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let registry = JobRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f1 = fired.clone();
        assert!(registry.register(
            "reconcile",
            Schedule::Interval { every_secs: 3600 },
            move || {
                let f = f1.clone();
                async move {
                    f.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        // Same name again: no-op, no second loop.
        let f2 = fired.clone();
        assert!(!registry.register(
            "reconcile",
            Schedule::Interval { every_secs: 1 },
            move || {
                let f = f2.clone();
                async move {
                    f.fetch_add(100, Ordering::SeqCst);
                }
            },
        ));

        assert_eq!(registry.names(), vec!["reconcile".to_string()]);
        assert!(registry.is_registered("reconcile"));
        assert!(!registry.is_registered("summary"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_job_fires() {
        let registry = JobRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        registry.register("tick", Schedule::Interval { every_secs: 10 }, move || {
            let f = f.clone();
            async move {
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        // paused clock auto-advances; first tick is immediate
        tokio::time::sleep(std::time::Duration::from_secs(25)).await;
        assert!(fired.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_bad_cron_refused() {
        let registry = JobRegistry::new();
        assert!(!registry.register("summary", Schedule::Daily { cron: "nope".into() }, || async {}));
        assert!(!registry.is_registered("summary"));
    }

    #[tokio::test]
    async fn test_cancel() {
        let registry = JobRegistry::new();
        registry.register("tick", Schedule::Interval { every_secs: 3600 }, || async {});
        assert!(registry.cancel("tick"));
        assert!(!registry.cancel("tick"));
        assert!(!registry.is_registered("tick"));
    }
}
