// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::db::models::{CronState, CronTask};
use crate::db::{queries, DbPool};
use crate::utils::unix_timestamp_now;
use std::time::Instant;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) mod tasks;

pub(crate) use tasks::{MaintenanceTask, MaintenanceTasks, TaskRunner};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// A task still flagged as running this long after it fell due is assumed
/// to have been interrupted by a shutdown and is started again.
pub(crate) const RERUN_TIMEOUT_SECS: i64 = 300;

#[derive(Debug, Default)]
pub(crate) struct TickSummary {
    pub(crate) ran: Vec<String>,
    pub(crate) skipped: Vec<String>,
    pub(crate) failed: Vec<String>,
}

pub(crate) struct Scheduler<R> {
    pool: DbPool,
    runner: R,
    clock: fn() -> i64,
}

/// Wall-clock seconds, rounded up to the millisecond.
fn run_time_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1000.0).ceil() / 1000.0
}

impl<R: TaskRunner> Scheduler<R> {
    pub(crate) fn new(pool: DbPool, runner: R) -> Self {
        Scheduler {
            pool,
            runner,
            clock: unix_timestamp_now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    fn is_in_progress(task: &CronTask, now: i64) -> bool {
        task.state == CronState::Running && now - task.next_run <= RERUN_TIMEOUT_SECS
    }

    async fn execute(&self, task: &CronTask, now: i64) -> anyhow::Result<()> {
        if task.state == CronState::Running {
            tracing::warn!(
                "Cron task {} was left running since {}, running it again",
                task.slug,
                task.last_run
            );
        }

        queries::cron::mark_running(&self.pool, task.id, now).await?;
        let started = Instant::now();

        match task.slug.parse::<MaintenanceTask>() {
            Ok(job) => {
                tracing::debug!("Running cron task {job}");
                if let Err(err) = self.runner.run(job).await {
                    tracing::error!("❌ Cron task {job} failed: {err:#}");
                }
            }
            Err(_) => tracing::warn!("No handler for cron task {}", task.slug),
        }

        queries::cron::mark_idle(
            &self.pool,
            task.id,
            now + task.run_every,
            run_time_secs(started),
        )
        .await
    }

    /// Runs every task that is due at `now`.
    ///
    /// Each task is stamped with the clock reading taken when it starts, never
    /// earlier than `now`. A task whose bookkeeping fails is logged and the
    /// tick moves on to the next one.
    pub(crate) async fn tick(&self, now: i64) -> anyhow::Result<TickSummary> {
        let mut summary = TickSummary::default();

        for task in queries::cron::get_due_tasks(&self.pool, now).await? {
            let task_now = (self.clock)().max(now);
            if Self::is_in_progress(&task, task_now) {
                tracing::debug!("Cron task {} is still running, skipping", task.slug);
                summary.skipped.push(task.slug);
                continue;
            }

            match self.execute(&task, task_now).await {
                Ok(()) => summary.ran.push(task.slug),
                Err(err) => {
                    tracing::error!("❌ Could not update cron task {}: {err:#}", task.slug);
                    summary.failed.push(task.slug);
                }
            }
        }

        Ok(summary)
    }

    pub(crate) async fn run(self, shutdown: CancellationToken) {
        tracing::info!("🏃 Cron scheduler started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.tick(unix_timestamp_now()).await {
                Ok(summary) => {
                    if !summary.ran.is_empty() {
                        tracing::info!("✅ Ran cron tasks: {}", summary.ran.join(", "));
                    }
                    if !summary.skipped.is_empty() {
                        tracing::debug!("Still running: {}", summary.skipped.join(", "));
                    }
                    if !summary.failed.is_empty() {
                        tracing::warn!("Cron tasks not rescheduled: {}", summary.failed.join(", "));
                    }
                }
                Err(err) => tracing::error!("❌ Cron tick failed: {err:#}"),
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(TICK_INTERVAL) => {}
            }
        }

        tracing::info!("Cron scheduler stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records which tasks ran and the state the task row had meanwhile.
    #[derive(Clone)]
    struct RecordingRunner {
        pool: DbPool,
        calls: Arc<Mutex<Vec<(MaintenanceTask, CronState)>>>,
        fail: bool,
    }

    impl RecordingRunner {
        fn new(pool: DbPool, fail: bool) -> Self {
            RecordingRunner {
                pool,
                calls: Default::default(),
                fail,
            }
        }

        fn calls(&self) -> Vec<(MaintenanceTask, CronState)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskRunner for RecordingRunner {
        async fn run(&self, task: MaintenanceTask) -> anyhow::Result<()> {
            let state = task_by_slug(&self.pool, &task.to_string()).await.state;
            self.calls.lock().unwrap().push((task, state));
            if self.fail {
                anyhow::bail!("handler failed");
            }
            Ok(())
        }
    }

    async fn task_by_slug(pool: &DbPool, slug: &str) -> CronTask {
        queries::cron::get_all_tasks(pool)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.slug == slug)
            .unwrap()
    }

    async fn only_enable(pool: &DbPool, slug: &str) {
        crate::db::query("UPDATE cron_tasks SET is_enabled = (slug = ?)")
            .bind(slug)
            .execute(pool)
            .await
            .unwrap();
    }

    fn scheduler(pool: &DbPool, runner: &RecordingRunner) -> Scheduler<RecordingRunner> {
        Scheduler::new(pool.clone(), runner.clone()).with_clock(|| 0)
    }

    async fn set_running(pool: &DbPool, slug: &str, next_run: i64) {
        crate::db::query("UPDATE cron_tasks SET cron_state = 1, next_run = ? WHERE slug = ?")
            .bind(next_run)
            .bind(slug)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn due_task_runs_and_goes_back_to_idle() {
        let pool = test_pool().await;
        only_enable(&pool, "calculate_majority_fee").await;
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let summary = scheduler.tick(10_000).await.unwrap();
        assert_eq!(summary.ran, vec!["calculate_majority_fee"]);
        assert_eq!(
            runner.calls(),
            vec![(MaintenanceTask::CalculateMajorityFee, CronState::Running)]
        );

        let task = task_by_slug(&pool, "calculate_majority_fee").await;
        assert_eq!(task.state, CronState::Idle);
        assert_eq!(task.last_run, 10_000);
        assert_eq!(task.next_run, 10_000 + 300);
        assert!(task.run_time >= 0.0);

        // not due again until next_run
        let summary = scheduler.tick(10_299).await.unwrap();
        assert!(summary.ran.is_empty());
        let summary = scheduler.tick(10_300).await.unwrap();
        assert_eq!(summary.ran.len(), 1);
    }

    #[tokio::test]
    async fn running_task_within_timeout_is_left_alone() {
        let pool = test_pool().await;
        only_enable(&pool, "check_mrl_ban_list").await;
        set_running(&pool, "check_mrl_ban_list", 10_000).await;
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let summary = scheduler.tick(10_000 + RERUN_TIMEOUT_SECS).await.unwrap();
        assert_eq!(summary.skipped, vec!["check_mrl_ban_list"]);
        assert!(runner.calls().is_empty());

        let task = task_by_slug(&pool, "check_mrl_ban_list").await;
        assert_eq!(task.state, CronState::Running);
        assert_eq!(task.next_run, 10_000);
    }

    #[tokio::test]
    async fn stuck_task_is_run_again() {
        let pool = test_pool().await;
        only_enable(&pool, "check_mrl_ban_list").await;
        set_running(&pool, "check_mrl_ban_list", 10_000).await;
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let now = 10_000 + RERUN_TIMEOUT_SECS + 1;
        let summary = scheduler.tick(now).await.unwrap();
        assert_eq!(summary.ran, vec!["check_mrl_ban_list"]);

        let task = task_by_slug(&pool, "check_mrl_ban_list").await;
        assert_eq!(task.state, CronState::Idle);
        assert_eq!(task.next_run, now + 300);
    }

    #[tokio::test]
    async fn failing_handler_still_reschedules() {
        let pool = test_pool().await;
        only_enable(&pool, "delete_old_probe_logs").await;
        let runner = RecordingRunner::new(pool.clone(), true);
        let scheduler = scheduler(&pool, &runner);

        scheduler.tick(500).await.unwrap();
        let task = task_by_slug(&pool, "delete_old_probe_logs").await;
        assert_eq!(task.state, CronState::Idle);
        assert_eq!(task.next_run, 500 + 120);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn unknown_slug_is_transitioned_without_a_handler() {
        let pool = test_pool().await;
        only_enable(&pool, "none").await;
        crate::db::query(
            "INSERT INTO cron_tasks (slug, title, run_every) VALUES ('legacy_task', 'Legacy', 60)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let summary = scheduler.tick(1_000).await.unwrap();
        assert_eq!(summary.ran, vec!["legacy_task"]);
        assert!(runner.calls().is_empty());

        let task = task_by_slug(&pool, "legacy_task").await;
        assert_eq!(task.state, CronState::Idle);
        assert_eq!(task.last_run, 1_000);
        assert_eq!(task.next_run, 1_060);
    }

    #[tokio::test]
    async fn unreadable_task_does_not_stop_the_others() {
        let pool = test_pool().await;
        crate::db::query("UPDATE cron_tasks SET cron_state = 2 WHERE slug = 'check_mrl_ban_list'")
            .execute(&pool)
            .await
            .unwrap();
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let summary = scheduler.tick(1_000).await.unwrap();
        assert_eq!(summary.ran.len(), 4);
        assert!(!summary.ran.iter().any(|slug| slug == "check_mrl_ban_list"));
        assert_eq!(runner.calls().len(), 4);

        // and again on the following tick
        let summary = scheduler.tick(1_000 + 172_800).await.unwrap();
        assert_eq!(summary.ran.len(), 4);
        assert!(summary.failed.is_empty());
    }

    #[tokio::test]
    async fn failed_bookkeeping_moves_on_to_the_next_task() {
        let pool = test_pool().await;
        crate::db::query(
            r#"CREATE TRIGGER reject_fee_update BEFORE UPDATE ON cron_tasks
                WHEN OLD.slug = 'calculate_majority_fee'
                BEGIN SELECT RAISE(ABORT, 'read only'); END"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = scheduler(&pool, &runner);

        let summary = scheduler.tick(1_000).await.unwrap();
        assert_eq!(summary.failed, vec!["calculate_majority_fee"]);
        assert_eq!(summary.ran.len(), 4);
        assert!(runner
            .calls()
            .iter()
            .all(|(task, _)| *task != MaintenanceTask::CalculateMajorityFee));
    }

    static CLOCK: AtomicI64 = AtomicI64::new(50_000);

    fn advancing_clock() -> i64 {
        CLOCK.fetch_add(7, Ordering::SeqCst)
    }

    #[tokio::test]
    async fn each_task_gets_its_own_timestamp() {
        let pool = test_pool().await;
        let runner = RecordingRunner::new(pool.clone(), false);
        let scheduler = Scheduler::new(pool.clone(), runner.clone()).with_clock(advancing_clock);

        let summary = scheduler.tick(1_000).await.unwrap();
        assert_eq!(summary.ran.len(), 5);

        let mut last_runs: Vec<i64> = queries::cron::get_all_tasks(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|task| {
                assert_eq!(task.next_run, task.last_run + task.run_every);
                task.last_run
            })
            .collect();
        last_runs.sort_unstable();
        last_runs.dedup();
        assert_eq!(last_runs.len(), 5);
        assert!(last_runs.iter().all(|ts| *ts >= 50_000));
    }

    #[tokio::test]
    async fn scheduler_stops_on_cancellation() {
        let pool = test_pool().await;
        only_enable(&pool, "none").await;
        let scheduler = scheduler(&pool, &RecordingRunner::new(pool.clone(), false));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
