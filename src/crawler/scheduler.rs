//! Wall-clock crawl scheduler
//!
//! This module handles:
//! - Polling the clock at a fixed cadence (once a minute by default)
//! - Matching the current `HH:MM` against the configured trigger times
//! - Firing the crawl job without waiting for it to finish
//! - Making sure only one polling loop is ever active
//!
//! Each trigger fires at most once per calendar date. A minute that is
//! missed (process paused, clock jump) is not made up later.

use crate::config::{parse_trigger_time, ScheduleConfig};
use crate::logger::CrawlLogger;
use crate::ConfigError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Work fired by the scheduler
///
/// `trigger` must return promptly; long-running work belongs on a spawned task.
pub trait CrawlJob: Send + Sync {
    fn trigger(&self);
}

/// Fires a job at configured times of day
pub struct Scheduler {
    /// Trigger times, seconds always zero
    triggers: Vec<NaiveTime>,

    /// Cadence of the polling loop
    poll_interval: Duration,

    clock: Arc<dyn Clock>,
    job: Arc<dyn CrawlJob>,
    logger: Arc<CrawlLogger>,

    /// Set while a polling loop is active
    armed: AtomicBool,

    /// Last (date, trigger) that fired
    last_fired: Mutex<Option<(NaiveDate, NaiveTime)>>,

    /// Handle of the polling loop task
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `triggers` - Times of day to fire at (minute precision)
    /// * `poll_interval` - How often to compare the clock
    /// * `clock` - Wall-clock source
    /// * `job` - Work to fire
    /// * `logger` - Crawl log
    pub fn new(
        triggers: Vec<NaiveTime>,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
        job: Arc<dyn CrawlJob>,
        logger: Arc<CrawlLogger>,
    ) -> Self {
        let mut triggers: Vec<NaiveTime> = triggers
            .into_iter()
            .filter_map(|t| NaiveTime::from_hms_opt(t.hour(), t.minute(), 0))
            .collect();
        triggers.sort_unstable();
        triggers.dedup();

        Self {
            triggers,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            clock,
            job,
            logger,
            armed: AtomicBool::new(false),
            last_fired: Mutex::new(None),
            poll_task: Mutex::new(None),
        }
    }

    /// Creates a scheduler from the `[schedule]` configuration section
    pub fn from_config(
        config: &ScheduleConfig,
        clock: Arc<dyn Clock>,
        job: Arc<dyn CrawlJob>,
        logger: Arc<CrawlLogger>,
    ) -> Result<Self, ConfigError> {
        let triggers = config
            .times
            .iter()
            .map(|time| parse_trigger_time(time))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            triggers,
            Duration::from_secs(config.poll_interval_secs),
            clock,
            job,
            logger,
        ))
    }

    pub fn triggers(&self) -> &[NaiveTime] {
        &self.triggers
    }

    /// Returns whether a polling loop is active
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Returns the trigger whose `HH:MM` equals `now`'s, if any
    pub fn due_trigger(&self, now: NaiveDateTime) -> Option<NaiveTime> {
        self.triggers
            .iter()
            .copied()
            .find(|t| t.hour() == now.hour() && t.minute() == now.minute())
    }

    /// Checks the clock once and fires the job if a trigger is due
    pub fn poll(&self) -> bool {
        self.poll_at(self.clock.now())
    }

    /// Checks `now` against the triggers and fires the job if one is due
    ///
    /// Returns true if the job was fired.
    pub fn poll_at(&self, now: NaiveDateTime) -> bool {
        let trigger = match self.due_trigger(now) {
            Some(trigger) => trigger,
            None => return false,
        };

        {
            let mut last_fired = self
                .last_fired
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let key = (now.date(), trigger);
            if *last_fired == Some(key) {
                return false;
            }
            *last_fired = Some(key);
        }

        self.logger.info(
            "Scheduled crawl triggered",
            Some(json!({ "trigger": trigger.format("%H:%M").to_string() })),
        );
        self.job.trigger();
        true
    }

    /// Starts the polling loop
    ///
    /// Calling this while a loop is already active logs a warning and does
    /// nothing. Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// * `true` - A new polling loop was started
    /// * `false` - A loop was already running
    pub fn start(self: &Arc<Self>) -> bool {
        if self.armed.swap(true, Ordering::SeqCst) {
            self.logger.warning("Scheduler already running", None);
            return false;
        }

        let times: Vec<String> = self
            .triggers
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        self.logger.info(
            "Scheduler started",
            Some(json!({
                "times": times,
                "pollIntervalSecs": self.poll_interval.as_secs_f64(),
            })),
        );

        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !scheduler.is_armed() {
                    break;
                }
                scheduler.poll();
            }
        });

        *self.poll_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        true
    }

    /// Stops the polling loop, if one is running
    pub fn stop(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        self.logger.info("Scheduler stopped", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingJob {
        fired: AtomicUsize,
    }

    impl CrawlJob for CountingJob {
        fn trigger(&self) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn create_scheduler(times: &[&str]) -> (Arc<CountingJob>, Scheduler) {
        let job = Arc::new(CountingJob::default());
        let config = ScheduleConfig {
            times: times.iter().map(|t| t.to_string()).collect(),
            poll_interval_secs: 60,
        };
        let scheduler = Scheduler::from_config(
            &config,
            Arc::new(SystemClock),
            job.clone(),
            Arc::new(CrawlLogger::in_memory(20)),
        )
        .unwrap();
        (job, scheduler)
    }

    #[test]
    fn test_from_config_parses_and_sorts() {
        let (_job, scheduler) = create_scheduler(&["15:00", "11:30", "15:00"]);
        let times: Vec<String> = scheduler
            .triggers()
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        assert_eq!(times, vec!["11:30", "15:00"]);
    }

    #[test]
    fn test_from_config_rejects_bad_time() {
        let config = ScheduleConfig {
            times: vec!["11h30".to_string()],
            poll_interval_secs: 60,
        };
        let result = Scheduler::from_config(
            &config,
            Arc::new(SystemClock),
            Arc::new(CountingJob::default()),
            Arc::new(CrawlLogger::in_memory(5)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_due_trigger_matches_minute_only() {
        let (_job, scheduler) = create_scheduler(&["11:30"]);
        assert!(scheduler.due_trigger(at("2024-01-02", "11:30:00")).is_some());
        assert!(scheduler.due_trigger(at("2024-01-02", "11:30:59")).is_some());
        assert!(scheduler.due_trigger(at("2024-01-02", "11:29:59")).is_none());
        assert!(scheduler.due_trigger(at("2024-01-02", "11:31:00")).is_none());
    }

    #[test]
    fn test_advancing_clock_fires_once() {
        let (job, scheduler) = create_scheduler(&["11:30"]);

        assert!(!scheduler.poll_at(at("2024-01-02", "11:29:00")));
        assert!(scheduler.poll_at(at("2024-01-02", "11:30:00")));
        assert!(!scheduler.poll_at(at("2024-01-02", "11:31:00")));
        assert!(!scheduler.poll_at(at("2024-01-02", "11:32:00")));

        assert_eq!(job.fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_two_polls_in_same_minute_fire_once() {
        let (job, scheduler) = create_scheduler(&["15:00"]);

        assert!(scheduler.poll_at(at("2024-01-02", "15:00:00")));
        assert!(!scheduler.poll_at(at("2024-01-02", "15:00:58")));

        assert_eq!(job.fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fires_again_next_day_and_for_each_trigger() {
        let (job, scheduler) = create_scheduler(&["11:30", "15:00"]);

        assert!(scheduler.poll_at(at("2024-01-02", "11:30:00")));
        assert!(scheduler.poll_at(at("2024-01-02", "15:00:00")));
        assert!(scheduler.poll_at(at("2024-01-03", "11:30:00")));

        assert_eq!(job.fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_poll_uses_clock() {
        let job = Arc::new(CountingJob::default());
        let scheduler = Scheduler::new(
            vec![NaiveTime::from_hms_opt(11, 30, 0).unwrap()],
            Duration::from_secs(60),
            Arc::new(FixedClock(at("2024-01-02", "11:30:15"))),
            job.clone(),
            Arc::new(CrawlLogger::in_memory(5)),
        );

        assert!(scheduler.poll());
        assert_eq!(job.fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let logger = Arc::new(CrawlLogger::in_memory(20));
        let scheduler = Arc::new(Scheduler::new(
            vec![NaiveTime::from_hms_opt(11, 30, 0).unwrap()],
            Duration::from_secs(60),
            Arc::new(FixedClock(at("2024-01-02", "09:00:00"))),
            Arc::new(CountingJob::default()),
            logger.clone(),
        ));

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_armed());

        let warnings: Vec<_> = logger
            .recent(20)
            .into_iter()
            .filter(|e| e.level == crate::logger::LogLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Scheduler already running");

        scheduler.stop();
        assert!(!scheduler.is_armed());
    }
}
