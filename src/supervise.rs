//! Cohort lifecycle supervision.
//!
//! One cohort is the set of subprocesses spawned for a single
//! hyperparameter point, one per seed. The supervisor drives a cohort to a
//! terminal outcome with fixed-interval, non-blocking polling: a crashed
//! child shows up as an abnormal exit status on the next poll instead of
//! hanging the loop. Nothing is ever killed; on early abort the surviving
//! processes simply stop being tracked.

use std::io;
use std::time::Duration;

use tokio::process::Child;
use tracing::{error, info};

/// Observable state of a launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// `code` is `None` when the process was terminated by a signal.
    Exited { code: Option<i32> },
}

/// Non-blocking exit-status source for a supervised process.
///
/// [`tokio::process::Child`] is the production implementation; tests
/// substitute scripted probes so polling policy can be exercised without
/// real children or real sleeps.
pub trait ProcessProbe {
    fn try_status(&mut self) -> io::Result<RunState>;
}

impl ProcessProbe for Child {
    fn try_status(&mut self) -> io::Result<RunState> {
        Ok(match self.try_wait()? {
            None => RunState::Running,
            Some(status) => RunState::Exited {
                code: status.code(),
            },
        })
    }
}

/// The processes spawned for one hyperparameter point, one per seed.
#[derive(Debug)]
pub struct Cohort<P> {
    members: Vec<P>,
}

impl<P> Cohort<P> {
    pub fn new(members: Vec<P>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[P] {
        &self.members
    }
}

/// Terminal outcome of supervising one cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortOutcome {
    /// Every member exited with status 0.
    Completed,
    /// `member` is the index of the first abnormal exit within the cohort.
    Failed { member: usize, code: Option<i32> },
}

impl CohortOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Drives cohorts to completion on a fixed polling cadence.
pub struct Supervisor {
    poll_interval: Duration,
    abort_on_failure: bool,
}

impl Supervisor {
    pub fn new(poll_interval: Duration, abort_on_failure: bool) -> Self {
        Self {
            poll_interval,
            abort_on_failure,
        }
    }

    /// Poll every still-running member until the cohort reaches a terminal
    /// outcome.
    ///
    /// Reports [`CohortOutcome::Completed`] only once every member exited
    /// with status 0. With abort enabled, the first abnormal exit returns
    /// [`CohortOutcome::Failed`] immediately, without waiting on the
    /// remaining members and without terminating them; with abort disabled
    /// the supervisor waits for every member and then reports the first
    /// failure observed.
    pub async fn run<P: ProcessProbe>(&self, cohort: &mut Cohort<P>) -> CohortOutcome {
        let total = cohort.members.len();
        let mut finished = vec![false; total];
        let mut done = 0usize;
        let mut first_failure: Option<(usize, Option<i32>)> = None;

        while done < total {
            tokio::time::sleep(self.poll_interval).await;

            for (i, member) in cohort.members.iter_mut().enumerate() {
                if finished[i] {
                    continue;
                }
                let state = match member.try_status() {
                    Ok(state) => state,
                    Err(err) => {
                        // A probe that cannot report is treated as a crash.
                        error!("process {i}: status poll failed: {err}");
                        RunState::Exited { code: None }
                    }
                };
                match state {
                    RunState::Running => {}
                    RunState::Exited { code: Some(0) } => {
                        finished[i] = true;
                        done += 1;
                        info!("process {i} done");
                    }
                    RunState::Exited { code } => {
                        finished[i] = true;
                        done += 1;
                        error!("process {i} failed with status {code:?}");
                        if self.abort_on_failure {
                            return CohortOutcome::Failed { member: i, code };
                        }
                        if first_failure.is_none() {
                            first_failure = Some((i, code));
                        }
                    }
                }
            }
        }

        match first_failure {
            Some((member, code)) => CohortOutcome::Failed { member, code },
            None => CohortOutcome::Completed,
        }
    }
}
