//! Elapsed-time reporting for long-running tasks.
//!
//! A [`TaskTimer`] logs `"<task>..."` when a task starts and
//! `"<task> [<seconds>s]"` when it finishes. Events go through `tracing`, so
//! whatever subscriber the binary installs decides where they end up.

use std::fmt;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Level a timer reports at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Regular progress messages (`INFO`)
    #[default]
    Message,
    /// Detailed progress (`DEBUG`)
    Verbose,
    /// Log-file level detail (`TRACE`)
    Log,
    /// Never reports
    Silent,
}

impl Verbosity {
    fn emit(self, args: fmt::Arguments<'_>) {
        match self {
            Verbosity::Message => info!("{}", args),
            Verbosity::Verbose => debug!("{}", args),
            Verbosity::Log => trace!("{}", args),
            Verbosity::Silent => {}
        }
    }
}

/// Times one task at a time, reporting on finish or drop
#[derive(Debug)]
pub struct TaskTimer {
    verbosity: Verbosity,
    task: Option<String>,
    started: Instant,
}

impl TaskTimer {
    /// Starts timing `task` and reports its start
    pub fn new(task: impl Into<String>, verbosity: Verbosity) -> Self {
        let mut timer = Self::silent_start(verbosity);
        timer.start(task.into());
        timer
    }

    /// Starts an unnamed timer that only measures
    pub fn unnamed(verbosity: Verbosity) -> Self {
        Self::silent_start(verbosity)
    }

    fn silent_start(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            task: None,
            started: Instant::now(),
        }
    }

    fn start(&mut self, task: String) {
        self.started = Instant::now();
        self.verbosity.emit(format_args!("{}...", task));
        self.task = Some(task);
    }

    /// Finishes the current task and starts timing `task`
    pub fn go(&mut self, task: impl Into<String>) {
        self.finish();
        self.start(task.into());
    }

    /// Reports the current task's elapsed time. Repeated calls are no-ops.
    pub fn finish(&mut self) {
        if let Some(task) = self.task.take() {
            self.verbosity
                .emit(format_args!("{} [{:.3}s]", task, self.elapsed()));
        }
    }

    /// Seconds since the current task started
    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Name of the task being timed
    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }
}

impl Drop for TaskTimer {
    fn drop(&mut self) {
        self.finish();
    }
}
