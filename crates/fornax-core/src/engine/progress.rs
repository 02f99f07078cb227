/// Progress events emitted by long-running library operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Starts a named phase that finishes when the returned guard is dropped.
    pub fn phase(&self, name: &'static str) -> PhaseGuard<'_, 'a> {
        self.report(Progress::PhaseStart { name });
        PhaseGuard { reporter: self }
    }

    /// Starts a task of `total_steps` steps that finishes when the returned guard is dropped.
    pub fn task(&self, total_steps: u64) -> TaskGuard<'_, 'a> {
        self.report(Progress::TaskStart { total_steps });
        TaskGuard { reporter: self }
    }
}

pub struct PhaseGuard<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
}

impl Drop for PhaseGuard<'_, '_> {
    fn drop(&mut self) {
        self.reporter.report(Progress::PhaseFinish);
    }
}

pub struct TaskGuard<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
}

impl TaskGuard<'_, '_> {
    #[inline]
    pub fn step(&self) {
        self.reporter.report(Progress::TaskIncrement);
    }
}

impl Drop for TaskGuard<'_, '_> {
    fn drop(&mut self) {
        self.reporter.report(Progress::TaskFinish);
    }
}
