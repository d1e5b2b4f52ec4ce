use std::sync::LazyLock;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Every bar drawn by the binary hangs off this, so log output can pause them.
static BARS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

/// Wraps the env_logger logger so each record is written with the progress
/// display cleared, keeping log lines above the bar instead of through it.
pub struct SuspendingLogger {
    inner: env_logger::Logger,
}

impl SuspendingLogger {
    pub fn new(inner: env_logger::Logger) -> Self {
        Self { inner }
    }

    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.inner.filter();
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for SuspendingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            BARS.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Completed-of-total counter with a terminal bar. Owned by the orchestrator;
/// workers never touch it.
pub struct BatchProgress {
    completed: u64,
    bar: ProgressBar,
}

impl BatchProgress {
    pub fn new(total: u64) -> Self {
        let bar = BARS.add(Self::styled(total));
        Self { completed: 0, bar }
    }

    #[cfg(test)]
    pub fn hidden(total: u64) -> Self {
        let bar = Self::styled(total);
        bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        Self { completed: 0, bar }
    }

    fn styled(total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "Overall {bar:40.cyan/blue} {pos}/{len} videos [{elapsed_precise}<{eta_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        bar
    }

    /// Records one finished task, whatever its outcome.
    pub fn advance(&mut self) {
        self.completed += 1;
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }
}
