//! Bounded fan-out over independent work items.

use std::fmt::Debug;
use std::future::Future;
use std::io::{self, Write};

use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::error;

/// Log sink that clears the progress bars around each write so log lines
/// don't tear a bar mid-redraw.
pub struct SuspendingWriter<W> {
    bars: MultiProgress,
    inner: W,
}

impl<W: Write> SuspendingWriter<W> {
    pub fn new(bars: MultiProgress, inner: W) -> Self {
        Self { bars, inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl SuspendingWriter<io::Stderr> {
    pub fn stderr(bars: &MultiProgress) -> Self {
        Self::new(bars.clone(), io::stderr())
    }
}

impl<W: Write> Write for SuspendingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.bars.suspend(|| inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        self.bars.suspend(|| inner.flush())
    }
}

/// A bar drawn through `bars`, or a hidden one when progress is off.
pub fn progress_bar(
    len: usize,
    label: &'static str,
    bars: Option<&MultiProgress>,
) -> ProgressBar {
    let Some(bars) = bars else {
        return ProgressBar::hidden();
    };
    let bar = bars.add(ProgressBar::new(len as u64));
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(label);
    bar
}

/// Runs `task` for every item with at most `workers` in flight.
///
/// Results come back in completion order. Workers only produce values; the
/// collecting loop here is the single owner of the output. A task that
/// panics is logged and replaced by `fallback(&item)`.
pub async fn run_pool<I, T, F, Fut, D>(
    items: Vec<I>,
    workers: usize,
    progress: &ProgressBar,
    task: F,
    fallback: D,
) -> Vec<T>
where
    I: Clone + Debug + Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    D: Fn(&I) -> T,
{
    let mut results = Vec::with_capacity(items.len());

    let mut completed = futures::stream::iter(items)
        .map(|item| {
            let handle = tokio::spawn(task(item.clone()));
            async move { (item, handle.await) }
        })
        .buffer_unordered(workers.max(1));

    while let Some((item, outcome)) = completed.next().await {
        match outcome {
            Ok(value) => results.push(value),
            Err(e) => {
                error!(?item, error = %e, "worker failed, substituting default");
                results.push(fallback(&item));
            }
        }
        progress.inc(1);
    }

    progress.finish();
    results
}
