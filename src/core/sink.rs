//! Worker-backed delivery unit
//!
//! A [`Sink`] owns a FIFO queue of pending records and at most one background
//! worker thread. Producers only pay for a short critical section to enqueue;
//! the worker formats each record and hands the line to the sink's
//! [`SinkWriter`].
//!
//! Lifecycle:
//!
//! - `start` spawns the worker and returns only once the worker is running.
//! - `stop` marks the queue stopped, wakes the worker and joins it. The worker
//!   drains every record queued before the stop mark, so nothing accepted is
//!   lost by a controlled shutdown.
//! - `flush` waits until everything accepted so far is written and the
//!   writer flushed. The sink keeps accepting records meanwhile.
//! - While stopped, `submit` drops records.

use super::error::{LoggerError, Result};
use super::formatter::Formatter;
use super::metrics::SinkMetrics;
use super::record::LogRecord;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Output end of a sink. Only the sink's worker calls it, one line at a time.
pub trait SinkWriter: Send {
    /// Write one formatted line. The writer adds the line terminator.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Push buffered lines to the device. Called whenever the queue runs
    /// empty and when a caller waits in [`Sink::flush`].
    fn flush(&mut self) -> Result<()>;

    /// Short identifier, used for the worker thread name and diagnostics.
    fn name(&self) -> &str;
}

struct Queue {
    records: VecDeque<LogRecord>,
    stopped: bool,
    /// Records accepted by `submit` over the sink's lifetime
    accepted: u64,
    /// Records taken off the queue by a worker
    taken: u64,
    /// Records written with the writer flushed afterwards
    flushed: u64,
    /// Highest `accepted` mark a `flush` caller is waiting for
    flush_target: u64,
}

struct Shared {
    name: String,
    queue: Mutex<Queue>,
    available: Condvar,
    drained: Condvar,
    formatter: RwLock<Arc<dyn Formatter>>,
    writer: Mutex<Box<dyn SinkWriter>>,
    metrics: SinkMetrics,
}

/// A delivery endpoint with its own FIFO queue and background worker.
///
/// Producers call [`Sink::submit`]; the worker formats each record with the
/// current [`Formatter`] and passes the line to the [`SinkWriter`]. Share a
/// sink between loggers through `Arc<Sink>`. Dropping the last handle stops
/// the worker after it drained the queue.
///
/// # Example
///
/// ```
/// use sinklog::{FileFormatter, LogLevel, LogRecord, Sink};
/// use sinklog::sinks::ConsoleWriter;
/// use std::sync::Arc;
///
/// let sink = Sink::spawn(ConsoleWriter::new(), FileFormatter::new()).unwrap();
/// sink.submit(LogRecord::new(Arc::from("app"), LogLevel::Info, "hello"));
/// sink.flush().unwrap();
/// assert_eq!(sink.metrics().written(), 1);
/// ```
pub struct Sink {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Sink {
    /// Create a stopped sink. Records submitted before [`Sink::start`] are dropped.
    pub fn new<W, F>(writer: W, formatter: F) -> Self
    where
        W: SinkWriter + 'static,
        F: Formatter + 'static,
    {
        Self::with_shared_formatter(Box::new(writer), Arc::new(formatter))
    }

    /// Create a stopped sink from an already boxed writer and a formatter
    /// that may be shared with other sinks.
    pub fn with_shared_formatter(
        writer: Box<dyn SinkWriter>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: writer.name().to_string(),
                queue: Mutex::new(Queue {
                    records: VecDeque::new(),
                    stopped: true,
                    accepted: 0,
                    taken: 0,
                    flushed: 0,
                    flush_target: 0,
                }),
                available: Condvar::new(),
                drained: Condvar::new(),
                formatter: RwLock::new(formatter),
                writer: Mutex::new(writer),
                metrics: SinkMetrics::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Create a sink and start its worker.
    pub fn spawn<W, F>(writer: W, formatter: F) -> Result<Arc<Self>>
    where
        W: SinkWriter + 'static,
        F: Formatter + 'static,
    {
        let sink = Self::new(writer, formatter);
        sink.start()?;
        Ok(Arc::new(sink))
    }

    /// Enqueue a record and wake the worker. Dropped if the sink is stopped.
    pub fn submit(&self, record: LogRecord) {
        let mut queue = self.shared.queue.lock();
        if queue.stopped {
            self.shared.metrics.record_rejected();
            return;
        }
        queue.records.push_back(record);
        queue.accepted += 1;
        self.shared.metrics.record_submitted();
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Spawn the worker. Blocks until the worker thread has entered its loop.
    /// Does nothing if a worker is already running.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::WorkerSpawn`] if the thread cannot be created;
    /// the sink stays stopped.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if self.is_running() {
                *worker = Some(handle);
                return Ok(());
            }
            // Left behind by stop_timeout, still draining
            if handle.join().is_err() {
                eprintln!(
                    "[sinklog ERROR] Previous worker of sink '{}' panicked",
                    self.shared.name
                );
            }
        }

        self.shared.queue.lock().stopped = false;

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("sinklog-{}", self.shared.name))
            .spawn(move || {
                let _ = ready_tx.send(());
                drop(ready_tx);
                run_worker(&shared);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                // Nobody will drain what slipped in before the spawn failed
                let mut queue = self.shared.queue.lock();
                queue.stopped = true;
                for _ in queue.records.drain(..) {
                    self.shared.metrics.record_rejected();
                }
                queue.flushed = queue.accepted;
                self.shared.drained.notify_all();
                drop(queue);
                return Err(LoggerError::worker_spawn(
                    self.shared.name.clone(),
                    e.to_string(),
                ));
            }
        };

        // Disconnect without a message only happens if the thread died first
        let _ = ready_rx.recv();
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the worker after it has written every queued record.
    ///
    /// Has no timeout: a writer stuck in I/O keeps this call waiting.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        self.mark_stopped();

        if let Some(handle) = worker.take() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[sinklog ERROR] Worker of sink '{}' panicked during shutdown: {:?}",
                    self.shared.name, e
                );
            }
        }
    }

    /// Stop with an upper bound on the wait.
    ///
    /// Returns `false` if the worker has not finished draining in time. The
    /// sink is stopped either way and a later [`Sink::stop`] joins the worker.
    pub fn stop_timeout(&self, timeout: Duration) -> bool {
        let mut worker = self.worker.lock();
        self.mark_stopped();

        let Some(handle) = worker.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[sinklog ERROR] Worker of sink '{}' panicked during shutdown: {:?}",
                        self.shared.name, e
                    );
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[sinklog WARN] Worker of sink '{}' did not drain within {:?}",
                    self.shared.name, timeout
                );
                *worker = Some(handle);
                return false;
            }

            thread::sleep(Duration::from_millis(5));
        }
    }

    /// `stop` followed by `start`. Records submitted in between are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::WorkerSpawn`] if the new worker cannot be created.
    pub fn restart(&self) -> Result<()> {
        self.stop();
        self.start()
    }

    /// Block until every record accepted before this call is written and the
    /// writer flushed.
    ///
    /// The sink stays running: records submitted by other threads meanwhile
    /// are accepted and delivered as usual. Under sustained load the wait
    /// covers only the records that were queued when `flush` was called.
    ///
    /// # Errors
    ///
    /// On a stopped sink the writer is flushed directly and its error, or a
    /// panic inside it, is returned. A running sink reports writer errors on
    /// stderr from the worker and this call returns `Ok`.
    pub fn flush(&self) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        if queue.stopped {
            drop(queue);
            return self.shared.flush_writer();
        }

        let target = queue.accepted;
        queue.flush_target = queue.flush_target.max(target);
        while queue.flushed < target {
            self.shared.drained.wait(&mut queue);
        }
        Ok(())
    }

    /// Replace the formatter. Records already dequeued keep the old one.
    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.shared.formatter.write() = formatter;
    }

    /// The formatter applied to records dequeued from now on.
    pub fn formatter(&self) -> Arc<dyn Formatter> {
        self.shared.formatter.read().clone()
    }

    /// Whether the sink accepts records. A stopped sink may still have a
    /// worker draining after [`Sink::stop_timeout`] gave up waiting.
    pub fn is_running(&self) -> bool {
        !self.shared.queue.lock().stopped
    }

    /// Number of records waiting for the worker
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().records.len()
    }

    /// The writer's name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Delivery counters since creation.
    pub fn metrics(&self) -> &SinkMetrics {
        &self.shared.metrics
    }

    fn mark_stopped(&self) {
        self.shared.queue.lock().stopped = true;
        self.shared.available.notify_all();
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        self.stop();
        self.shared.report_flush();
    }
}

fn run_worker(shared: &Shared) {
    let mut queue = shared.queue.lock();

    loop {
        while queue.records.is_empty() && !queue.stopped {
            shared.available.wait(&mut queue);
        }

        // Empty here means stopped and fully drained
        let Some(record) = queue.records.pop_front() else {
            break;
        };
        queue.taken += 1;
        drop(queue);

        shared.deliver(&record);

        queue = shared.queue.lock();
        let awaited = queue.flushed < queue.flush_target && queue.taken >= queue.flush_target;
        if queue.records.is_empty() || awaited {
            // Everything taken so far has been delivered by this worker
            let mark = queue.taken;
            drop(queue);
            shared.report_flush();

            queue = shared.queue.lock();
            queue.flushed = queue.flushed.max(mark);
            shared.drained.notify_all();
        }
    }
}

impl Shared {
    fn deliver(&self, record: &LogRecord) {
        let formatter = self.formatter.read().clone();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let line = formatter.format(record);
            self.writer.lock().write_line(&line)
        }));

        match outcome {
            Ok(Ok(())) => {
                self.metrics.record_written();
            }
            Ok(Err(e)) => {
                self.metrics.record_failed();
                eprintln!("[sinklog ERROR] Sink '{}' failed to write: {}", self.name, e);
            }
            Err(panic_info) => {
                self.metrics.record_failed();
                eprintln!(
                    "[sinklog ERROR] Sink '{}' panicked while writing: {}. \
                     The worker keeps draining.",
                    self.name,
                    panic_message(panic_info.as_ref())
                );
            }
        }
    }

    fn flush_writer(&self) -> Result<()> {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.writer.lock().flush()
        }));

        outcome.unwrap_or_else(|panic_info| {
            Err(LoggerError::other(format!(
                "writer of sink '{}' panicked during flush: {}",
                self.name,
                panic_message(panic_info.as_ref())
            )))
        })
    }

    fn report_flush(&self) {
        if let Err(e) = self.flush_writer() {
            eprintln!("[sinklog ERROR] Sink '{}' flush failed: {}", self.name, e);
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formatter::{ConsoleFormatter, FileFormatter};
    use crate::core::level::LogLevel;
    use crate::test_support::CaptureWriter;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Blocks every write until released
    struct GateWriter {
        open: Arc<AtomicBool>,
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl SinkWriter for GateWriter {
        fn write_line(&mut self, line: &str) -> Result<()> {
            while !self.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
            self.lines.lock().push(line.to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "gate"
        }
    }

    struct PanicWriter;

    impl SinkWriter for PanicWriter {
        fn write_line(&mut self, line: &str) -> Result<()> {
            if line.ends_with("boom") {
                panic!("writer exploded");
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "panicky"
        }
    }

    fn record(text: &str) -> LogRecord {
        LogRecord::new(Arc::from("test"), LogLevel::Info, text)
    }

    #[test]
    fn test_new_sink_is_stopped_and_drops() {
        let writer = CaptureWriter::default();
        let sink = Sink::new(writer.clone(), FileFormatter);

        assert!(!sink.is_running());
        sink.submit(record("lost"));
        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.metrics().rejected(), 1);
        assert!(writer.lines.lock().is_empty());
    }

    #[test]
    fn test_stop_drains_in_order() {
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        for i in 0..100 {
            sink.submit(record(&format!("msg {}", i)));
        }
        sink.stop();

        let lines = writer.lines.lock();
        assert_eq!(lines.len(), 100);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.ends_with(&format!("msg {}", i)), "out of order: {}", line);
        }
        assert_eq!(sink.metrics().written(), 100);
    }

    #[test]
    fn test_stop_waits_for_blocked_writer() {
        let open = Arc::new(AtomicBool::new(false));
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Sink::spawn(
            GateWriter {
                open: Arc::clone(&open),
                lines: Arc::clone(&lines),
            },
            FileFormatter,
        )
        .unwrap();

        for i in 0..5 {
            sink.submit(record(&format!("{}", i)));
        }

        let stopper = {
            let sink = Arc::clone(&sink);
            thread::spawn(move || sink.stop())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(lines.lock().is_empty());

        open.store(true, Ordering::Release);
        stopper.join().unwrap();
        assert_eq!(lines.lock().len(), 5);
    }

    #[test]
    fn test_submit_after_stop_is_noop() {
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        sink.submit(record("kept"));
        sink.stop();
        sink.submit(record("dropped"));

        assert_eq!(sink.pending(), 0);
        assert_eq!(writer.lines.lock().len(), 1);
        assert_eq!(sink.metrics().rejected(), 1);
    }

    #[test]
    fn test_restart_resumes_delivery() {
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        sink.submit(record("one"));
        sink.restart().unwrap();
        assert!(sink.is_running());
        sink.submit(record("two"));
        sink.stop();

        let lines = writer.lines.lock();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("two"));
    }

    #[test]
    fn test_start_is_idempotent() {
        let writer = CaptureWriter::default();
        let sink = Sink::new(writer.clone(), FileFormatter);
        sink.start().unwrap();
        sink.start().unwrap();

        sink.submit(record("once"));
        sink.stop();
        assert_eq!(writer.lines.lock().len(), 1);
    }

    #[test]
    fn test_set_formatter_applies_to_later_records() {
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        sink.submit(record("file"));
        sink.flush().unwrap();
        sink.set_formatter(Arc::new(ConsoleFormatter::new()));
        sink.submit(record("console"));
        sink.stop();

        let lines = writer.lines.lock();
        assert!(!lines[0].contains("[test]"));
        assert!(lines[1].contains("[test]"));
        assert_eq!(sink.formatter().name(), "console");
    }

    #[test]
    fn test_writer_panic_is_isolated() {
        let sink = Sink::spawn(PanicWriter, FileFormatter).unwrap();

        sink.submit(record("fine"));
        sink.submit(record("boom"));
        sink.submit(record("still fine"));
        sink.stop();

        assert_eq!(sink.metrics().written(), 2);
        assert_eq!(sink.metrics().failed(), 1);
    }

    #[test]
    fn test_stop_timeout_reports_slow_drain() {
        let open = Arc::new(AtomicBool::new(false));
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Sink::spawn(
            GateWriter {
                open: Arc::clone(&open),
                lines: Arc::clone(&lines),
            },
            FileFormatter,
        )
        .unwrap();

        sink.submit(record("stuck"));
        assert!(!sink.stop_timeout(Duration::from_millis(20)));

        open.store(true, Ordering::Release);
        sink.stop();
        assert_eq!(lines.lock().len(), 1);
    }

    #[test]
    fn test_flush_waits_for_queued_records() {
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        for i in 0..200 {
            sink.submit(record(&i.to_string()));
        }
        sink.flush().unwrap();

        assert_eq!(writer.lines.lock().len(), 200);
        assert!(sink.is_running());
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_flush_keeps_accepting_from_other_threads() {
        const SENT: usize = 50_000;
        let writer = CaptureWriter::default();
        let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();

        let producer = {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..SENT {
                    sink.submit(record(&i.to_string()));
                }
            })
        };

        for _ in 0..200 {
            sink.flush().unwrap();
        }
        producer.join().unwrap();
        sink.flush().unwrap();

        assert!(sink.is_running());
        assert_eq!(sink.metrics().rejected(), 0);
        assert_eq!(writer.lines.lock().len(), SENT);
        sink.stop();
    }

    #[test]
    fn test_flush_of_stopped_sink_reports_writer_panic() {
        struct BadFlush;

        impl SinkWriter for BadFlush {
            fn write_line(&mut self, _line: &str) -> Result<()> {
                Ok(())
            }

            fn flush(&mut self) -> Result<()> {
                panic!("flush exploded");
            }

            fn name(&self) -> &str {
                "bad-flush"
            }
        }

        let sink = Sink::new(BadFlush, FileFormatter);
        let err = sink.flush().unwrap_err();
        assert!(matches!(err, LoggerError::Other(_)));
        assert!(err.to_string().contains("flush exploded"));
    }

    #[test]
    fn test_drop_drains() {
        let writer = CaptureWriter::default();
        {
            let sink = Sink::spawn(writer.clone(), FileFormatter).unwrap();
            for i in 0..10 {
                sink.submit(record(&i.to_string()));
            }
        }
        assert_eq!(writer.lines.lock().len(), 10);
    }
}
