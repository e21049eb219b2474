//! Background export on a dedicated thread.
//!
//! The worker owns its inputs and reports through a bounded channel: any
//! number of `Progress` events, then exactly one `Finished` or `Failed`.

use super::{ExportEngine, ExportOptions, ExportSummary};
use crate::error::{Error, Result};
use crate::model::Question;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

const PANICKED: &str = "export worker panicked";

/// Event emitted by a running export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    /// Percentage of questions written
    Progress(u8),
    /// The export completed
    Finished(ExportSummary),
    /// The export failed; the destination is untrusted
    Failed(String),
}

impl ExportEvent {
    /// Whether this is the last event of an export.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportEvent::Progress(_))
    }
}

/// Spawns exports on background threads.
pub struct ExportWorker;

impl ExportWorker {
    /// Run an export on a new thread.
    pub fn spawn(
        engine: Arc<ExportEngine>,
        questions: Vec<Question>,
        options: ExportOptions,
        destination: PathBuf,
    ) -> ExportHandle {
        Self::spawn_guarded(engine, questions, options, destination, None)
    }

    fn spawn_guarded(
        engine: Arc<ExportEngine>,
        questions: Vec<Question>,
        options: ExportOptions,
        destination: PathBuf,
        guard: Option<DestinationGuard>,
    ) -> ExportHandle {
        // one progress event per question plus the terminal event
        let (tx, rx) = bounded(questions.len() + 2);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let target = destination.clone();

        log::debug!(
            "Spawning {} export of {} questions to {}",
            options.format,
            questions.len(),
            destination.display()
        );

        let thread = thread::spawn(move || {
            let _guard = guard;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run(&engine, &questions, &options, &target, &flag, &tx)
            }));
            outcome.unwrap_or_else(|_| {
                log::error!("Export to {} panicked", target.display());
                let _ = tx.send(ExportEvent::Failed(PANICKED.to_string()));
                Err(Error::Other(PANICKED.to_string()))
            })
        });

        ExportHandle {
            events: rx,
            cancel,
            destination,
            thread: Some(thread),
        }
    }
}

fn run(
    engine: &ExportEngine,
    questions: &[Question],
    options: &ExportOptions,
    destination: &Path,
    cancel: &AtomicBool,
    tx: &Sender<ExportEvent>,
) -> Result<ExportSummary> {
    let mut progress = |pct: u8| {
        let _ = tx.send(ExportEvent::Progress(pct));
    };
    let result = engine.export_inner(questions, options, destination, &mut progress, Some(cancel));

    let event = match &result {
        Ok(summary) => ExportEvent::Finished(summary.clone()),
        Err(e) => {
            log::error!("Export to {} failed: {}", destination.display(), e);
            ExportEvent::Failed(e.to_string())
        }
    };
    // the receiver may already be gone
    let _ = tx.send(event);
    result
}

/// Handle to a running export.
pub struct ExportHandle {
    events: Receiver<ExportEvent>,
    cancel: Arc<AtomicBool>,
    destination: PathBuf,
    thread: Option<JoinHandle<Result<ExportSummary>>>,
}

impl ExportHandle {
    /// Channel of progress and completion events.
    pub fn events(&self) -> &Receiver<ExportEvent> {
        &self.events
    }

    /// Destination being written.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Request cancellation. Takes effect before the next question.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Whether the worker thread has ended.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the export ends and return its outcome.
    pub fn wait(mut self) -> Result<ExportSummary> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|_| Err(Error::Other(PANICKED.to_string()))),
            None => Err(Error::Other("export already joined".to_string())),
        }
    }
}

/// Tracks destinations with an export in flight.
///
/// Spawning a second export to a destination that is still being written is
/// rejected; exports to distinct destinations run concurrently.
#[derive(Clone)]
pub struct ExportSession {
    engine: Arc<ExportEngine>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ExportSession {
    /// Create a session that exports through `engine`.
    pub fn new(engine: Arc<ExportEngine>) -> Self {
        Self {
            engine,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The engine used by this session.
    pub fn engine(&self) -> &Arc<ExportEngine> {
        &self.engine
    }

    /// Whether an export to `destination` is running.
    pub fn is_busy(&self, destination: &Path) -> bool {
        lock(&self.in_flight).contains(destination)
    }

    /// Number of exports in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Start an export unless one is already writing `destination`.
    pub fn spawn(
        &self,
        questions: Vec<Question>,
        options: ExportOptions,
        destination: impl Into<PathBuf>,
    ) -> Result<ExportHandle> {
        let destination = destination.into();
        if !lock(&self.in_flight).insert(destination.clone()) {
            log::warn!("Export to {} already in progress", destination.display());
            return Err(Error::DestinationBusy(destination));
        }

        let guard = DestinationGuard {
            in_flight: Arc::clone(&self.in_flight),
            destination: destination.clone(),
        };
        Ok(ExportWorker::spawn_guarded(
            Arc::clone(&self.engine),
            questions,
            options,
            destination,
            Some(guard),
        ))
    }
}

impl Default for ExportSession {
    fn default() -> Self {
        Self::new(Arc::new(ExportEngine::with_defaults()))
    }
}

fn lock(set: &Mutex<HashSet<PathBuf>>) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a destination when the worker ends.
struct DestinationGuard {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    destination: PathBuf,
}

impl Drop for DestinationGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{EncodeContext, Encoder, ExportFormat};

    /// Blocks each export until the test opens the gate.
    struct Gated {
        gate: Receiver<()>,
    }

    impl Encoder for Gated {
        fn format(&self) -> ExportFormat {
            ExportFormat::Txt
        }

        fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
            let _ = self.gate.recv();
            for _ in questions {
                ctx.check_cancelled()?;
                ctx.question_done();
            }
            Ok(b"done".to_vec())
        }
    }

    struct Exploding;

    impl Encoder for Exploding {
        fn format(&self) -> ExportFormat {
            ExportFormat::Txt
        }

        fn encode(&self, _: &[Question], _: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
            panic!("encoder bug");
        }
    }

    fn gated_engine() -> (Arc<ExportEngine>, Sender<()>) {
        let (tx, rx) = bounded(8);
        let mut engine = ExportEngine::new();
        engine.register(Arc::new(Gated { gate: rx }));
        (Arc::new(engine), tx)
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n).map(|i| Question::text_only(format!("Aufgabe {}", i))).collect()
    }

    #[test]
    fn test_events_then_finished() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        let handle = ExportWorker::spawn(
            Arc::new(ExportEngine::with_defaults()),
            questions(2),
            ExportOptions::new(ExportFormat::Txt),
            dest.clone(),
        );

        let events: Vec<_> = handle.events().iter().collect();
        assert_eq!(
            &events[..2],
            &[ExportEvent::Progress(50), ExportEvent::Progress(100)]
        );
        match events.last() {
            Some(ExportEvent::Finished(summary)) => {
                assert_eq!(summary.questions, 2);
                assert_eq!(summary.destination.as_deref(), Some(dest.as_path()));
            }
            other => panic!("unexpected terminal event: {:?}", other),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(handle.wait().is_ok());
        assert!(dest.exists());
    }

    #[test]
    fn test_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, gate) = gated_engine();
        let handle = ExportWorker::spawn(
            engine,
            questions(3),
            ExportOptions::new(ExportFormat::Txt),
            dir.path().join("out.txt"),
        );

        handle.cancel();
        gate.send(()).unwrap();

        let last = handle.events().iter().last();
        assert_eq!(last, Some(ExportEvent::Failed("export cancelled".to_string())));
        assert!(matches!(handle.wait(), Err(Error::Cancelled)));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_failure_event() {
        let handle = ExportWorker::spawn(
            Arc::new(ExportEngine::with_defaults()),
            Vec::new(),
            ExportOptions::new(ExportFormat::Json),
            PathBuf::from("never-written.json"),
        );
        let events: Vec<_> = handle.events().iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ExportEvent::Failed(_)));
        assert!(matches!(handle.wait(), Err(Error::NothingToExport)));
    }

    #[test]
    fn test_panicking_encoder_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ExportEngine::new();
        engine.register(Arc::new(Exploding));
        let session = ExportSession::new(Arc::new(engine));
        let dest = dir.path().join("out.txt");

        let handle = session
            .spawn(questions(2), ExportOptions::new(ExportFormat::Txt), &dest)
            .unwrap();
        let events: Vec<_> = handle.events().iter().collect();
        assert_eq!(events, vec![ExportEvent::Failed(PANICKED.to_string())]);
        assert!(matches!(handle.wait(), Err(Error::Other(_))));
        assert!(!session.is_busy(&dest));
        assert!(!dest.exists());
    }

    #[test]
    fn test_session_rejects_busy_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        let (engine, gate) = gated_engine();
        let session = ExportSession::new(engine);
        let options = ExportOptions::new(ExportFormat::Txt);

        let first = session.spawn(questions(1), options.clone(), &dest).unwrap();
        assert!(session.is_busy(&dest));

        let second = session.spawn(questions(1), options.clone(), &dest);
        assert!(matches!(second, Err(Error::DestinationBusy(p)) if p == dest));

        let other = session
            .spawn(questions(1), options.clone(), dir.path().join("b.txt"))
            .unwrap();
        assert_eq!(session.in_flight(), 2);

        gate.send(()).unwrap();
        gate.send(()).unwrap();
        first.wait().unwrap();
        other.wait().unwrap();

        assert!(!session.is_busy(&dest));
        let again = session.spawn(questions(1), options, &dest).unwrap();
        gate.send(()).unwrap();
        assert!(again.wait().is_ok());
    }
}
