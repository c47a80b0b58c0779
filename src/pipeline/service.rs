//! A bounded-queue, fixed-worker-pool OCR service.
//!
//! [`OcrService`] multiplexes many callers over N worker threads, each owning
//! its own [`OcrPipeline`]. The queue has a fixed capacity; a full queue
//! blocks submitters, which is the service's only backpressure mechanism.
//! Cancellation is cooperative and observed only when an item is dequeued —
//! once a worker starts running inference the token is not reconsulted.

use crate::core::errors::OcrError;
use crate::pipeline::{OcrOutput, OcrPipeline};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Cooperative cancellation signal for a submitted request.
///
/// Cancelling only has an effect while the request is still queued; a request
/// already picked up by a worker runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to a submitted request's eventual result.
#[derive(Debug)]
pub struct Receipt {
    reply: Receiver<Result<OcrOutput, OcrError>>,
}

impl Receipt {
    /// Blocks until the request resolves.
    ///
    /// Resolves with [`OcrError::Cancelled`] when the token was cancelled
    /// before a worker picked the item up, and with [`OcrError::Disposed`]
    /// when the service shut down before the item ran.
    pub fn wait(self) -> Result<OcrOutput, OcrError> {
        self.reply.recv().unwrap_or(Err(OcrError::Disposed))
    }
}

struct WorkItem {
    image: RgbImage,
    cancel: Option<CancelToken>,
    reply: SyncSender<Result<OcrOutput, OcrError>>,
}

/// A producer/consumer OCR service over a fixed worker pool.
///
/// Construction builds one pipeline per worker through the supplied factory
/// and blocks until every worker has either finished or failed that one-time
/// call. If any worker fails, all failures are aggregated into
/// [`OcrError::Construction`], every started thread is joined, and the
/// constructor returns the error — no threads leak.
#[derive(Debug)]
pub struct OcrService {
    sender: Mutex<Option<SyncSender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    disposing: Arc<AtomicBool>,
}

impl OcrService {
    /// Starts `worker_count` workers over a queue of `queue_capacity`.
    ///
    /// The factory is called exactly once per worker, on that worker's
    /// thread, with the worker's index.
    pub fn new<F>(factory: F, worker_count: usize, queue_capacity: usize) -> Result<Self, OcrError>
    where
        F: Fn(usize) -> Result<OcrPipeline, OcrError> + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::sync_channel::<WorkItem>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let disposing = Arc::new(AtomicBool::new(false));
        let factory = Arc::new(factory);

        // Startup barrier: every worker reports its one-time factory result
        // here, and the constructor blocks until all of them have.
        let (startup_sender, startup_receiver) = mpsc::channel::<Result<(), String>>();

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let factory = Arc::clone(&factory);
            let receiver = Arc::clone(&receiver);
            let disposing = Arc::clone(&disposing);
            let startup = startup_sender.clone();
            handles.push(std::thread::spawn(move || match factory(id) {
                Ok(pipeline) => {
                    if startup.send(Ok(())).is_ok() {
                        worker_loop(id, pipeline, receiver, disposing);
                    }
                }
                Err(e) => {
                    let _ = startup.send(Err(format!("worker {id}: {e}")));
                }
            }));
        }
        drop(startup_sender);

        let mut failures = Vec::new();
        for _ in 0..worker_count {
            match startup_receiver.recv() {
                Ok(Ok(())) => {}
                Ok(Err(message)) => failures.push(message),
                Err(_) => failures.push("worker thread exited during startup".to_string()),
            }
        }

        if !failures.is_empty() {
            // Closing the queue makes the successfully started workers exit
            // their consume loop; join everything before reporting.
            drop(sender);
            for handle in handles {
                let _ = handle.join();
            }
            warn!(failed = failures.len(), "service startup failed");
            return Err(OcrError::Construction { failures });
        }

        debug!(workers = worker_count, queue_capacity, "service started");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            disposing,
        })
    }

    /// Enqueues an image for OCR, blocking while the queue is at capacity.
    ///
    /// Returns [`OcrError::Disposed`] once [`dispose`] has begun. The
    /// optional token cancels the request as long as it is still queued.
    ///
    /// [`dispose`]: OcrService::dispose
    pub fn submit(
        &self,
        image: RgbImage,
        cancel: Option<CancelToken>,
    ) -> Result<Receipt, OcrError> {
        if self.disposing.load(Ordering::SeqCst) {
            return Err(OcrError::Disposed);
        }
        // Clone the sender out of the lock so a full queue blocks only this
        // caller, not every other submitter.
        let sender = match self.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let sender = sender.ok_or(OcrError::Disposed)?;

        let (reply_sender, reply_receiver) = mpsc::sync_channel(1);
        sender
            .send(WorkItem {
                image,
                cancel,
                reply: reply_sender,
            })
            .map_err(|_| OcrError::Disposed)?;
        Ok(Receipt {
            reply: reply_receiver,
        })
    }

    /// Shuts the service down: rejects new submissions, drains the workers,
    /// and joins every worker thread. Idempotent.
    pub fn dispose(&self) {
        if self.disposing.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.sender.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
        let handles = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            let _ = handle.join();
        }
        debug!("service disposed");
    }
}

impl Drop for OcrService {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn worker_loop(
    id: usize,
    pipeline: OcrPipeline,
    receiver: Arc<Mutex<Receiver<WorkItem>>>,
    disposing: Arc<AtomicBool>,
) {
    loop {
        let item = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        let item = match item {
            Ok(item) => item,
            // Queue closed: the service is shutting down.
            Err(_) => break,
        };

        let skip = disposing.load(Ordering::SeqCst)
            || item.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        if skip {
            let _ = item.reply.send(Err(OcrError::Cancelled));
            continue;
        }

        let result = pipeline.run_rgb(&item.image);
        if let Err(e) = &result {
            debug!(worker = id, error = %e, "request failed");
        }
        let _ = item.reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::core::pool::PoolPolicy;
    use crate::testkit::{create_test_image, FakeModel};
    use ndarray::ArrayD;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Detection fake that sleeps, then reports no text. The counter tracks
    /// how many forward passes actually ran.
    fn slow_blank_detector(delay: Duration, runs: Arc<AtomicUsize>) -> FakeModel {
        FakeModel::with("fake-det", move |input| {
            std::thread::sleep(delay);
            runs.fetch_add(1, Ordering::SeqCst);
            let (batch, _c, h, w) = input.dim();
            Ok(ArrayD::zeros(ndarray::IxDyn(&[batch, 1, h, w])))
        })
    }

    fn pipeline_factory(
        delay: Duration,
        runs: Arc<AtomicUsize>,
    ) -> impl Fn(usize) -> Result<OcrPipeline, OcrError> + Send + Sync + 'static {
        move |_id| {
            OcrPipeline::builder(PipelineConfig::default())
                .detection_model(
                    Arc::new(slow_blank_detector(delay, Arc::clone(&runs))),
                    PoolPolicy::Unlimited,
                )
                .recognition_model(
                    Arc::new(FakeModel::constant("fake-rec", vec![1, 1, 2], vec![0.9, 0.1])),
                    PoolPolicy::Unlimited,
                    vec!['a'],
                )
                .build()
        }
    }

    #[test]
    fn submitted_items_resolve() {
        let runs = Arc::new(AtomicUsize::new(0));
        let service =
            OcrService::new(pipeline_factory(Duration::ZERO, Arc::clone(&runs)), 2, 4)
                .expect("service");

        let receipts: Vec<Receipt> = (0..4)
            .map(|_| service.submit(create_test_image(64, 64), None).expect("submit"))
            .collect();
        for receipt in receipts {
            let output = receipt.wait().expect("result");
            assert!(output.regions.is_empty());
        }
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn full_queue_blocks_the_submitter() {
        let runs = Arc::new(AtomicUsize::new(0));
        let service = Arc::new(
            OcrService::new(
                pipeline_factory(Duration::from_millis(300), Arc::clone(&runs)),
                1,
                1,
            )
            .expect("service"),
        );

        // Item one occupies the worker; item two fills the queue.
        let first = service.submit(create_test_image(32, 32), None).expect("submit");
        std::thread::sleep(Duration::from_millis(50));
        let second = service.submit(create_test_image(32, 32), None).expect("submit");

        let submitted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&submitted);
        let service2 = Arc::clone(&service);
        let submitter = std::thread::spawn(move || {
            let receipt = service2
                .submit(create_test_image(32, 32), None)
                .expect("submit");
            flag.store(true, Ordering::SeqCst);
            receipt
        });

        // The third submit must still be blocked on the full queue.
        std::thread::sleep(Duration::from_millis(100));
        assert!(!submitted.load(Ordering::SeqCst));

        first.wait().expect("first");
        let third = submitter.join().expect("join submitter");
        assert!(submitted.load(Ordering::SeqCst));
        second.wait().expect("second");
        third.wait().expect("third");
    }

    #[test]
    fn all_construction_failures_are_aggregated() {
        let result = OcrService::new(
            |id| -> Result<OcrPipeline, OcrError> {
                Err(OcrError::config(format!("model missing for worker {id}")))
            },
            3,
            2,
        );
        match result {
            Err(OcrError::Construction { failures }) => {
                assert_eq!(failures.len(), 3);
                assert!(failures.iter().any(|f| f.contains("worker 0")));
                assert!(failures.iter().any(|f| f.contains("worker 2")));
            }
            other => panic!("expected Construction error, got {other:?}"),
        }
    }

    #[test]
    fn partial_construction_failure_tears_everything_down() {
        let runs = Arc::new(AtomicUsize::new(0));
        let factory = pipeline_factory(Duration::ZERO, Arc::clone(&runs));
        let result = OcrService::new(
            move |id| {
                if id == 1 {
                    Err(OcrError::config("worker 1 cannot load its model"))
                } else {
                    factory(id)
                }
            },
            2,
            2,
        );
        match result {
            Err(OcrError::Construction { failures }) => assert_eq!(failures.len(), 1),
            other => panic!("expected Construction error, got {other:?}"),
        }
    }

    #[test]
    fn cancellation_before_dequeue_skips_inference() {
        let runs = Arc::new(AtomicUsize::new(0));
        let service = OcrService::new(
            pipeline_factory(Duration::from_millis(200), Arc::clone(&runs)),
            1,
            2,
        )
        .expect("service");

        // The first item occupies the single worker; the second waits in the
        // queue and is cancelled there.
        let first = service.submit(create_test_image(32, 32), None).expect("submit");
        std::thread::sleep(Duration::from_millis(50));

        let token = CancelToken::new();
        let second = service
            .submit(create_test_image(32, 32), Some(token.clone()))
            .expect("submit");
        token.cancel();

        assert!(matches!(second.wait(), Err(OcrError::Cancelled)));
        first.wait().expect("first");
        // Only the first item's detection pass ever ran.
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_after_dispose_is_rejected() {
        let runs = Arc::new(AtomicUsize::new(0));
        let service =
            OcrService::new(pipeline_factory(Duration::ZERO, runs), 1, 1).expect("service");
        service.dispose();
        let result = service.submit(create_test_image(16, 16), None);
        assert!(matches!(result, Err(OcrError::Disposed)));
        // Disposing again is a no-op.
        service.dispose();
    }
}
