use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::codec::{Frame, RxConfig};
use crate::dispatch::{dispatch, HmiHandler};
use crate::error::{FrameError, Result};
use crate::ring::RingBuffer;
use crate::scanner::{scan_frames, ScanOutcome};

/// Snapshot of receive-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    pub bytes_received: u64,
    pub bytes_dropped: u64,
    pub frames: u64,
    pub resyncs: u64,
    pub unknown_commands: u64,
}

#[derive(Default)]
struct Counters {
    bytes_received: AtomicU64,
    bytes_dropped: AtomicU64,
    frames: AtomicU64,
    resyncs: AtomicU64,
    unknown_commands: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RxStats {
        RxStats {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            unknown_commands: self.unknown_commands.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    ring: Mutex<RingBuffer>,
    counters: Counters,
}

/// Producer half: pushes raw bytes into the shared ring and wakes the worker.
///
/// Dropping every feeder ends the worker once pending wake-ups are drained.
#[derive(Clone)]
pub struct RxFeeder {
    shared: Arc<Shared>,
    signal: Sender<()>,
}

impl RxFeeder {
    /// Buffer `bytes` and post one wake-up.
    ///
    /// Bytes that do not fit are dropped and counted. Never waits for the
    /// worker. Returns the number of bytes accepted.
    pub fn feed(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let mut accepted = 0usize;
        let mut dropped = 0usize;
        {
            let mut ring = self.shared.ring.lock();
            for &byte in bytes {
                match ring.write(byte) {
                    Ok(()) => accepted += 1,
                    Err(_) => dropped += 1,
                }
            }
        }

        let counters = &self.shared.counters;
        counters
            .bytes_received
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        if dropped > 0 {
            counters
                .bytes_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
            warn!(dropped, accepted, "ring buffer full; dropping bytes");
        }

        match self.signal.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => trace!("wake-up already pending"),
            Err(TrySendError::Disconnected(())) => debug!("frame worker gone"),
        }

        accepted
    }

    /// Current counters.
    pub fn stats(&self) -> RxStats {
        self.shared.counters.snapshot()
    }
}

/// Consumer half: scans the ring on each wake-up and dispatches frames.
pub struct FrameWorker<H> {
    shared: Arc<Shared>,
    signal: Receiver<()>,
    handler: H,
    pending: Vec<Frame>,
}

impl<H: HmiHandler> FrameWorker<H> {
    /// Block on wake-ups until every feeder is dropped.
    pub fn run(mut self) {
        debug!("frame worker started");
        while self.signal.recv().is_ok() {
            self.pass();
        }
        debug!("frame worker stopped");
    }

    /// Handle at most one pending wake-up without blocking.
    ///
    /// Returns false when no wake-up was pending.
    pub fn poll(&mut self) -> bool {
        match self.signal.try_recv() {
            Ok(()) => {
                self.pass();
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    /// Current counters.
    pub fn stats(&self) -> RxStats {
        self.shared.counters.snapshot()
    }

    fn pass(&mut self) -> ScanOutcome {
        let pending = &mut self.pending;
        let outcome = {
            let mut ring = self.shared.ring.lock();
            scan_frames(&mut ring, |frame| pending.push(frame))
        };

        let counters = &self.shared.counters;
        counters
            .frames
            .fetch_add(outcome.frames as u64, Ordering::Relaxed);
        if outcome.resynced {
            counters.resyncs.fetch_add(1, Ordering::Relaxed);
        }

        // Ring lock is released; callbacks may take as long as they need.
        for frame in self.pending.drain(..) {
            if !dispatch(frame, &self.handler) {
                counters.unknown_commands.fetch_add(1, Ordering::Relaxed);
            }
        }

        outcome
    }
}

/// Wiring for the receive path.
pub struct RxPipeline;

impl RxPipeline {
    /// Create a connected feeder/worker pair without spawning threads.
    pub fn split<H: HmiHandler>(config: &RxConfig, handler: H) -> (RxFeeder, FrameWorker<H>) {
        let shared = Arc::new(Shared {
            ring: Mutex::new(RingBuffer::with_capacity(config.ring_capacity)),
            counters: Counters::default(),
        });
        let (tx, rx) = bounded(config.signal_depth.max(1));

        let feeder = RxFeeder {
            shared: Arc::clone(&shared),
            signal: tx,
        };
        let worker = FrameWorker {
            shared,
            signal: rx,
            handler,
            pending: Vec::new(),
        };
        (feeder, worker)
    }

    /// Spawn a reader thread over `stream` plus a frame worker thread.
    ///
    /// The reader treats read timeouts as "no data yet" and checks for
    /// shutdown between reads, so streams should carry a read timeout if
    /// [`RxHandle::shutdown`] is expected to take effect before EOF.
    pub fn spawn<R, H>(stream: R, handler: H, config: RxConfig) -> Result<RxHandle>
    where
        R: Read + Send + 'static,
        H: HmiHandler + 'static,
    {
        let (feeder, worker) = Self::split(&config, handler);
        let shared = Arc::clone(&feeder.shared);
        let stop = Arc::new(AtomicBool::new(false));

        let worker = std::thread::Builder::new()
            .name("servoplex-frame-worker".to_string())
            .spawn(move || worker.run())?;

        let reader_stop = Arc::clone(&stop);
        let chunk = config.read_chunk.max(1);
        let reader = std::thread::Builder::new()
            .name("servoplex-rx-reader".to_string())
            .spawn(move || read_loop(stream, feeder, chunk, &reader_stop))?;

        info!(
            ring_capacity = config.ring_capacity,
            read_chunk = chunk,
            "receive pipeline started"
        );

        Ok(RxHandle {
            shared,
            stop,
            reader: Some(reader),
            worker: Some(worker),
        })
    }
}

fn read_loop<R: Read>(
    mut stream: R,
    feeder: RxFeeder,
    chunk: usize,
    stop: &AtomicBool,
) -> Result<()> {
    let mut buf = vec![0u8; chunk];
    while !stop.load(Ordering::Acquire) {
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!("serial stream reached EOF");
                return Ok(());
            }
            Ok(n) => {
                trace!(bytes = n, "read chunk");
                feeder.feed(&buf[..n]);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    debug!("reader observed shutdown");
    Ok(())
}

/// Handle to a running receive pipeline.
pub struct RxHandle {
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<Result<()>>>,
    worker: Option<JoinHandle<()>>,
}

impl RxHandle {
    /// Current counters.
    pub fn stats(&self) -> RxStats {
        self.shared.counters.snapshot()
    }

    /// Ask the reader thread to stop after its current read.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// True once the reader thread has exited.
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for both threads and return the final counters.
    ///
    /// Frames already buffered are dispatched before this returns.
    pub fn join(mut self) -> Result<RxStats> {
        let read_result = match self.reader.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(thread_panicked("reader"))),
            None => Ok(()),
        };
        if let Some(handle) = self.worker.take() {
            handle.join().map_err(|_| thread_panicked("frame worker"))?;
        }
        read_result?;
        Ok(self.stats())
    }
}

impl Drop for RxHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn thread_panicked(name: &str) -> FrameError {
    FrameError::Io(std::io::Error::other(format!("{name} thread panicked")))
}
