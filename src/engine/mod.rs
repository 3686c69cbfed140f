//! Audio-core scheduling and the control-core handoff.
//!
//! [`audio_scheduler`] splits into two halves: the [`AudioTask`] lives
//! on the audio core and invokes the registered callback once per
//! sample period; the [`ControlHandle`] lives on the control core and
//! drives the start/stop lifecycle. The halves communicate through
//! lock-free flags and a bounded event queue behind a short critical
//! section; the audio side never blocks and never allocates.
//!
//! Stopping is two-phase: the control side requests, the audio side
//! finishes the frame in flight, emits [`EngineEvent::Stopped`] and
//! halts. Only then may the control side reconfigure (swap callbacks,
//! rebuild voice pools) and start again.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Deque;
use spin::Mutex;

const EVENT_QUEUE_CAPACITY: usize = 32;

/// One stereo sample period.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    pub const SILENCE: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    #[inline]
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn mono(sample: f32) -> Self {
        Self {
            left: sample,
            right: sample,
        }
    }
}

/// Notifications crossing from the audio context to the control
/// context's poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The audio loop observed the stop request and halted; the control
    /// side may now reconfigure safely.
    Stopped,
    /// A voice's amplitude envelope finished its release.
    VoiceFreed(usize),
}

#[derive(Debug)]
struct SharedState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    events: Mutex<Deque<EngineEvent, EVENT_QUEUE_CAPACITY>>,
}

impl SharedState {
    fn push_event(&self, event: EngineEvent) {
        // Bounded and non-blocking: a full queue drops the new event
        // rather than stalling the audio context.
        let mut events = self.events.lock();
        let _ = events.push_back(event);
    }
}

/// Create a scheduler pair. The audio callback is registered on the
/// [`AudioTask`] afterwards, so it can capture an [`EventEmitter`]
/// cloned off the task first.
pub fn audio_scheduler<CB>() -> (AudioTask<CB>, ControlHandle)
where
    CB: FnMut(Frame) -> Frame,
{
    let shared = Arc::new(SharedState {
        running: AtomicBool::new(false),
        stop_requested: AtomicBool::new(false),
        events: Mutex::new(Deque::new()),
    });
    (
        AudioTask {
            shared: Arc::clone(&shared),
            callback: None,
        },
        ControlHandle { shared },
    )
}

/// Audio-core half. Owned by whatever drives the hardware sample clock
/// (I2S interrupt, DMA half-complete handler, test loop).
#[derive(Debug)]
pub struct AudioTask<CB> {
    shared: Arc<SharedState>,
    callback: Option<CB>,
}

impl<CB> AudioTask<CB>
where
    CB: FnMut(Frame) -> Frame,
{
    /// Produce one output frame. While stopped, or with no callback
    /// registered, this returns silence. A stop request is honored only
    /// after the frame in flight has been produced.
    #[inline]
    pub fn process(&mut self, input: Frame) -> Frame {
        if !self.shared.running.load(Ordering::Acquire) {
            return Frame::SILENCE;
        }

        let output = match self.callback.as_mut() {
            Some(callback) => callback(input),
            None => Frame::SILENCE,
        };

        if self.shared.stop_requested.swap(false, Ordering::AcqRel) {
            self.shared.running.store(false, Ordering::Release);
            self.shared.push_event(EngineEvent::Stopped);
        }

        output
    }

    /// Block-render convenience wrapper around [`process`](Self::process).
    pub fn render(&mut self, input: &[Frame], output: &mut [Frame]) {
        for (in_frame, out_frame) in input.iter().zip(output.iter_mut()) {
            *out_frame = self.process(*in_frame);
        }
    }

    /// Register or swap the audio callback. Ignored while running: the
    /// callback may only change once the stop handshake has completed.
    pub fn register_callback(&mut self, callback: CB) -> bool {
        if self.shared.running.load(Ordering::Acquire) {
            return false;
        }
        self.callback = Some(callback);
        true
    }

    /// An emitter the callback can capture to push events (voice freed,
    /// etc.) toward the control context.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Cloneable handle for pushing events from inside the audio callback.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    shared: Arc<SharedState>,
}

impl EventEmitter {
    #[inline]
    pub fn emit(&self, event: EngineEvent) {
        self.shared.push_event(event);
    }
}

/// Control-core half of the scheduler.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    shared: Arc<SharedState>,
}

impl ControlHandle {
    pub fn start(&self) {
        if !self.shared.running.load(Ordering::Acquire) {
            // Clear any stale stop request before the loop can see the
            // running flag.
            self.shared.stop_requested.store(false, Ordering::Release);
            self.shared.running.store(true, Ordering::Release);
            log::debug!("audio task started");
        }
    }

    /// First phase of the stop handshake. The audio loop acknowledges
    /// with [`EngineEvent::Stopped`] after its current frame. Stopping
    /// an already-stopped task acknowledges immediately.
    pub fn request_stop(&self) {
        if self.shared.running.load(Ordering::Acquire) {
            self.shared.stop_requested.store(true, Ordering::Release);
            log::debug!("audio task stop requested");
        } else {
            self.shared.push_event(EngineEvent::Stopped);
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Drain one pending event, oldest first.
    pub fn poll_event(&self) -> Option<EngineEvent> {
        self.shared.events.lock().pop_front()
    }
}
