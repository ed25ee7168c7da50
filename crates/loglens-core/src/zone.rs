//! Execution-local context propagation
//!
//! A [`Zone`] makes a trace id and a metadata bag available to arbitrarily
//! deep call chains without threading them through every signature.
//!
//! Frames form a persistent parent-linked stack. The active top lives in a
//! thread-local slot keyed by zone id:
//!
//! - [`Zone::run`] installs a new frame for the duration of a closure and
//!   restores the previous top on every exit path, unwinding included.
//! - [`Zone::run_async`] creates the frame when it is called and installs it
//!   around every `poll` of the wrapped future, so each resumption after an
//!   `.await` observes its own frame regardless of what other tasks did on
//!   the same thread in between.
//! - [`Zone::bind`] captures the currently active frame for a future that is
//!   about to be spawned.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use loglens_core_types::TraceId;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static ZONE_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE: RefCell<HashMap<u64, Arc<Frame>>> = RefCell::new(HashMap::new());
}

/// Input for a new frame
///
/// A missing trace id is generated when the frame is pushed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneContext {
    pub trace_id: Option<TraceId>,
    pub attributes: Map<String, Value>,
}

impl ZoneContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// An active frame as observed by code running inside it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFrame {
    pub trace_id: TraceId,
    pub attributes: Map<String, Value>,
}

/// Diagnostic snapshot of a zone
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub is_patched: bool,
    pub stack_depth: usize,
    pub current_trace_id: Option<TraceId>,
}

#[derive(Debug)]
struct Frame {
    context: ContextFrame,
    depth: usize,
    // Keeps the enclosing frames alive for as long as this one is reachable.
    _parent: Option<Arc<Frame>>,
}

#[derive(Debug)]
struct ZoneInner {
    id: u64,
    enabled: AtomicBool,
}

/// Context stack handle
///
/// Clones share the same zone. Separate `Zone::new()` instances are fully
/// isolated from each other.
#[derive(Debug, Clone)]
pub struct Zone {
    inner: Arc<ZoneInner>,
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

impl Zone {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ZoneInner {
                id: ZONE_ID.fetch_add(1, Ordering::Relaxed),
                enabled: AtomicBool::new(false),
            }),
        }
    }

    /// Process-unique id of this zone
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Enable context tracking
    ///
    /// A second call without an intervening [`Zone::reset`] only emits a
    /// warning; existing frames are left untouched.
    pub fn init(&self) {
        if self.inner.enabled.swap(true, Ordering::AcqRel) {
            warn!(
                component = module_path!(),
                op = "zone_init",
                zone_id = self.inner.id,
                "zone already initialized; call reset() before initializing again"
            );
            return;
        }
        debug!(
            component = module_path!(),
            op = "zone_init",
            zone_id = self.inner.id,
            "zone tracking enabled"
        );
    }

    /// Disable tracking and drop the calling thread's active frames
    ///
    /// Frames captured by in-flight futures are unaffected and are restored
    /// by their own guards.
    pub fn reset(&self) {
        self.inner.enabled.store(false, Ordering::Release);
        swap_active(self.inner.id, None);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Run `f` inside a new frame
    ///
    /// The frame is popped when `f` returns or unwinds; `f`'s result is
    /// returned unchanged.
    pub fn run<F, R>(&self, context: ZoneContext, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let frame = self.new_frame(context);
        let _enter = Enter::new(self.inner.id, Some(frame));
        f()
    }

    /// Run `future` inside a new frame
    ///
    /// The frame's parent is whatever is active when `run_async` is called,
    /// not when the returned future is first polled.
    pub fn run_async<F>(&self, context: ZoneContext, future: F) -> Zoned<F>
    where
        F: Future,
    {
        let frame = self.new_frame(context);
        Zoned {
            zone_id: self.inner.id,
            frame: Some(frame),
            future: Box::pin(future),
        }
    }

    /// Attach the currently active frame (if any) to `future`
    ///
    /// Use this before handing a future to `tokio::spawn` so the spawned task
    /// keeps its launch-time context.
    pub fn bind<F>(&self, future: F) -> Zoned<F>
    where
        F: Future,
    {
        Zoned {
            zone_id: self.inner.id,
            frame: self.top(),
            future: Box::pin(future),
        }
    }

    /// Full context of the innermost frame
    pub fn current(&self) -> Option<ContextFrame> {
        self.top().map(|frame| frame.context.clone())
    }

    /// Trace id of the innermost frame
    pub fn trace_id(&self) -> Option<TraceId> {
        self.top().map(|frame| frame.context.trace_id.clone())
    }

    /// Number of frames visible to the caller (0 when idle)
    pub fn depth(&self) -> usize {
        self.top().map_or(0, |frame| frame.depth)
    }

    pub fn status(&self) -> ZoneStatus {
        let top = self.top();
        ZoneStatus {
            is_patched: self.is_enabled(),
            stack_depth: top.as_ref().map_or(0, |frame| frame.depth),
            current_trace_id: top.map(|frame| frame.context.trace_id.clone()),
        }
    }

    fn top(&self) -> Option<Arc<Frame>> {
        ACTIVE
            .try_with(|active| active.borrow().get(&self.inner.id).cloned())
            .ok()
            .flatten()
    }

    fn new_frame(&self, context: ZoneContext) -> Arc<Frame> {
        let parent = self.top();
        let depth = parent.as_ref().map_or(0, |p| p.depth) + 1;
        Arc::new(Frame {
            context: ContextFrame {
                trace_id: context.trace_id.unwrap_or_default(),
                attributes: context.attributes,
            },
            depth,
            _parent: parent,
        })
    }
}

fn swap_active(zone_id: u64, frame: Option<Arc<Frame>>) -> Option<Arc<Frame>> {
    ACTIVE
        .try_with(|active| {
            let mut active = active.borrow_mut();
            match frame {
                Some(frame) => active.insert(zone_id, frame),
                None => active.remove(&zone_id),
            }
        })
        .ok()
        .flatten()
}

/// Installs a frame on the current thread and restores the previous top on drop
struct Enter {
    zone_id: u64,
    previous: Option<Arc<Frame>>,
}

impl Enter {
    fn new(zone_id: u64, frame: Option<Arc<Frame>>) -> Self {
        let previous = swap_active(zone_id, frame);
        Self { zone_id, previous }
    }
}

impl Drop for Enter {
    fn drop(&mut self) {
        swap_active(self.zone_id, self.previous.take());
    }
}

/// Future returned by [`Zone::run_async`] and [`Zone::bind`]
#[must_use = "futures do nothing unless awaited"]
pub struct Zoned<F> {
    zone_id: u64,
    frame: Option<Arc<Frame>>,
    future: Pin<Box<F>>,
}

impl<F: Future> Future for Zoned<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _enter = Enter::new(this.zone_id, this.frame.clone());
        this.future.as_mut().poll(cx)
    }
}
