//! Function instrumentation
//!
//! Every instrumented invocation runs inside a zone frame (inheriting the
//! active trace id, or starting a new trace) and produces a start entry
//! followed by exactly one completion or failure entry carrying the
//! elapsed wall-clock time.
//!
//! The wrapped code's behavior is never altered: values and `Err`s are
//! returned as-is and panics are resumed with their original payload after
//! being logged.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use loglens_core_types::schema::{ANONYMOUS_LOGGER, ATTR_LOGGER};

use crate::entry::{LogEntry, LogLevel};
use crate::facade::LogLens;
use crate::zone::{ZoneContext, Zoned};

/// Per-wrapper settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapOptions {
    /// Logger name; defaults to the wrapped function's name
    pub logger: Option<String>,
    /// Run inside a frame but emit no entries
    pub skip_log: bool,
}

impl WrapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn skip_log(mut self, skip_log: bool) -> Self {
        self.skip_log = skip_log;
        self
    }

    /// Fill in the logger name from `F`'s type when none was given
    fn named_after<F>(mut self) -> Self {
        if self.logger.is_none() {
            self.logger = Some(function_name::<F>());
        }
        self
    }

    fn logger_name(&self) -> String {
        self.logger
            .clone()
            .unwrap_or_else(|| ANONYMOUS_LOGGER.to_string())
    }
}

/// Name of a function item, or `anonymous` for anything unnamed
///
/// Closures, fn pointers and trait objects have no name of their own.
/// `Box`, `Arc`, `Rc` and references are seen through.
pub fn function_name<F>() -> String {
    name_from_type(std::any::type_name::<F>()).unwrap_or_else(|| ANONYMOUS_LOGGER.to_string())
}

fn name_from_type(full: &str) -> Option<String> {
    let full = full.trim_start_matches('&').trim_start_matches("mut ");
    if full.contains("{{closure}}") || !full.starts_with(is_ident_start) {
        return None;
    }
    // trait objects and fn pointers (`fn(..)`, `unsafe fn`, `extern "C" fn`)
    if ["dyn ", "fn(", "unsafe ", "extern "].iter().any(|prefix| full.starts_with(prefix)) {
        return None;
    }

    let path = strip_generics(full);
    let name = path.rsplit("::").next()?;
    if matches!(name, "Box" | "Arc" | "Rc") {
        let inner = full.get(full.find('<')? + 1..full.rfind('>')?)?;
        return name_from_type(first_type_argument(inner));
    }
    let is_ident = name.starts_with(is_ident_start)
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_ident.then(|| name.to_string())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// `T` of `T, A` when a pointer's allocator argument is printed
fn first_type_argument(arguments: &str) -> &str {
    let mut depth = 0usize;
    let mut previous = '\0';
    for (index, c) in arguments.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' if previous != '-' => depth = depth.saturating_sub(1),
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return arguments[..index].trim(),
            _ => {}
        }
        previous = c;
    }
    arguments
}

/// Drop every `<..>` group, ignoring the `>` of `->`
fn strip_generics(path: &str) -> String {
    let mut depth = 0usize;
    let mut previous = '\0';
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '<' => depth += 1,
            '>' if previous != '-' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
        previous = c;
    }
    out
}

/// Bookkeeping for one instrumented invocation
struct Invocation<'a> {
    lens: &'a LogLens,
    logger: String,
    skip_log: bool,
    started: Instant,
}

impl<'a> Invocation<'a> {
    /// Must be called inside the invocation's frame.
    fn begin(lens: &'a LogLens, options: &WrapOptions) -> Self {
        let invocation = Self {
            lens,
            logger: options.logger_name(),
            skip_log: options.skip_log,
            started: Instant::now(),
        };
        invocation.emit(LogLevel::Info, format!("{} called", invocation.logger), None);
        invocation
    }

    fn completed(&self) {
        let elapsed = self.elapsed_ms();
        self.emit(LogLevel::Info, format!("{} completed", self.logger), Some(elapsed));
    }

    fn failed(&self, description: &str) {
        let elapsed = self.elapsed_ms();
        self.emit(
            LogLevel::Error,
            format!("{} failed: {}", self.logger, description),
            Some(elapsed),
        );
    }

    fn finish<R>(&self, result: &R, classify: impl Fn(&R) -> Option<String>) {
        match classify(result) {
            Some(description) => self.failed(&description),
            None => self.completed(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn emit(&self, level: LogLevel, message: String, elapsed_ms: Option<u64>) {
        if self.skip_log {
            return;
        }
        let mut entry = LogEntry::new(level, self.logger.clone(), message)
            .at(self.lens.clock().now())
            .with_trace_id(self.lens.zone().trace_id());
        entry.execution_time_ms = elapsed_ms;
        self.lens.buffer().add_log(entry);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn never_failed<R>(_: &R) -> Option<String> {
    None
}

fn err_description<T, E: std::fmt::Display>(result: &Result<T, E>) -> Option<String> {
    result.as_ref().err().map(ToString::to_string)
}

impl LogLens {
    /// Frame for a new invocation: same trace as the caller, or a fresh one
    fn invocation_context(&self, options: &WrapOptions) -> ZoneContext {
        let context = ZoneContext::new().with_attribute(ATTR_LOGGER, options.logger_name());
        match self.zone().trace_id() {
            Some(trace_id) => context.with_trace_id(trace_id),
            None => context,
        }
    }

    fn instrument<F, R>(&self, options: &WrapOptions, f: F, classify: impl Fn(&R) -> Option<String>) -> R
    where
        F: FnOnce() -> R,
    {
        self.zone().run(self.invocation_context(options), || {
            let invocation = Invocation::begin(self, options);
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(result) => {
                    invocation.finish(&result, classify);
                    result
                }
                Err(payload) => {
                    invocation.failed(&panic_message(payload.as_ref()));
                    panic::resume_unwind(payload)
                }
            }
        })
    }

    /// The frame is opened when this is called, so the invocation inherits
    /// the trace active at call time even if it is polled elsewhere.
    fn instrument_async<Fut, C>(
        &self,
        options: &WrapOptions,
        future: Fut,
        classify: C,
    ) -> Zoned<impl Future<Output = Fut::Output>>
    where
        Fut: Future,
        C: Fn(&Fut::Output) -> Option<String>,
    {
        let context = self.invocation_context(options);
        let lens = self.clone();
        let options = options.clone();
        let body = async move {
            let invocation = Invocation::begin(&lens, &options);
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => {
                    invocation.finish(&result, classify);
                    result
                }
                Err(payload) => {
                    invocation.failed(&panic_message(payload.as_ref()));
                    panic::resume_unwind(payload)
                }
            }
        };
        self.zone().run_async(context, body)
    }

    /// Instrument one synchronous invocation
    pub fn call<F, R>(&self, options: &WrapOptions, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.instrument(options, f, never_failed)
    }

    /// Instrument one synchronous invocation whose `Err` counts as a failure
    pub fn try_call<F, T, E>(&self, options: &WrapOptions, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display,
    {
        self.instrument(options, f, err_description)
    }

    /// Instrument one asynchronous invocation
    ///
    /// The trace is taken from the caller's frame at the time of this call.
    /// The elapsed time includes every suspension of `future`.
    pub fn call_async<Fut>(&self, options: &WrapOptions, future: Fut) -> Zoned<impl Future<Output = Fut::Output>>
    where
        Fut: Future,
    {
        self.instrument_async(options, future, never_failed)
    }

    /// Instrument one asynchronous invocation whose `Err` counts as a failure
    pub fn try_call_async<Fut, T, E>(
        &self,
        options: &WrapOptions,
        future: Fut,
    ) -> Zoned<impl Future<Output = Result<T, E>>>
    where
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.instrument_async(options, future, err_description)
    }

    /// Wrap `f` so every call is instrumented
    ///
    /// Multi-argument functions take their arguments as a tuple.
    pub fn wrap<A, R, F>(&self, options: WrapOptions, f: F) -> impl Fn(A) -> R
    where
        F: Fn(A) -> R,
    {
        let lens = self.clone();
        let options = options.named_after::<F>();
        move |args| lens.call(&options, || f(args))
    }

    /// Like [`LogLens::wrap`], treating `Err` returns as failures
    pub fn wrap_fallible<A, T, E, F>(&self, options: WrapOptions, f: F) -> impl Fn(A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let lens = self.clone();
        let options = options.named_after::<F>();
        move |args| lens.try_call(&options, || f(args))
    }

    /// Wrap an async function so every call is instrumented
    pub fn wrap_async<A, Fut, F>(&self, options: WrapOptions, f: F) -> impl Fn(A) -> BoxFuture<'static, Fut::Output>
    where
        F: Fn(A) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send,
    {
        let lens = self.clone();
        let options = options.named_after::<F>();
        move |args| {
            let future = f(args);
            lens.call_async(&options, future).boxed()
        }
    }

    /// Like [`LogLens::wrap_async`], treating `Err` outputs as failures
    pub fn wrap_async_fallible<A, Fut, T, E, F>(
        &self,
        options: WrapOptions,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let lens = self.clone();
        let options = options.named_after::<F>();
        move |args| {
            let future = f(args);
            lens.try_call_async(&options, future).boxed()
        }
    }
}
