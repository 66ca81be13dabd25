//! Logger callback bridge.
//!
//! The engine logs through `tracing`. Once a host installs a
//! [`NativeLogger`], a [`BridgeLayer`] registered as the global subscriber
//! formats each enabled event and hands it to the host callback.
//!
//! The host context pointer is owned by the slot from `minikv_set_logger`
//! until the logger is replaced or reset, at which point `destroy` runs
//! exactly once. Callbacks that are already running keep their own `Arc`,
//! so `destroy` waits for the last of them.

use crate::error::guard_value;
use crate::types::ByteSlice;
use parking_lot::{const_rwlock, RwLock};
use std::ffi::c_void;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Log levels on the wire. Higher is more verbose.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Nothing crosses the boundary.
    Off = 0,
    /// Errors only.
    Error = 1,
    /// Warnings and errors.
    Warn = 2,
    /// Informational messages.
    Info = 3,
    /// Debug output.
    Debug = 4,
    /// Everything.
    Trace = 5,
}

impl LogLevel {
    /// Parses a wire value.
    pub fn from_wire(level: i32) -> Option<Self> {
        match level {
            0 => Some(Self::Off),
            1 => Some(Self::Error),
            2 => Some(Self::Warn),
            3 => Some(Self::Info),
            4 => Some(Self::Debug),
            5 => Some(Self::Trace),
            _ => None,
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::TRACE => LogLevel::Trace,
        }
    }
}

/// Host log callback: `(context, level, message)`. The message is valid for
/// the duration of the call only.
pub type LogCallback = extern "C" fn(obj: *mut c_void, level: i32, message: *const ByteSlice);

/// Host context destructor.
pub type DestroyCallback = extern "C" fn(obj: *mut c_void);

/// A host logger, passed by value to `minikv_set_logger`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeLogger {
    /// Opaque host context.
    pub obj: *mut c_void,
    /// Receives each message.
    pub callback: LogCallback,
    /// Releases `obj`. Called exactly once.
    pub destroy: DestroyCallback,
}

// The host promises `obj` may be used from any thread.
unsafe impl Send for NativeLogger {}
unsafe impl Sync for NativeLogger {}

impl NativeLogger {
    fn emit(&self, level: LogLevel, message: &str) {
        let slice = ByteSlice::borrowed(message.as_bytes());
        (self.callback)(self.obj, level as i32, &slice);
    }
}

impl Drop for NativeLogger {
    fn drop(&mut self) {
        (self.destroy)(self.obj);
    }
}

/// Holds at most one host logger and the level threshold.
pub struct LoggerSlot {
    logger: RwLock<Option<Arc<NativeLogger>>>,
    level: AtomicI32,
}

impl Default for LoggerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerSlot {
    /// An empty slot at `Trace`, so every event crosses until the host
    /// raises the threshold.
    pub const fn new() -> Self {
        Self {
            logger: const_rwlock(None),
            level: AtomicI32::new(LogLevel::Trace as i32),
        }
    }

    /// Installs `logger`, dropping the previous one after the swap.
    pub fn install(&self, logger: NativeLogger) {
        let previous = self.logger.write().replace(Arc::new(logger));
        drop(previous);
    }

    /// Empties the slot.
    pub fn reset(&self) {
        let previous = self.logger.write().take();
        drop(previous);
    }

    /// Returns true if a logger is installed.
    pub fn is_installed(&self) -> bool {
        self.logger.read().is_some()
    }

    /// Sets the threshold.
    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as i32, Ordering::Relaxed);
    }

    /// Returns the threshold.
    pub fn level(&self) -> LogLevel {
        LogLevel::from_wire(self.level.load(Ordering::Relaxed)).unwrap_or(LogLevel::Trace)
    }

    /// Returns true if an event at `level` would cross the boundary.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.level()
    }

    /// Sends `message` to the installed logger if `level` passes the
    /// threshold.
    pub fn dispatch(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let logger = self.logger.read().clone();
        if let Some(logger) = logger {
            logger.emit(level, message);
        }
    }
}

static GLOBAL_SLOT: LoggerSlot = LoggerSlot::new();

/// Returns the process-wide slot used by the C ABI.
pub fn global_slot() -> &'static LoggerSlot {
    &GLOBAL_SLOT
}

/// A `tracing` layer forwarding events to a [`LoggerSlot`].
pub struct BridgeLayer {
    slot: &'static LoggerSlot,
}

impl BridgeLayer {
    /// A layer over `slot`.
    pub fn new(slot: &'static LoggerSlot) -> Self {
        Self { slot }
    }
}

impl<S: Subscriber> Layer<S> for BridgeLayer {
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // The threshold can change at runtime.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.slot.enabled(LogLevel::from(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = LogLevel::from(metadata.level());
        if !self.slot.enabled(level) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.slot
            .dispatch(level, &visitor.finish(metadata.target()));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self, target: &str) -> String {
        let mut line = format!("[{target}] {}", self.message);
        line.push_str(&self.fields);
        line
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

static BRIDGE_INSTALLED: OnceLock<bool> = OnceLock::new();

fn install_bridge() {
    BRIDGE_INSTALLED.get_or_init(|| {
        match tracing_subscriber::registry()
            .with(BridgeLayer::new(global_slot()))
            .try_init()
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "a global subscriber already exists; host logger not attached to it");
                false
            }
        }
    });
}

/// Installs a host logger, replacing and destroying any previous one.
///
/// Ownership of `logger.obj` moves to minikv.
#[no_mangle]
pub extern "C" fn minikv_set_logger(logger: NativeLogger) {
    guard_value((), move || {
        global_slot().install(logger);
        install_bridge();
        tracing::debug!("host logger installed");
    });
}

/// Removes and destroys the host logger.
#[no_mangle]
pub extern "C" fn minikv_reset_logger() {
    guard_value((), || global_slot().reset());
}

/// Sets the log threshold. Values outside `0..=5` are ignored.
#[no_mangle]
pub extern "C" fn minikv_set_log_level(level: i32) {
    guard_value((), || match LogLevel::from_wire(level) {
        Some(level) => global_slot().set_level(level),
        None => tracing::warn!(level, "ignoring unknown log level"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<(i32, String)>>,
        destroyed: AtomicI32,
    }

    extern "C" fn record(obj: *mut c_void, level: i32, message: *const ByteSlice) {
        let recorder = unsafe { &*obj.cast::<Recorder>() };
        let text = unsafe { String::from_utf8_lossy((*message).as_bytes()).into_owned() };
        recorder.lines.lock().push((level, text));
    }

    extern "C" fn destroy(obj: *mut c_void) {
        let recorder = unsafe { &*obj.cast::<Recorder>() };
        recorder.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn logger(recorder: &Arc<Recorder>) -> NativeLogger {
        NativeLogger {
            obj: Arc::as_ptr(recorder).cast_mut().cast(),
            callback: record,
            destroy,
        }
    }

    #[test]
    fn fresh_slot_passes_everything() {
        let slot = LoggerSlot::new();
        assert_eq!(slot.level(), LogLevel::Trace);
        assert!(slot.enabled(LogLevel::Trace));
        assert!(!slot.enabled(LogLevel::Off));
    }

    #[test]
    fn level_filtering() {
        let slot = LoggerSlot::new();
        let recorder = Arc::new(Recorder::default());
        slot.install(logger(&recorder));

        slot.dispatch(LogLevel::Trace, "t");
        slot.set_level(LogLevel::Info);
        slot.dispatch(LogLevel::Error, "e");
        slot.dispatch(LogLevel::Info, "i");
        slot.dispatch(LogLevel::Debug, "d");
        slot.set_level(LogLevel::Off);
        slot.dispatch(LogLevel::Error, "dropped");
        slot.dispatch(LogLevel::Off, "never");

        let lines = recorder.lines.lock().clone();
        assert_eq!(
            lines,
            vec![(5, "t".into()), (1, "e".into()), (3, "i".into())]
        );
    }

    #[test]
    fn destroy_runs_once_on_replace_and_reset() {
        let slot = LoggerSlot::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        slot.install(logger(&first));
        slot.install(logger(&second));
        assert_eq!(first.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(second.destroyed.load(Ordering::SeqCst), 0);

        slot.reset();
        slot.reset();
        assert_eq!(first.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(second.destroyed.load(Ordering::SeqCst), 1);
        assert!(!slot.is_installed());
    }

    #[test]
    fn bridge_layer_formats_target_message_and_fields() {
        let slot: &'static LoggerSlot = Box::leak(Box::new(LoggerSlot::new()));
        let recorder = Arc::new(Recorder::default());
        slot.install(logger(&recorder));
        slot.set_level(LogLevel::Info);

        let subscriber = tracing_subscriber::registry().with(BridgeLayer::new(slot));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "minikv::store", keys = 3, "store opened");
            tracing::debug!(target: "minikv::store", "filtered out");
            slot.set_level(LogLevel::Debug);
            tracing::debug!(target: "minikv::store", "now visible");
        });

        let lines = recorder.lines.lock().clone();
        assert_eq!(
            lines,
            vec![
                (3, "[minikv::store] store opened keys=3".into()),
                (4, "[minikv::store] now visible".into()),
            ]
        );
        slot.reset();
    }

    #[test]
    fn unknown_wire_levels() {
        assert_eq!(LogLevel::from_wire(6), None);
        assert_eq!(LogLevel::from_wire(-1), None);
        assert_eq!(LogLevel::from_wire(3), Some(LogLevel::Info));
    }
}
