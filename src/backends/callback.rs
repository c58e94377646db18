//! Callback backend
//!
//! Invokes a user-supplied function for every admitted record. Errors and
//! panics raised by the callback are contained at this boundary; they never
//! reach the emitting producer.

use super::{shutdown_worker, sync_worker, Command, WORKER_QUEUE_CAPACITY};
use crate::core::error::Result;
use crate::core::level::{LevelFilter, LogLevel};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// User callback invoked with `(level, domain, message)`.
pub type CallbackFn = Box<dyn Fn(LogLevel, String, String) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct CallbackWriterConfig {
    pub level: LogLevel,
    pub(crate) callback: Arc<CallbackFn>,
}

impl CallbackWriterConfig {
    pub fn new(level: LogLevel, callback: CallbackFn) -> Self {
        Self {
            level,
            callback: Arc::new(callback),
        }
    }
}

impl std::fmt::Debug for CallbackWriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallbackWriterConfig(level={})", self.level)
    }
}

fn callback_writer_thread(callback: Arc<CallbackFn>, rx: Receiver<Command>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Record(record) => {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    (callback.as_ref())(
                        record.level,
                        record.domain.clone(),
                        record.message.clone(),
                    )
                }));
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        eprintln!("[LOGGER ERROR] Callback backend failed: {}", e);
                    }
                    Err(panic_info) => {
                        let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                            (*s).to_string()
                        } else if let Some(s) = panic_info.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        eprintln!(
                            "[LOGGER CRITICAL] Callback backend panicked: {}. \
                             Other backends continue to function.",
                            panic_msg
                        );
                    }
                }
            }
            Command::Sync(ack) => {
                let _ = ack.send(());
            }
            Command::Rotate => {}
            Command::Stop => break,
        }
    }
}

pub struct CallbackBackend {
    filter: LevelFilter,
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CallbackBackend {
    pub(crate) fn new(config: CallbackWriterConfig) -> Result<Self> {
        let filter = LevelFilter::new(config.level);
        let callback = config.callback;
        let (tx, rx) = bounded(WORKER_QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("CallbackWriter".to_string())
            .spawn(move || callback_writer_thread(callback, rx))?;
        Ok(Self {
            filter,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    pub(crate) fn sender(&self) -> &Sender<Command> {
        &self.tx
    }

    pub(crate) fn sync(&self, deadline: Instant) -> bool {
        sync_worker(&self.tx, deadline)
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        shutdown_worker("CallbackWriter", &self.tx, &self.handle)
    }
}
