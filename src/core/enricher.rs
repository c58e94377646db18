//! Record enrichment on the producer thread

use super::ext_config::{ExtConfig, MessageStructure};
use super::level::LogLevel;
use super::record::Record;
use chrono::Utc;
use std::cell::RefCell;
use std::process;

// Thread-local caches so per-emit enrichment never formats or queries the
// OS more than once per thread.
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn cached_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            // Debug form is "ThreadId(N)"; keep just the number.
            let raw = format!("{:?}", std::thread::current().id());
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            *cache = Some(if digits.is_empty() { raw } else { digits });
        }
        cache.as_ref().expect("thread id cached above").clone()
    })
}

fn cached_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(std::thread::current().name().map(String::from));
        }
        cache.as_ref().expect("thread name cached above").clone()
    })
}

/// Builds records from raw messages per the instance [`ExtConfig`].
///
/// Expensive fields (hostname, process name, pid) are resolved once when the
/// config is applied; `enrich` itself does no I/O and takes no locks, since
/// it runs on every emit on the producer's thread.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    structure: MessageStructure,
    hostname: Option<String>,
    process_name: Option<String>,
    process_id: u32,
    include_tid: bool,
    include_tname: bool,
}

impl Enricher {
    /// All enrichment off, plain structuring.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ext_config(config: &ExtConfig) -> Self {
        let hostname = if config.hostname {
            gethostname::gethostname().into_string().ok()
        } else {
            None
        };
        let process_name = if config.pname {
            std::env::current_exe()
                .ok()
                .and_then(|path| path.file_name().map(|name| name.to_os_string()))
                .and_then(|name| name.into_string().ok())
        } else {
            None
        };
        Self {
            structure: config.structured,
            hostname,
            process_name,
            process_id: if config.pid { process::id() } else { 0 },
            include_tid: config.tid,
            include_tname: config.tname,
        }
    }

    pub fn structure(&self) -> MessageStructure {
        self.structure
    }

    pub fn enrich(&self, level: LogLevel, domain: &str, message: String) -> Record {
        Record {
            level,
            domain: domain.to_string(),
            message,
            timestamp: Utc::now(),
            hostname: self.hostname.clone(),
            process_name: self.process_name.clone(),
            process_id: self.process_id,
            thread_id: if self.include_tid {
                Some(cached_thread_id())
            } else {
                None
            },
            thread_name: if self.include_tname {
                cached_thread_name()
            } else {
                None
            },
            structure: self.structure,
        }
    }
}
