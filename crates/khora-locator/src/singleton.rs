// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One-time initialisation for process-wide instances.

use crate::error::{LocatorError, LocatorResult};
use std::fmt;
use std::sync::OnceLock;

/// Lifecycle of a [`Singleton`]. There is no way back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has been constructed yet.
    Uninitialized,
    /// The instance exists and lives until the process exits.
    Live,
}

/// A process-wide instance constructed at most once.
///
/// The first construction wins. A later [`install`](Singleton::install)
/// drops the newcomer, logs an error and returns
/// [`LocatorError::DuplicateSingleton`]; the live instance is untouched.
///
/// # Example
///
/// ```rust
/// use khora_locator::{LifecycleState, Singleton};
///
/// static COUNTER: Singleton<u32> = Singleton::new("Counter");
///
/// assert_eq!(COUNTER.state(), LifecycleState::Uninitialized);
/// assert_eq!(*COUNTER.get_or_init(|| 7), 7);
/// assert!(COUNTER.install(8).is_err());
/// assert_eq!(COUNTER.get(), Some(&7));
/// ```
pub struct Singleton<T> {
    label: &'static str,
    cell: OnceLock<T>,
}

impl<T> Singleton<T> {
    /// Creates an uninitialised singleton. `label` names it in log messages.
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            cell: OnceLock::new(),
        }
    }

    /// The label given at construction.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the live instance, if any.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        if self.cell.get().is_some() {
            LifecycleState::Live
        } else {
            LifecycleState::Uninitialized
        }
    }

    /// Returns the live instance, constructing it with `init` on first access.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(|| {
            log::info!("{} created on first access.", self.label);
            init()
        })
    }

    /// Makes `value` the live instance unless one already exists.
    pub fn install(&self, value: T) -> LocatorResult<&T> {
        let mut installed = false;
        let live = self.cell.get_or_init(|| {
            installed = true;
            value
        });

        if installed {
            log::info!("{} installed.", self.label);
            Ok(live)
        } else {
            let err = LocatorError::DuplicateSingleton { label: self.label };
            log::error!("{err}");
            Err(err)
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Singleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Singleton")
            .field("label", &self.label)
            .field("instance", &self.cell.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::thread;

    /// Records every log line so error counts can be checked.
    struct CapturingLogger {
        records: Mutex<Vec<(log::Level, String)>>,
    }

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger {
        records: Mutex::new(Vec::new()),
    };

    fn errors_mentioning(needle: &str) -> usize {
        LOGGER
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(level, message)| {
                *level == log::Level::Error && message.contains(needle)
            })
            .count()
    }

    #[test]
    fn test_starts_uninitialized() {
        let cell: Singleton<u32> = Singleton::new("Test");
        assert_eq!(cell.state(), LifecycleState::Uninitialized);
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_get_or_init_runs_once() {
        let cell = Singleton::new("Test");
        let calls = AtomicUsize::new(0);

        let first = cell.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            String::from("first")
        }) as *const String;
        let second = cell.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            String::from("second")
        }) as *const String;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(std::ptr::eq(first, second));
        assert_eq!(cell.state(), LifecycleState::Live);
    }

    #[test]
    fn test_second_install_is_discarded() {
        let cell = Singleton::new("Locator");
        let first = Arc::new(1);
        let second = Arc::new(2);

        assert!(cell.install(first.clone()).is_ok());
        let err = cell.install(second.clone()).unwrap_err();

        assert_eq!(err, LocatorError::DuplicateSingleton { label: "Locator" });
        assert!(Arc::ptr_eq(cell.get().unwrap(), &first));
        // The discarded newcomer was dropped.
        assert_eq!(Arc::strong_count(&second), 1);
    }

    #[test]
    fn test_duplicate_install_logs_one_error() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
        let cell = Singleton::new("Captured Locator");
        assert_eq!(cell.label(), "Captured Locator");

        cell.install(1).unwrap();
        assert_eq!(errors_mentioning("Captured Locator"), 0);

        assert!(cell.install(2).is_err());
        assert_eq!(errors_mentioning("Duplicate Captured Locator"), 1);
        assert_eq!(cell.get(), Some(&1));
    }

    #[test]
    fn test_install_after_lazy_init_fails() {
        let cell = Singleton::new("Locator");
        cell.get_or_init(|| 1);
        assert!(cell.install(2).is_err());
        assert_eq!(cell.get(), Some(&1));
    }

    #[test]
    fn test_concurrent_installs_keep_one_instance() {
        static CELL: Singleton<usize> = Singleton::new("Concurrent");

        let handles: Vec<_> = (0..8)
            .map(|i| thread::spawn(move || CELL.install(i).is_ok()))
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(CELL.state(), LifecycleState::Live);
    }
}
