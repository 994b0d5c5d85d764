/// Nova Engine - global services shared by every renderer instance
///
/// This module owns the process-wide logger and the backend plugin registry.
/// Both live in thread-safe static storage behind RwLocks.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;
use rustc_hash::FxHashMap;
use crate::config::RendererConfig;
use crate::error::Result;
use crate::graphics_device::GraphicsDevice;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Factory building a graphics device for a validated configuration
pub type BackendFactory =
    Arc<dyn Fn(&RendererConfig) -> Result<Box<dyn GraphicsDevice>> + Send + Sync>;

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Global backend registry, keyed by backend name
static BACKENDS: OnceLock<RwLock<FxHashMap<String, BackendFactory>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

fn backends() -> &'static RwLock<FxHashMap<String, BackendFactory>> {
    BACKENDS.get_or_init(|| RwLock::new(FxHashMap::default()))
}

// ===== PUBLIC API =====

/// Engine-wide services
///
/// # Example
///
/// ```no_run
/// use nova_render::nova::{Engine, RendererConfig};
///
/// // A backend crate registers its factories once at startup
/// // nova_render_soft::register()?;
///
/// let config = RendererConfig::default();
/// let device = Engine::create_device("state_machine", &config)?;
/// # Ok::<(), nova_render::nova::Error>(())
/// ```
pub struct Engine;

impl Engine {
    // ===== BACKEND REGISTRY =====

    /// Register a backend factory under `name`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty
    /// - A backend with the same name is already registered
    /// - The registry lock is poisoned
    pub fn register_backend<F>(name: &str, factory: F) -> Result<()>
    where
        F: Fn(&RendererConfig) -> Result<Box<dyn GraphicsDevice>> + Send + Sync + 'static,
    {
        if name.is_empty() {
            crate::engine_bail!(InitializationFailed, "nova::Engine", "Backend name must not be empty");
        }

        let mut lock = backends().write()
            .map_err(|_| crate::engine_err!(BackendError, "nova::Engine", "Backend registry lock poisoned"))?;

        if lock.contains_key(name) {
            crate::engine_bail!(
                InitializationFailed,
                "nova::Engine",
                "Backend '{}' already registered. Call Engine::unregister_backend() first.",
                name
            );
        }

        lock.insert(name.to_string(), Arc::new(factory));
        crate::engine_info!("nova::Engine", "Backend '{}' registered", name);
        Ok(())
    }

    /// Remove a backend factory
    pub fn unregister_backend(name: &str) -> Result<()> {
        let mut lock = backends().write()
            .map_err(|_| crate::engine_err!(BackendError, "nova::Engine", "Backend registry lock poisoned"))?;

        if lock.remove(name).is_none() {
            crate::engine_bail!(InitializationFailed, "nova::Engine", "Backend '{}' not registered", name);
        }

        crate::engine_info!("nova::Engine", "Backend '{}' unregistered", name);
        Ok(())
    }

    /// Whether a backend is registered under `name`
    pub fn has_backend(name: &str) -> bool {
        backends().read().map(|lock| lock.contains_key(name)).unwrap_or(false)
    }

    /// Names of every registered backend, sorted
    pub fn backend_names() -> Vec<String> {
        let mut names: Vec<String> = backends()
            .read()
            .map(|lock| lock.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Validate `config` and build a device with the named backend
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` if the configuration is invalid
    /// - `InitializationFailed` if no backend is registered under `name`
    /// - whatever the backend factory reports
    pub fn create_device(name: &str, config: &RendererConfig) -> Result<Box<dyn GraphicsDevice>> {
        config.validate()?;

        // Clone the factory out so the registry lock is not held while it runs
        let factory = {
            let lock = backends().read()
                .map_err(|_| crate::engine_err!(BackendError, "nova::Engine", "Backend registry lock poisoned"))?;
            lock.get(name).cloned()
        };

        let factory = match factory {
            Some(factory) => factory,
            None => crate::engine_bail!(
                InitializationFailed,
                "nova::Engine",
                "Unknown backend '{}'. Registered: {:?}",
                name,
                Self::backend_names()
            ),
        };

        let device = factory(config)?;
        crate::engine_info!(
            "nova::Engine",
            "Device created for '{}' with backend '{}'",
            config.app_name,
            name
        );
        Ok(device)
    }

    /// Clear the backend registry (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Ok(mut lock) = backends().write() {
            lock.clear();
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, editor console, etc.)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nova_render::nova::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
