/// Software device validation layer - records misuse the device detects while executing
///
/// The device thread reports problems it cannot turn into a `Result` (the
/// submission already returned): use of destroyed attachments, size-mismatched
/// copies, out-of-range buffer writes and timestamp queries. Each report is
/// counted, grouped with identical messages and forwarded to the engine logger.

use colored::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use nova_render::{engine_error, engine_warn};

/// Severity of a validation message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// Counters of reported messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings
    }
}

/// Identical messages grouped by text, in first-seen order
#[derive(Default)]
struct MessageTracker {
    counts: FxHashMap<String, u32>,
    order: Vec<String>,
}

impl MessageTracker {
    fn track_message(&mut self, message: &str) -> u32 {
        let count = self.counts.entry(message.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.order.push(message.to_string());
        }
        *count
    }
}

/// Per-device validation log
///
/// Shared between the device thread (which reports) and tests (which
/// inspect it). Reporting on a disabled log is a no-op.
pub struct ValidationLog {
    enabled: bool,
    errors: AtomicU32,
    warnings: AtomicU32,
    tracker: Mutex<MessageTracker>,
}

impl ValidationLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            tracker: Mutex::new(MessageTracker::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one message
    pub fn report(&self, severity: ValidationSeverity, message: &str) {
        if !self.enabled {
            return;
        }

        match severity {
            ValidationSeverity::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            ValidationSeverity::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
        };

        let occurrence = match self.tracker.lock() {
            Ok(mut tracker) => tracker.track_message(message),
            Err(_) => 1,
        };

        // Repeats are counted but only logged once
        if occurrence == 1 {
            match severity {
                ValidationSeverity::Error => engine_error!("nova::soft::Validation", "{}", message),
                ValidationSeverity::Warning => engine_warn!("nova::soft::Validation", "{}", message),
            }
        }
    }

    pub fn error(&self, message: &str) {
        self.report(ValidationSeverity::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.report(ValidationSeverity::Warning, message);
    }

    pub fn stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }

    /// Distinct messages in first-seen order
    pub fn messages(&self) -> Vec<String> {
        self.tracker
            .lock()
            .map(|tracker| tracker.order.clone())
            .unwrap_or_default()
    }

    /// How many times `message` was reported
    pub fn occurrences(&self, message: &str) -> u32 {
        self.tracker
            .lock()
            .map(|tracker| tracker.counts.get(message).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Whether any message contains `fragment`
    pub fn contains(&self, fragment: &str) -> bool {
        self.messages().iter().any(|message| message.contains(fragment))
    }

    pub fn clear(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        if let Ok(mut tracker) = self.tracker.lock() {
            *tracker = MessageTracker::default();
        }
    }

    /// Print a colored summary to stdout
    pub fn print_report(&self) {
        let stats = self.stats();

        if stats.total() == 0 {
            println!("\n{}", "✓ No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

        if stats.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), stats.errors);
        }
        if stats.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
        }
        println!("  {} {}", "Total:".white().bold(), stats.total());

        if let Ok(tracker) = self.tracker.lock() {
            let repeated = tracker.counts.values().filter(|&&count| count > 1).count();
            if repeated > 0 {
                println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), repeated);
            }
        }

        println!("{}\n", "====================================".bright_blue().bold());
    }
}

#[cfg(test)]
#[path = "soft_validation_tests.rs"]
mod tests;
