/// GPU timer - label-keyed device durations, resolved asynchronously
///
/// Every frame slot owns one timestamp-query pool and one label map. A
/// region's start/end queries are written into the slot's command list;
/// results become readable once the device has executed that list. Reading
/// never blocks: `elapsed_ms` polls once and answers from the cache.
///
/// ```text
///   begin_slot(k)  harvest + reset slot k (its marker must have signaled)
///   begin(label)   write start query
///   end(label)     write end query
///   elapsed_ms     poll, then return the cached duration
/// ```

use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics_device::{CommandList, CompletionMarker, GraphicsDevice, QueryPoolHandle};

// ============================================================================
// Timed region
// ============================================================================

/// One begin/end pair inside a slot
#[derive(Debug, Clone)]
pub struct TimedRegion {
    pub label: String,
    pub start_query: u32,
    /// None until `end` was recorded
    pub end_query: Option<u32>,
    /// Duration once both queries resolved
    pub duration_ms: Option<f64>,
}

impl TimedRegion {
    pub fn is_open(&self) -> bool {
        self.end_query.is_none()
    }

    pub fn is_ready(&self) -> bool {
        self.duration_ms.is_some()
    }
}

struct SlotTimers {
    pool: QueryPoolHandle,
    regions: FxHashMap<String, TimedRegion>,
    /// Regions dropped because the pool was full (their `end` is a no-op)
    skipped: FxHashSet<String>,
    next_query: u32,
    exhaustion_warned: bool,
}

impl SlotTimers {
    fn clear(&mut self) {
        self.regions.clear();
        self.skipped.clear();
        self.next_query = 0;
        self.exhaustion_warned = false;
    }
}

// ============================================================================
// GpuTimer
// ============================================================================

pub struct GpuTimer {
    slots: Vec<SlotTimers>,
    current: usize,
    capacity: u32,
    enabled: bool,
    period_ns: f64,
    cache: FxHashMap<String, f64>,
}

impl GpuTimer {
    /// Create one query pool of `capacity` queries per slot
    ///
    /// The capacity is clamped to what the device supports. A disabled timer
    /// allocates nothing and records nothing.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        slot_count: usize,
        capacity: u32,
        enabled: bool,
    ) -> Result<Self> {
        if slot_count == 0 {
            crate::engine_bail!(ConfigurationError, "nova::GpuTimer", "slot count must be at least 1");
        }

        let capacity = capacity.min(device.max_timestamp_queries());
        if enabled && capacity < 2 {
            crate::engine_bail!(
                ConfigurationError,
                "nova::GpuTimer",
                "timestamp capacity {} cannot hold a single region",
                capacity
            );
        }

        let mut slots: Vec<SlotTimers> = Vec::new();
        if enabled {
            for _ in 0..slot_count {
                let pool = match device.create_query_pool(capacity) {
                    Ok(pool) => pool,
                    Err(e) => {
                        for slot in slots.drain(..) {
                            let _ = device.destroy_query_pool(slot.pool);
                        }
                        return Err(e);
                    }
                };
                slots.push(SlotTimers {
                    pool,
                    regions: FxHashMap::default(),
                    skipped: FxHashSet::default(),
                    next_query: 0,
                    exhaustion_warned: false,
                });
            }
        }

        crate::engine_debug!(
            "nova::GpuTimer",
            "Created GPU timer: {} slots x {} queries (enabled: {})",
            slot_count, capacity, enabled
        );

        Ok(Self {
            slots,
            current: 0,
            capacity,
            enabled,
            period_ns: device.timestamp_period_ns(),
            cache: FxHashMap::default(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queries per slot
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Make `slot` the recording slot for a new frame
    ///
    /// `last_marker` is the completion marker of the slot's previous
    /// occupant. Its results are harvested into the cache before the pool is
    /// reset.
    ///
    /// # Errors
    ///
    /// `LogicError` if `last_marker` has not signaled yet.
    pub fn begin_slot(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: usize,
        last_marker: Option<CompletionMarker>,
    ) -> Result<()> {
        if !self.enabled {
            self.current = slot;
            return Ok(());
        }
        if slot >= self.slots.len() {
            crate::engine_bail!(InvalidResource, "nova::GpuTimer", "slot {} out of range", slot);
        }
        if let Some(marker) = last_marker {
            if !device.is_complete(marker)? {
                crate::engine_bail!(
                    LogicError,
                    "nova::GpuTimer",
                    "slot {} reacquired before marker {} signaled",
                    slot,
                    marker.value()
                );
            }
        }

        Self::harvest(&mut self.slots[slot], &mut self.cache, &*device, self.period_ns)?;
        device.reset_query_pool(self.slots[slot].pool)?;
        self.slots[slot].clear();
        self.current = slot;
        Ok(())
    }

    /// Open region `label` in the current slot
    ///
    /// When the slot's pool is full the region is skipped and a warning is
    /// logged once per slot cycle; the frame carries on.
    pub fn begin(&mut self, cmd: &mut dyn CommandList, label: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let capacity = self.capacity;
        let current = self.current;
        let slot = match self.slots.get_mut(current) {
            Some(slot) => slot,
            None => crate::engine_bail!(InvalidResource, "nova::GpuTimer", "slot {} out of range", current),
        };

        if slot.skipped.contains(label) || slot.regions.get(label).is_some_and(|r| r.is_open()) {
            crate::engine_bail!(LogicError, "nova::GpuTimer", "region '{}' is already open", label);
        }

        match Self::reserve_pair(slot, capacity) {
            Ok(start) => {
                cmd.write_timestamp(slot.pool, start)?;
                slot.regions.insert(label.to_string(), TimedRegion {
                    label: label.to_string(),
                    start_query: start,
                    end_query: None,
                    duration_ms: None,
                });
                Ok(())
            }
            Err(Error::ResourceExhaustion(msg)) => {
                if !slot.exhaustion_warned {
                    crate::engine_warn!("nova::GpuTimer", "{}; skipping region '{}'", msg, label);
                    slot.exhaustion_warned = true;
                }
                slot.skipped.insert(label.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Close region `label` in the current slot
    ///
    /// # Errors
    ///
    /// `LogicError` if no region with that label is open.
    pub fn end(&mut self, cmd: &mut dyn CommandList, label: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let current = self.current;
        let slot = match self.slots.get_mut(current) {
            Some(slot) => slot,
            None => crate::engine_bail!(InvalidResource, "nova::GpuTimer", "slot {} out of range", current),
        };

        if slot.skipped.remove(label) {
            return Ok(());
        }

        let pool = slot.pool;
        match slot.regions.get_mut(label) {
            Some(region) if region.is_open() => {
                let end_query = region.start_query + 1;
                cmd.write_timestamp(pool, end_query)?;
                region.end_query = Some(end_query);
                Ok(())
            }
            _ => crate::engine_bail!(LogicError, "nova::GpuTimer", "end('{}') without an open region", label),
        }
    }

    /// Pull every newly available result into the cache (never blocks)
    pub fn poll(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        for slot in &mut self.slots {
            Self::harvest(slot, &mut self.cache, device, self.period_ns)?;
        }
        Ok(())
    }

    /// Whether `label` has a resolved duration
    ///
    /// False while a begin has no matching end.
    pub fn is_available(&mut self, device: &dyn GraphicsDevice, label: &str) -> bool {
        self.poll_quietly(device);
        let open = self
            .slots
            .iter()
            .any(|slot| slot.regions.get(label).is_some_and(|r| r.is_open()) || slot.skipped.contains(label));
        !open && self.cache.contains_key(label)
    }

    /// Last resolved duration of `label` in milliseconds (0.0 if none yet)
    pub fn elapsed_ms(&mut self, device: &dyn GraphicsDevice, label: &str) -> f64 {
        self.poll_quietly(device);
        self.cache.get(label).copied().unwrap_or(0.0)
    }

    /// Read-only snapshot of every cached duration, sorted by label
    pub fn timings(&self) -> Vec<(String, f64)> {
        let mut timings: Vec<(String, f64)> = self
            .cache
            .iter()
            .map(|(label, ms)| (label.clone(), *ms))
            .collect();
        timings.sort_by(|a, b| a.0.cmp(&b.0));
        timings
    }

    /// Forget every cached duration and pending region
    ///
    /// Query pools are kept. Open regions are discarded, so their `end` is
    /// then a `LogicError` like any unmatched end. Closed regions of frames
    /// still in flight are dropped too and never become available.
    pub fn reset(&mut self) {
        self.cache.clear();
        for slot in &mut self.slots {
            slot.clear();
        }
        crate::engine_trace!("nova::GpuTimer", "Timer reset");
    }

    /// Release every query pool
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut result = Ok(());
        for slot in self.slots.drain(..) {
            if let Err(e) = device.destroy_query_pool(slot.pool) {
                result = Err(e);
            }
        }
        self.enabled = false;
        result
    }

    /// Regions recorded in `slot` (diagnostics)
    pub fn regions(&self, slot: usize) -> Vec<&TimedRegion> {
        self.slots
            .get(slot)
            .map(|s| s.regions.values().collect())
            .unwrap_or_default()
    }

    // ===== INTERNAL =====

    fn reserve_pair(slot: &mut SlotTimers, capacity: u32) -> Result<u32> {
        if slot.next_query + 2 > capacity {
            return Err(Error::ResourceExhaustion(format!(
                "timestamp pool full ({} queries)",
                capacity
            )));
        }
        let start = slot.next_query;
        slot.next_query += 2;
        Ok(start)
    }

    fn harvest(
        slot: &mut SlotTimers,
        cache: &mut FxHashMap<String, f64>,
        device: &dyn GraphicsDevice,
        period_ns: f64,
    ) -> Result<()> {
        for region in slot.regions.values_mut() {
            if region.is_ready() {
                continue;
            }
            let end_query = match region.end_query {
                Some(end) => end,
                None => continue,
            };
            let values = device.read_timestamps(slot.pool, region.start_query, end_query - region.start_query + 1)?;
            if let (Some(Some(start)), Some(Some(end))) = (values.first(), values.last()) {
                let ticks = end.saturating_sub(*start);
                let ms = ticks as f64 * period_ns / 1_000_000.0;
                region.duration_ms = Some(ms);
                cache.insert(region.label.clone(), ms);
            }
        }
        Ok(())
    }

    fn poll_quietly(&mut self, device: &dyn GraphicsDevice) {
        if let Err(e) = self.poll(device) {
            crate::engine_debug!("nova::GpuTimer", "Timestamp poll failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "gpu_timer_tests.rs"]
mod tests;
