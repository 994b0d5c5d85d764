use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{CommandList, GraphicsDevice};
use super::*;

fn record(device: &mut MockGraphicsDevice, timer: &mut GpuTimer, f: impl FnOnce(&mut GpuTimer, &mut dyn CommandList)) -> CompletionMarker {
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    f(timer, cmd.as_mut());
    cmd.end().unwrap();
    device.submit(cmd.as_mut()).unwrap()
}

#[test]
fn test_nested_regions_resolve_after_completion() {
    let mut device = MockGraphicsDevice::new();
    let mut timer = GpuTimer::new(&mut device, 2, 16, true).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.begin(cmd, "geometry").unwrap();
        timer.end(cmd, "geometry").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    assert!(timer.is_available(&device, "frame"));
    assert!(timer.is_available(&device, "geometry"));
    assert_eq!(timer.elapsed_ms(&device, "geometry"), 1.0);
    assert_eq!(timer.elapsed_ms(&device, "frame"), 3.0);
    assert_eq!(
        timer.timings(),
        vec![("frame".to_string(), 3.0), ("geometry".to_string(), 1.0)]
    );
}

#[test]
fn test_elapsed_does_not_block_before_completion() {
    let mut device = MockGraphicsDevice::manual();
    let controller = device.controller();
    let mut timer = GpuTimer::new(&mut device, 2, 16, true).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    assert!(!timer.is_available(&device, "frame"));
    assert_eq!(timer.elapsed_ms(&device, "frame"), 0.0);

    controller.complete_all();

    assert!(timer.is_available(&device, "frame"));
    assert_eq!(timer.elapsed_ms(&device, "frame"), 1.0);
}

#[test]
fn test_open_region_is_not_available() {
    let mut device = MockGraphicsDevice::new();
    let mut timer = GpuTimer::new(&mut device, 1, 16, true).unwrap();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();

    timer.begin(cmd.as_mut(), "open").unwrap();

    assert!(!timer.is_available(&device, "open"));
}

#[test]
fn test_unbalanced_regions_are_logic_errors() {
    let mut device = MockGraphicsDevice::new();
    let mut timer = GpuTimer::new(&mut device, 1, 16, true).unwrap();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();

    assert!(matches!(timer.end(cmd.as_mut(), "never"), Err(Error::LogicError(_))));

    timer.begin(cmd.as_mut(), "twice").unwrap();
    assert!(matches!(timer.begin(cmd.as_mut(), "twice"), Err(Error::LogicError(_))));
}

#[test]
fn test_capacity_exhaustion_skips_region() {
    let mut device = MockGraphicsDevice::new();
    let mut timer = GpuTimer::new(&mut device, 1, 4, true).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        for label in ["a", "b", "c", "d"] {
            timer.begin(cmd, label).unwrap();
            timer.end(cmd, label).unwrap();
        }
    });

    assert!(timer.is_available(&device, "a"));
    assert!(timer.is_available(&device, "b"));
    assert!(!timer.is_available(&device, "c"));
    assert_eq!(timer.elapsed_ms(&device, "d"), 0.0);
    assert_eq!(timer.regions(0).len(), 2);
}

#[test]
fn test_reset_clears_cache_even_with_open_regions() {
    let mut device = MockGraphicsDevice::new();
    let mut timer = GpuTimer::new(&mut device, 1, 16, true).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "done").unwrap();
        timer.end(cmd, "done").unwrap();
    });
    assert!(timer.is_available(&device, "done"));

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    timer.begin(cmd.as_mut(), "open").unwrap();

    timer.reset();

    assert!(timer.timings().is_empty());
    assert!(!timer.is_available(&device, "done"));
    assert_eq!(timer.elapsed_ms(&device, "done"), 0.0);
    assert!(matches!(timer.end(cmd.as_mut(), "open"), Err(Error::LogicError(_))));
    // Pools survive: the timer keeps working
    timer.begin(cmd.as_mut(), "again").unwrap();
    timer.end(cmd.as_mut(), "again").unwrap();
}

#[test]
fn test_reset_drops_regions_of_frames_in_flight() {
    let mut device = MockGraphicsDevice::manual();
    let controller = device.controller();
    let mut timer = GpuTimer::new(&mut device, 2, 16, true).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    timer.reset();
    controller.complete_all();

    assert!(!timer.is_available(&device, "frame"));
    assert_eq!(timer.elapsed_ms(&device, "frame"), 0.0);
    assert!(timer.regions(0).is_empty());
}

#[test]
fn test_begin_slot_refuses_unsignaled_marker() {
    let mut device = MockGraphicsDevice::manual();
    let controller = device.controller();
    let mut timer = GpuTimer::new(&mut device, 2, 16, true).unwrap();

    let marker = record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    let result = timer.begin_slot(&mut device, 0, Some(marker));
    assert!(matches!(result, Err(Error::LogicError(_))));

    controller.complete_up_to(marker);
    timer.begin_slot(&mut device, 0, Some(marker)).unwrap();

    // Harvested before the reset
    assert_eq!(timer.timings(), vec![("frame".to_string(), 1.0)]);
    assert!(timer.regions(0).is_empty());
}

#[test]
fn test_slots_keep_separate_label_maps() {
    let mut device = MockGraphicsDevice::manual();
    let controller = device.controller();
    let mut timer = GpuTimer::new(&mut device, 2, 16, true).unwrap();

    timer.begin_slot(&mut device, 0, None).unwrap();
    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });
    timer.begin_slot(&mut device, 1, None).unwrap();
    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    assert_eq!(timer.regions(0).len(), 1);
    assert_eq!(timer.regions(1).len(), 1);
    assert_eq!(timer.current_slot(), 1);

    controller.complete_all();
    assert!(timer.is_available(&device, "frame"));
}

#[test]
fn test_disabled_timer_records_nothing() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut timer = GpuTimer::new(&mut device, 2, 16, false).unwrap();

    record(&mut device, &mut timer, |timer, cmd| {
        timer.begin(cmd, "frame").unwrap();
        timer.end(cmd, "frame").unwrap();
    });

    assert!(!timer.is_enabled());
    assert!(controller.recorded().is_empty());
    assert!(!timer.is_available(&device, "frame"));
}

#[test]
fn test_zero_slots_rejected() {
    let mut device = MockGraphicsDevice::new();
    assert!(matches!(GpuTimer::new(&mut device, 0, 16, true), Err(Error::ConfigurationError(_))));
}
