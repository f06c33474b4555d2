//! Sample tick source using ESP-IDF's esp_timer API.
//!
//! A periodic timer counts sample ticks into [`SAMPLE_TICKS`] and wakes
//! the control loop with a task notification.  The loop blocks on that
//! notification instead of `FreeRtos::delay_ms`, which rounds up to whole
//! FreeRTOS ticks (10 ms at the default `CONFIG_FREERTOS_HZ=100`) and
//! cannot hold a 3 ms sample period.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can touch atomics and notify a task.  On simulation targets the
//! wait is a thread sleep and nothing records ticks.

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use core::num::NonZeroU32;
#[cfg(target_os = "espidf")]
use core::sync::atomic::AtomicPtr;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::task;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Sample ticks raised by the timer and not yet consumed by the loop.
#[derive(Debug, Default)]
pub struct SampleTicks {
    pending: AtomicU32,
}

impl SampleTicks {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
        }
    }

    /// Count one elapsed sample period.  Called from the timer callback.
    pub fn record(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    /// Consume every pending tick.  `None` when no period has elapsed,
    /// otherwise `Some(skipped)`: the loop takes one sample and `skipped`
    /// periods passed without one.
    pub fn take_due(&self) -> Option<u32> {
        match self.pending.swap(0, Ordering::AcqRel) {
            0 => None,
            n => Some(n - 1),
        }
    }
}

pub static SAMPLE_TICKS: SampleTicks = SampleTicks::new();

/// Timer period for a sample interval, in microseconds.
pub fn sample_period_us(sample_interval_ms: u32) -> u64 {
    u64::from(sample_interval_ms.max(1)) * 1000
}

/// Errors while starting the tick timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Not called from a FreeRTOS task.
    NoTask,
    CreateFailed(i32),
    StartFailed(i32),
}

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoTask => write!(f, "sample timer must be started from a task"),
            Self::CreateFailed(rc) => write!(f, "sample timer create failed (rc={})", rc),
            Self::StartFailed(rc) => write!(f, "sample timer start failed (rc={})", rc),
        }
    }
}

impl core::error::Error for TimerError {}

#[cfg(target_os = "espidf")]
static LOOP_TASK: AtomicPtr<core::ffi::c_void> = AtomicPtr::new(core::ptr::null_mut());
#[cfg(target_os = "espidf")]
static mut SAMPLE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(_arg: *mut core::ffi::c_void) {
    SAMPLE_TICKS.record();
    let waiter = LOOP_TASK.load(Ordering::Acquire);
    if !waiter.is_null() {
        // SAFETY: LOOP_TASK holds the handle of the main task, which never
        // exits while the timer runs.
        let _ = unsafe { task::notify(waiter as TaskHandle_t, NonZeroU32::MIN) };
    }
}

/// Start the periodic sample timer.  The calling task becomes the one
/// woken by [`wait_for_tick`].
#[cfg(target_os = "espidf")]
pub fn start_sample_timer(sample_interval_ms: u32) -> Result<(), TimerError> {
    let me = task::current().ok_or(TimerError::NoTask)?;
    LOOP_TASK.store(me as *mut core::ffi::c_void, Ordering::Release);

    let period_us = sample_period_us(sample_interval_ms);

    // SAFETY: SAMPLE_TIMER is written here once at boot from the main task
    // before the timer is started.  The callback only touches atomics and
    // notifies a task.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(sample_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"sample\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut SAMPLE_TIMER);
        if ret != ESP_OK {
            return Err(TimerError::CreateFailed(ret));
        }
        let ret = esp_timer_start_periodic(SAMPLE_TIMER, period_us);
        if ret != ESP_OK {
            return Err(TimerError::StartFailed(ret));
        }
    }

    info!("hw_timer: sample tick every {}us", period_us);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_sample_timer(_sample_interval_ms: u32) -> Result<(), TimerError> {
    log::info!("hw_timer(sim): timer not started (ticks driven by the caller)");
    Ok(())
}

/// Block until the sample timer fires or `limit_ms` passes.
#[cfg(target_os = "espidf")]
pub fn wait_for_tick(limit_ms: u32) {
    let ticks = (u64::from(limit_ms) * u64::from(configTICK_RATE_HZ) / 1000).max(1);
    let _ = task::wait_notification(ticks as TickType_t);
}

#[cfg(not(target_os = "espidf"))]
pub fn wait_for_tick(limit_ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(u64::from(limit_ms)));
}
