//! `critical-section` provider for ESP-IDF.
//!
//! The command channel and state snapshot in [`crate::channels`] are shared
//! between the HTTP server task and the scheduler loop through
//! `CriticalSectionRawMutex`.  ESP-IDF runs those on separate FreeRTOS
//! tasks, so the critical section is one process-wide mutex held by the
//! outermost acquirer.  Nested acquires on the same task only bump a depth
//! counter.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static SECTION: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static DEPTH: Cell<u8> = const { Cell::new(0) };
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // A panic inside a section cannot leave the unit payload torn.
            let guard = SECTION.lock().unwrap_or_else(PoisonError::into_inner);
            HELD.with(|held| *held.borrow_mut() = Some(guard));
        }
        depth.set(d.saturating_add(1));
        d
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(restore: u8) {
    DEPTH.with(|depth| {
        depth.set(restore);
        if restore == 0 {
            HELD.with(|held| *held.borrow_mut() = None);
        }
    });
}
