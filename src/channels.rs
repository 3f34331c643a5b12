//! Inter-task communication between the HTTP server and the scheduler.
//!
//! The ESP-IDF HTTP server runs its handlers on its own task.  Handlers
//! never touch the live [`DeviceState`]: they push [`AppCommand`]s into a
//! bounded `embassy-sync` channel that the scheduler drains at the start
//! of each pass, and read a snapshot the scheduler republishes after it.
//!
//! ```text
//! ┌──────────────┐  AppCommand  ┌──────────────┐
//! │  HTTP task   │────────────▶│  Main loop    │
//! │  (handlers)  │◀────────────│  (scheduler)  │
//! └──────────────┘  snapshot    └──────────────┘
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::app::commands::AppCommand;
use crate::app::ports::CommandSource;
use crate::app::state::DeviceState;

/// Channel depth for web commands.
pub const COMMAND_DEPTH: usize = 8;

/// Web handlers → main loop.
pub static WEB_COMMANDS: Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH> =
    Channel::new();

/// Latest state published by the main loop.  `None` until the first pass.
static SNAPSHOT: Mutex<CriticalSectionRawMutex, RefCell<Option<DeviceState>>> =
    Mutex::new(RefCell::new(None));

/// Queue a command from a handler.  Returns `false` when the queue is full.
pub fn submit(cmd: AppCommand) -> bool {
    match WEB_COMMANDS.try_send(cmd) {
        Ok(()) => true,
        Err(TrySendError::Full(cmd)) => {
            log::warn!("Command queue full, dropping {:?}", cmd);
            false
        }
    }
}

/// Replace the published snapshot.  Called by the main loop after each pass.
pub fn publish(state: &DeviceState) {
    SNAPSHOT.lock(|cell| {
        let mut slot = cell.borrow_mut();
        match slot.as_mut() {
            Some(existing) if existing == state => {}
            Some(existing) => existing.clone_from(state),
            None => *slot = Some(state.clone()),
        }
    });
}

/// Clone of the last published state (defaults before the first publish).
pub fn snapshot() -> DeviceState {
    SNAPSHOT.lock(|cell| cell.borrow().clone().unwrap_or_default())
}

/// [`CommandSource`] backed by [`WEB_COMMANDS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelCommandSource;

impl CommandSource for ChannelCommandSource {
    fn poll_command(&mut self) -> Option<AppCommand> {
        WEB_COMMANDS.try_receive().ok()
    }
}
