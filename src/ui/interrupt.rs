use crate::midi::CancelToken;
use log::info;

/// Callback run on SIGINT: cancels playback so the player can clean up.
pub fn interrupt_handler(cancel: CancelToken) -> impl FnMut() + Send + 'static {
    move || {
        info!("Interrupt received, stopping playback");
        cancel.cancel();
    }
}

/// Routes Ctrl+C to `cancel` when the terminal is not in raw mode.
///
/// Can only be installed once per process.
pub fn cancel_on_interrupt(cancel: CancelToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(interrupt_handler(cancel))
}
