//! Terminal user interface
//!
//! Components used while a sequence plays live:
//! - a step progress bar that follows playback
//! - a key watcher that stops playback on `q`, Esc or Ctrl+C
//! - a SIGINT handler that stops playback when raw mode is unavailable
//!
//! Progress bars are drawn with indicatif, keys are read with crossterm.

mod interrupt;
mod keys;
mod progress;

pub use interrupt::{cancel_on_interrupt, interrupt_handler};
pub use keys::{is_stop_key, KeyWatcher};
pub use progress::{create_step_progress, ProgressObserver};
