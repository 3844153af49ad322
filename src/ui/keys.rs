use crate::midi::CancelToken;
use crossbeam::channel::{self, Sender, TryRecvError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{debug, info, warn};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Keys that stop playback: `q`, Esc and Ctrl+C.
pub fn is_stop_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Background thread that cancels playback on a stop key.
///
/// The terminal is in raw mode while the watcher lives; dropping it stops
/// the thread and restores the terminal.
pub struct KeyWatcher {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl KeyWatcher {
    pub fn spawn(cancel: CancelToken) -> io::Result<Self> {
        enable_raw_mode()?;
        let (shutdown, shutdown_rx) = channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("key-watcher".to_string())
            .spawn(move || {
                debug!("Key watcher started");
                loop {
                    match shutdown_rx.try_recv() {
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }
                    match event::poll(POLL_INTERVAL) {
                        Ok(true) => match event::read() {
                            Ok(Event::Key(key)) if is_stop_key(&key) => {
                                info!("Stop key pressed: {:?}", key.code);
                                cancel.cancel();
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to read terminal event: {}", e);
                                break;
                            }
                        },
                        Ok(false) => {}
                        Err(e) => {
                            warn!("Failed to poll terminal events: {}", e);
                            break;
                        }
                    }
                }
                debug!("Key watcher stopped");
            });

        match handle {
            Ok(handle) => Ok(Self {
                shutdown,
                handle: Some(handle),
            }),
            Err(e) => {
                let _ = disable_raw_mode();
                Err(e)
            }
        }
    }
}

impl Drop for KeyWatcher {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_and_escape_stop() {
        assert!(is_stop_key(&KeyEvent::from(KeyCode::Char('q'))));
        assert!(is_stop_key(&KeyEvent::from(KeyCode::Char('Q'))));
        assert!(is_stop_key(&KeyEvent::from(KeyCode::Esc)));
    }

    #[test]
    fn test_ctrl_c_stops_but_plain_c_does_not() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_stop_key(&ctrl_c));
        assert!(!is_stop_key(&KeyEvent::from(KeyCode::Char('c'))));
    }

    #[test]
    fn test_other_keys_are_ignored() {
        assert!(!is_stop_key(&KeyEvent::from(KeyCode::Char(' '))));
        assert!(!is_stop_key(&KeyEvent::from(KeyCode::Enter)));
    }
}
