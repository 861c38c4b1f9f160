use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use snapline_core::Signal;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Spawn a thread that sets `shutdown` on Esc, q/Q or Ctrl+C.
pub fn spawn_keyboard_monitor(shutdown: Arc<Signal>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_set() {
            if event::poll(Duration::from_millis(100)).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = event::read()
                && should_shutdown(&key_event)
            {
                debug!("Shutdown key pressed: {:?}", key_event.code);
                shutdown.set();
                break;
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

fn should_shutdown(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc => true,
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => true,
        _ => false,
    }
}
