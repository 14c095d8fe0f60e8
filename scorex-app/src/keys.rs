use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use scorex_model::ControlCommand;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Map one key press to an engine command.
///
/// The bindings follow the traditional layout: `a` analyzes the page, `b`
/// begins a scan, `r`/`f` steer it, `n`/`p` turn pages, and `Esc` or `q`
/// quits. `Ctrl-C` always quits.
pub fn command_for(key: &KeyEvent) -> Option<ControlCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && key.code == KeyCode::Char('c')
    {
        return Some(ControlCommand::Quit);
    }

    match key.code {
        KeyCode::Char('a') => Some(ControlCommand::Static),
        KeyCode::Char('b') => Some(ControlCommand::Scan),
        KeyCode::Char('r') => Some(ControlCommand::Reverse),
        KeyCode::Char('f') => Some(ControlCommand::Forward),
        KeyCode::Char('n') => Some(ControlCommand::NextPage),
        KeyCode::Char('p') => Some(ControlCommand::PrevPage),
        KeyCode::Char('q') | KeyCode::Esc => Some(ControlCommand::Quit),
        _ => None,
    }
}

/// Restores the terminal even when the read loop unwinds.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(error) = terminal::disable_raw_mode() {
            error!(%error, "failed to restore terminal mode");
        }
    }
}

/// Blocking keyboard loop. Runs on its own thread and feeds the engine's
/// command channel until the operator quits or the engine goes away.
pub fn run_key_loop(commands: mpsc::UnboundedSender<ControlCommand>) {
    let _guard = match RawModeGuard::enable() {
        Ok(guard) => guard,
        Err(error) => {
            error!(%error, "failed to enter raw mode, keyboard control disabled");
            return;
        }
    };

    loop {
        let event = match event::read() {
            Ok(event) => event,
            Err(error) => {
                error!(%error, "keyboard read failed");
                let _ = commands.send(ControlCommand::Quit);
                return;
            }
        };

        let Event::Key(key) = event else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let Some(command) = command_for(&key) else {
            debug!(?key, "unbound key");
            continue;
        };

        // A closed channel means the engine is gone; stop reading keys.
        if commands.send(command).is_err() || command == ControlCommand::Quit {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn letters_map_to_their_commands() {
        let cases = [
            ('a', ControlCommand::Static),
            ('b', ControlCommand::Scan),
            ('r', ControlCommand::Reverse),
            ('f', ControlCommand::Forward),
            ('n', ControlCommand::NextPage),
            ('p', ControlCommand::PrevPage),
            ('q', ControlCommand::Quit),
        ];

        for (letter, expected) in cases {
            assert_eq!(
                command_for(&press(KeyCode::Char(letter))),
                Some(expected),
                "key {letter}"
            );
        }
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        assert_eq!(command_for(&press(KeyCode::Esc)), Some(ControlCommand::Quit));

        let ctrl_c =
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(command_for(&ctrl_c), Some(ControlCommand::Quit));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(command_for(&press(KeyCode::Char('x'))), None);
        assert_eq!(command_for(&press(KeyCode::Enter)), None);
        assert_eq!(command_for(&press(KeyCode::Up)), None);
    }
}
