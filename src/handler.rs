use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::draft::Draft;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Session(event) => app.on_session_event(event),
        AppEvent::Health(status) => app.service_status = status,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
        InputMode::Upload => handle_upload_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('u') => app.input_mode = InputMode::Upload,
        KeyCode::Char('c') => app.clear_transcript(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(u16::MAX),
        KeyCode::Char('G') | KeyCode::End => {
            app.follow = true;
            app.scroll_to_bottom();
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit(),
        _ => edit_line(&mut app.session.draft, key),
    }
}

fn handle_upload_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.upload_path.take();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.start_upload();
            app.input_mode = InputMode::Normal;
        }
        _ => edit_line(&mut app.upload_path, key),
    }
}

fn edit_line(draft: &mut Draft, key: KeyEvent) {
    // Unbound chords are not text
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return;
    }

    match key.code {
        KeyCode::Backspace => draft.backspace(),
        KeyCode::Delete => draft.delete(),
        KeyCode::Left => draft.left(),
        KeyCode::Right => draft.right(),
        KeyCode::Home => draft.home(),
        KeyCode::End => draft.end(),
        KeyCode::Char(c) => draft.insert(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    async fn offline_app() -> App {
        let config = Config {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Config::new()
        };
        App::new(&config).0
    }

    #[tokio::test]
    async fn test_enter_submits_and_clears_draft() {
        let mut app = offline_app().await;
        type_text(&mut app, "Hello");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert!(app.session.draft.is_blank());
        assert_eq!(app.session.conversation().len(), 2);
        assert!(app.session.is_sending());
    }

    #[tokio::test]
    async fn test_enter_on_blank_does_nothing() {
        let mut app = offline_app().await;
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_upload_mode_round_trip() {
        let mut app = offline_app().await;
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, key(KeyCode::Char('u'))).unwrap();
        assert_eq!(app.input_mode, InputMode::Upload);

        type_text(&mut app, "/nonexistent/file.pdf");
        assert_eq!(app.upload_path.text(), "/nonexistent/file.pdf");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.upload_path.is_blank());
        assert!(app.session.is_uploading());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_typing() {
        let mut app = offline_app().await;
        let event = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, event).unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_modified_chars_are_not_typed() {
        let mut app = offline_app().await;
        type_text(&mut app, "ab");
        for modifiers in [KeyModifiers::CONTROL, KeyModifiers::ALT] {
            let event = AppEvent::Key(KeyEvent::new(KeyCode::Char('u'), modifiers));
            handle_event(&mut app, event).unwrap();
        }
        assert_eq!(app.session.draft.text(), "ab");

        let shifted = AppEvent::Key(KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT));
        handle_event(&mut app, shifted).unwrap();
        assert_eq!(app.session.draft.text(), "abC");
    }

    #[tokio::test]
    async fn test_q_types_in_editing_mode() {
        let mut app = offline_app().await;
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.session.draft.text(), "q");

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        handle_event(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
    }
}
