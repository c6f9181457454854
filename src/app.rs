use ratatui::layout::Rect;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{ChatClient, ChatDispatcher};
use crate::config::Config;
use crate::draft::Draft;
use crate::session::{ChatSession, SessionEvent};
use crate::tui::AppEvent;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    /// Typing the path of a file to upload.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Unknown,
    Healthy,
    Unhealthy,
    Unreachable,
}

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub upload_path: Draft,
    pub service_status: ServiceStatus,

    // Transcript viewport
    pub chat_scroll: u16,
    pub follow: bool,        // keep the newest message in view
    pub chat_height: u16,    // inner height of the chat area, set during render
    pub chat_width: u16,     // inner width, for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-3 for the loading spinner
}

impl App {
    pub fn new(config: &Config) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let client = ChatClient::new(&config.base_url).with_options(config.chat_options());
        let dispatcher = ChatDispatcher::new(client, config.debounce_delay());
        let (session, rx) = ChatSession::new(dispatcher, config);

        let app = Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            upload_path: Draft::default(),
            service_status: ServiceStatus::Unknown,
            chat_scroll: 0,
            follow: true,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
        };
        (app, rx)
    }

    /// Check the service in the background; the result arrives as
    /// [`AppEvent::Health`].
    pub fn spawn_health_probe(&self, tx: mpsc::UnboundedSender<AppEvent>) {
        let client = self.session.client().clone();
        tokio::spawn(async move {
            let status = probe_health(&client).await;
            let _ = tx.send(AppEvent::Health(status));
        });
    }

    pub fn submit(&mut self) {
        if self.session.submit().is_some() {
            self.follow = true;
            self.scroll_to_bottom();
        }
    }

    pub fn start_upload(&mut self) {
        if self.upload_path.is_blank() {
            return;
        }
        let raw = self.upload_path.take();
        let path = expand_home(raw.trim());
        tracing::info!(path = %path.display(), "upload requested");
        self.session.upload(path);
    }

    pub fn clear_transcript(&mut self) {
        self.session.clear();
        self.chat_scroll = 0;
        self.follow = true;
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        if self.session.handle(event) && self.follow {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_sending() || self.session.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 4;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow = self.chat_scroll >= max;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        // Default to a typical panel size until the first render
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.transcript_lines().saturating_sub(visible_height)
    }

    /// Number of wrapped lines the transcript occupies in the chat area.
    pub fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.conversation().messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            if msg.is_loading {
                total_lines += 1;
            }
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            if !msg.sources.is_empty() && !msg.is_typing {
                total_lines += msg.sources.len() + 1;
            }
            total_lines += 1; // Blank line after message
        }
        total_lines.min(u16::MAX as usize) as u16
    }
}

pub async fn probe_health(client: &ChatClient) -> ServiceStatus {
    match tokio::time::timeout(HEALTH_TIMEOUT, client.health()).await {
        Ok(Ok(true)) => ServiceStatus::Healthy,
        Ok(Ok(false)) => ServiceStatus::Unhealthy,
        Ok(Err(err)) => {
            tracing::warn!(%err, base_url = %client.base_url(), "service unreachable at startup");
            ServiceStatus::Unreachable
        }
        Err(_) => {
            tracing::warn!(base_url = %client.base_url(), "health check timed out");
            ServiceStatus::Unreachable
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/a.pdf"), PathBuf::from("/tmp/a.pdf"));
        assert_eq!(expand_home("docs/a.pdf"), PathBuf::from("docs/a.pdf"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/a.pdf"), home.join("a.pdf"));
        }
    }

    #[tokio::test]
    async fn test_startup_does_not_wait_for_health() {
        let config = Config {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Config::new()
        };
        let (app, _rx) = App::new(&config);
        assert_eq!(app.service_status, ServiceStatus::Unknown);
        assert_eq!(app.input_mode, InputMode::Editing);

        let (tx, mut rx) = mpsc::unbounded_channel();
        app.spawn_health_probe(tx);
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("probe never reported")
            .expect("channel closed");
        assert!(matches!(event, AppEvent::Health(ServiceStatus::Unreachable)));
    }

    #[tokio::test]
    async fn test_health_probe_reads_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        assert_eq!(probe_health(&client).await, ServiceStatus::Healthy);
    }

    #[tokio::test]
    async fn test_silent_service_times_out_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let start = std::time::Instant::now();
        assert_eq!(probe_health(&client).await, ServiceStatus::Unreachable);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_scroll_follow_toggles() {
        let config = Config {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Config::new()
        };
        let (mut app, _rx) = App::new(&config);
        app.chat_height = 2;
        app.chat_width = 40;
        app.session.draft.set("three");
        app.submit();

        // question (3 lines) + loading placeholder (3 lines) in a 2-line view
        assert_eq!(app.transcript_lines(), 6);
        assert_eq!(app.chat_scroll, 4);
        assert!(app.follow);
        app.scroll_up(1);
        assert!(!app.follow);
        app.scroll_down(100);
        assert!(app.follow);
    }
}
