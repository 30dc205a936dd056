//! Application state management for Chainverse.
//!
//! This module contains the `App` struct that holds UI state, the session
//! manager, and the channels background tasks report back on.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chainverse_core::agent::{ActorBinder, ActorSlot, HttpTransport};
use chainverse_core::auth::{FileStorage, IdentityStorage, KeyringStorage, LoopbackProvider};
use chainverse_core::config::{Config, StorageBackend};
use chainverse_core::nft::{self, MintReceipt, MintRequest};
use chainverse_core::session::{Notifier, Session, SessionManager, SessionOptions};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for the token name field.
const MAX_NAME_LENGTH: usize = 64;

/// Maximum length for the description field.
const MAX_DESCRIPTION_LENGTH: usize = 256;

/// Maximum length for the file path field.
const MAX_PATH_LENGTH: usize = 512;

// ============================================================================
// UI State Types
// ============================================================================

/// What the main area shows, derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    LoginPrompt,
    UploadForm,
}

impl Screen {
    pub fn for_session(session: &Session) -> Self {
        if session.is_loading() {
            Screen::Loading
        } else if session.is_authenticated() {
            Screen::UploadForm
        } else {
            Screen::LoginPrompt
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    AwaitingLogin,
    ShowingNotice,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Upload form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFocus {
    Name,
    Description,
    File,
    Button,
}

impl UploadFocus {
    pub fn next(&self) -> Self {
        match self {
            UploadFocus::Name => UploadFocus::Description,
            UploadFocus::Description => UploadFocus::File,
            UploadFocus::File => UploadFocus::Button,
            UploadFocus::Button => UploadFocus::Name,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            UploadFocus::Name => UploadFocus::Button,
            UploadFocus::Description => UploadFocus::Name,
            UploadFocus::File => UploadFocus::Description,
            UploadFocus::Button => UploadFocus::File,
        }
    }

    fn max_length(&self) -> usize {
        match self {
            UploadFocus::Name => MAX_NAME_LENGTH,
            UploadFocus::Description => MAX_DESCRIPTION_LENGTH,
            UploadFocus::File => MAX_PATH_LENGTH,
            UploadFocus::Button => 0,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background tasks to the render loop.
pub enum TaskResult {
    Initialized(Session),
    /// Login finished; the error text is for the log, the user already got a notice
    LoginFinished(Result<Session, String>),
    /// Logout finished; carries the provider error, if any
    LoggedOut(Option<String>),
    Minted(Result<MintReceipt, String>),
}

/// Forwards session notices to the UI.
struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str) {
        if self.tx.send(message.to_string()).is_err() {
            warn!(notice = message, "Notice dropped, UI gone");
        }
    }
}

/// Main application state container
pub struct App {
    pub config: Config,
    pub manager: Arc<SessionManager>,
    pub actors: ActorSlot,

    // UI State
    pub state: AppState,
    pub session: Session,
    pub notice: Option<String>,
    pub authorize_url: Option<String>,
    pub status_message: Option<String>,
    session_busy: bool,

    // Upload form state
    pub form_active: bool,
    pub upload_focus: UploadFocus,
    pub upload_name: String,
    pub upload_description: String,
    pub upload_path: String,
    pub upload_error: Option<String>,
    pub minting: bool,

    // Background task channels
    task_tx: mpsc::Sender<TaskResult>,
    task_rx: mpsc::Receiver<TaskResult>,
    notice_rx: mpsc::UnboundedReceiver<String>,
    prompt_rx: mpsc::UnboundedReceiver<String>,
}

impl App {
    /// Create a new application instance from config.
    pub fn new(config: Config) -> Result<Self> {
        let storage: Arc<dyn IdentityStorage> = match config.storage {
            StorageBackend::File => {
                let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
                debug!(?cache_dir, "Identity stored in cache directory");
                Arc::new(FileStorage::new(cache_dir))
            }
            StorageBackend::Keyring => Arc::new(KeyringStorage),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn IdentityStorage>) -> Result<Self> {
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();

        let provider = LoopbackProvider::new(config.identity_provider_url())?.with_prompt(prompt_tx);
        let transport = HttpTransport::new(config.host())?;
        let actors = ActorSlot::new();
        let binder = ActorBinder::new(Arc::new(transport), config.deployment, actors.clone())
            .with_root_key(config.root_key_bytes()?);

        let manager = Arc::new(SessionManager::new(
            SessionOptions::from_config(&config)?,
            Arc::new(provider),
            storage,
            binder,
            Arc::new(ChannelNotifier { tx: notice_tx }),
        ));
        let session = manager.session();

        Ok(Self {
            config,
            manager,
            actors,

            state: AppState::Normal,
            session,
            notice: None,
            authorize_url: None,
            status_message: None,
            session_busy: false,

            form_active: false,
            upload_focus: UploadFocus::Name,
            upload_name: String::new(),
            upload_description: String::new(),
            upload_path: String::new(),
            upload_error: None,
            minting: false,

            task_tx,
            task_rx,
            notice_rx,
            prompt_rx,
        })
    }

    pub fn screen(&self) -> Screen {
        Screen::for_session(&self.session)
    }

    /// Header greeting for the logged-in user.
    pub fn welcome_text(&self) -> Option<String> {
        self.session
            .display_principal()
            .map(|principal| format!("Welcome: {}", principal))
    }

    // =========================================================================
    // Session operations
    // =========================================================================

    /// Restore any previous session in the background.
    pub fn start_initialize(&mut self) {
        self.session_busy = true;
        let manager = self.manager.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let session = manager.initialize().await;
            Self::send_result(&tx, TaskResult::Initialized(session)).await;
        });
    }

    /// Begin the identity provider hand-off.
    pub fn start_login(&mut self) {
        if self.session_busy || self.session.is_authenticated() {
            debug!("Login ignored, session busy or already logged in");
            return;
        }
        self.session_busy = true;
        self.state = AppState::AwaitingLogin;
        self.authorize_url = None;

        let manager = self.manager.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = manager.login().await.map_err(|e| e.to_string());
            Self::send_result(&tx, TaskResult::LoginFinished(result)).await;
        });
    }

    pub fn start_logout(&mut self) {
        if self.session_busy {
            debug!("Logout ignored, session busy");
            return;
        }
        self.session_busy = true;
        self.status_message = Some("Logging out...".to_string());

        let manager = self.manager.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let error = manager.logout().await.err().map(|e| e.to_string());
            Self::send_result(&tx, TaskResult::LoggedOut(error)).await;
        });
    }

    // =========================================================================
    // Upload form
    // =========================================================================

    /// Validate the form and mint through the currently bound actor.
    pub fn submit_upload(&mut self) {
        if self.minting {
            return;
        }

        let Some(actor) = self.actors.current() else {
            self.upload_error = Some("Not connected to the NFT canister".to_string());
            return;
        };

        let path = PathBuf::from(self.upload_path.trim());
        let request = match MintRequest::from_file(&path, &self.upload_name, &self.upload_description) {
            Ok(request) => request,
            Err(e) => {
                self.upload_error = Some(format!("{:#}", e));
                return;
            }
        };

        self.upload_error = None;
        self.minting = true;
        self.status_message = Some(format!("Minting {}...", request.name));

        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = nft::mint(actor.as_ref(), &request)
                .await
                .map_err(|e| e.to_string());
            Self::send_result(&tx, TaskResult::Minted(result)).await;
        });
    }

    pub fn push_upload_char(&mut self, c: char) {
        let max = self.upload_focus.max_length();
        let Some(field) = self.focused_field_mut() else {
            return;
        };
        if can_add_field_char(field.chars().count(), max, c) {
            field.push(c);
        }
    }

    pub fn pop_upload_char(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.pop();
        }
    }

    fn focused_field_mut(&mut self) -> Option<&mut String> {
        match self.upload_focus {
            UploadFocus::Name => Some(&mut self.upload_name),
            UploadFocus::Description => Some(&mut self.upload_description),
            UploadFocus::File => Some(&mut self.upload_path),
            UploadFocus::Button => None,
        }
    }

    fn reset_upload_form(&mut self) {
        self.form_active = false;
        self.upload_focus = UploadFocus::Name;
        self.upload_name.clear();
        self.upload_description.clear();
        self.upload_path.clear();
        self.upload_error = None;
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if tx.send(result).await.is_err() {
            debug!("Task result dropped, receiver closed");
        }
    }

    /// Drain everything background tasks have reported since the last frame.
    pub fn check_background_tasks(&mut self) {
        while let Ok(url) = self.prompt_rx.try_recv() {
            self.authorize_url = Some(url);
        }

        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }

        // Notices come last so they stay on top of whatever a result changed
        while let Ok(message) = self.notice_rx.try_recv() {
            self.notice = Some(message);
            self.state = AppState::ShowingNotice;
        }
    }

    pub fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Initialized(session) => {
                self.session_busy = false;
                self.session = session;
            }
            TaskResult::LoginFinished(result) => {
                self.session_busy = false;
                self.authorize_url = None;
                if self.state == AppState::AwaitingLogin {
                    self.state = AppState::Normal;
                }
                match result {
                    Ok(session) => {
                        info!(principal = session.principal(), "Login complete");
                        self.session = session;
                        self.status_message = None;
                    }
                    Err(e) => {
                        error!(error = %e, "Login did not complete");
                        self.session = self.manager.session();
                    }
                }
            }
            TaskResult::LoggedOut(error) => {
                self.session_busy = false;
                self.session = self.manager.session();
                self.reset_upload_form();
                self.status_message = match error {
                    Some(e) => Some(format!("Logged out (provider: {})", e)),
                    None => Some("Logged out".to_string()),
                };
            }
            TaskResult::Minted(result) => {
                self.minting = false;
                match result {
                    Ok(receipt) => {
                        info!(token_id = receipt.token_id, "Minted");
                        self.status_message = Some(format!("Minted token #{}", receipt.token_id));
                        self.reset_upload_form();
                    }
                    Err(e) => {
                        error!(error = %e, "Mint failed");
                        self.status_message = None;
                        self.upload_error = Some(format!("Mint failed: {}", e));
                    }
                }
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        self.state = AppState::Normal;
    }
}

// ============================================================================
// Input Validation Helpers
// ============================================================================

/// Check if a character is valid for form fields (printable ASCII or Unicode, not control)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character can be added to a field of the given maximum length
pub fn can_add_field_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainverse_core::auth::MemoryStorage;

    fn test_app() -> App {
        let config = Config {
            canister_id: Some("ryjl3-tyaaa-aaaaa-aaaba-cai".to_string()),
            ..Default::default()
        };
        App::with_storage(config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_screen_for_session() {
        assert_eq!(Screen::for_session(&Session::loading()), Screen::Loading);
        assert_eq!(Screen::for_session(&Session::empty()), Screen::LoginPrompt);
        assert_eq!(
            Screen::for_session(&Session::authenticated("abcd1234-xyz")),
            Screen::UploadForm
        );
    }

    #[test]
    fn test_upload_focus_cycles() {
        assert_eq!(UploadFocus::Name.next(), UploadFocus::Description);
        assert_eq!(UploadFocus::Button.next(), UploadFocus::Name);
        assert_eq!(UploadFocus::Name.prev(), UploadFocus::Button);
        assert_eq!(UploadFocus::File.prev(), UploadFocus::Description);
    }

    #[test]
    fn test_can_add_field_char() {
        assert!(can_add_field_char(0, 10, 'a'));
        assert!(can_add_field_char(9, 10, 'é'));
        assert!(!can_add_field_char(10, 10, 'a'));
        assert!(!can_add_field_char(0, 10, '\n'));
    }

    #[test]
    fn test_app_starts_on_loading_screen() {
        let app = test_app();
        assert_eq!(app.screen(), Screen::Loading);
        assert!(app.welcome_text().is_none());
    }

    #[test]
    fn test_fresh_load_without_session_shows_login_prompt() {
        let mut app = test_app();
        app.process_task_result(TaskResult::Initialized(Session::empty()));
        assert_eq!(app.screen(), Screen::LoginPrompt);
    }

    #[test]
    fn test_successful_login_shows_upload_form_and_greeting() {
        let mut app = test_app();
        app.process_task_result(TaskResult::Initialized(Session::empty()));
        app.state = AppState::AwaitingLogin;

        app.process_task_result(TaskResult::LoginFinished(Ok(Session::authenticated("abcd1234-xyz"))));

        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.screen(), Screen::UploadForm);
        assert_eq!(app.welcome_text().as_deref(), Some("Welcome: abcd1234...-xyz"));
    }

    #[test]
    fn test_upload_field_editing() {
        let mut app = test_app();
        app.push_upload_char('h');
        app.push_upload_char('i');
        assert_eq!(app.upload_name, "hi");

        app.upload_focus = UploadFocus::Button;
        app.push_upload_char('x');
        assert_eq!(app.upload_name, "hi");

        app.upload_focus = UploadFocus::Name;
        app.pop_upload_char();
        assert_eq!(app.upload_name, "h");
    }

    #[test]
    fn test_submit_without_actor_reports_error() {
        let mut app = test_app();
        app.upload_name = "Object".to_string();
        app.submit_upload();
        assert!(!app.minting);
        assert!(app.upload_error.as_deref().unwrap().contains("Not connected"));
    }

    #[test]
    fn test_mint_result_resets_form() {
        let mut app = test_app();
        app.minting = true;
        app.upload_name = "Object".to_string();
        app.process_task_result(TaskResult::Minted(Ok(MintReceipt { token_id: 3 })));
        assert!(!app.minting);
        assert!(app.upload_name.is_empty());
        assert_eq!(app.status_message.as_deref(), Some("Minted token #3"));
    }
}
