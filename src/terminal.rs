use crate::backend::{BackendError, CommentBackend};
use crate::catalog::{self, SectionId};
use crate::commands::{self, Outcome};
use crate::config::TerminalConfig;
use crate::renderer::Screen;
use crate::state::{AuthStatus, Comment, Phase, Session};
use crate::storage::TutorialFlag;
use crate::typewriter;
use crate::utils;
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedSession = Rc<RefCell<Session>>;

const NO_AUTOCOMPLETE_MESSAGE: &str = "bash: no autocompletion available";
const NOT_LOGGED_IN_MESSAGE: &str = "You are not logged in. Open comments.log to sign in.";
const COMMENT_POSTED_MESSAGE: &str = "Comment posted. Thank you!";
const COMMENT_UNAVAILABLE_MESSAGE: &str =
    "Could not reach the comment service. Please try again later.";
const OPTIMISTIC_AUTHOR: &str = "you";

/// Work a command leaves behind once its prompt has been re-armed.
enum FollowUp<I> {
    LoadComments,
    Post { text: String, item: Option<I> },
}

/// The shell interpreter: owns the session, drives the screen and talks to the
/// comment backend.
pub struct Terminal<S: Screen, B: CommentBackend> {
    session: SharedSession,
    screen: Rc<S>,
    backend: Rc<B>,
    flag: Box<dyn TutorialFlag>,
    config: TerminalConfig,
    prompt: RefCell<Option<S::Line>>,
    clock: fn() -> i64,
}

impl<S: Screen, B: CommentBackend> Terminal<S, B> {
    pub fn new(
        session: SharedSession,
        screen: Rc<S>,
        backend: Rc<B>,
        flag: Box<dyn TutorialFlag>,
        config: TerminalConfig,
    ) -> Self {
        Self {
            session,
            screen,
            backend,
            flag,
            config,
            prompt: RefCell::new(None),
            clock: utils::now_millis,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// True while a live prompt is waiting for keystrokes.
    pub fn accepts_input(&self) -> bool {
        let session = self.session.borrow();
        session.is_open && session.phase == Phase::Prompt
    }

    /// Shows or hides the panel. The first open plays the tutorial unless it
    /// was already seen on an earlier visit.
    pub async fn toggle(&self) {
        let opening = {
            let mut session = self.session.borrow_mut();
            session.is_open = !session.is_open;
            session.is_open
        };
        if let Err(err) = self.screen.set_visible(opening) {
            utils::log(&format!("Failed to toggle terminal: {:?}", err));
        }
        if !opening {
            return;
        }

        let phase = { self.session.borrow().phase };
        match phase {
            Phase::Idle => {
                if self.claim_tutorial() {
                    self.play_tutorial().await;
                }
                self.arm_prompt("");
            }
            Phase::Prompt => {
                if let Some(line) = self.prompt.borrow().as_ref() {
                    self.screen.focus_prompt(line);
                }
            }
            // The running task arms the prompt itself.
            Phase::Tutorial | Phase::Processing => {}
        }
    }

    fn claim_tutorial(&self) -> bool {
        let mut session = self.session.borrow_mut();
        let shown = *session
            .has_shown_tutorial
            .get_or_insert_with(|| self.flag.is_set());
        if shown {
            return false;
        }
        session.has_shown_tutorial = Some(true);
        self.flag.set();
        true
    }

    async fn play_tutorial(&self) {
        {
            self.session.borrow_mut().phase = Phase::Tutorial;
        }
        for line in &self.config.tutorial {
            self.type_line(line, self.config.tutorial_speed_ms).await;
        }
    }

    /// Runs the command typed into the live prompt.
    pub async fn submit(&self) {
        if self.session.borrow().phase != Phase::Prompt {
            return;
        }
        let Some(line) = self.prompt.borrow_mut().take() else {
            return;
        };

        let raw = self.screen.prompt_text(&line);
        if let Err(err) = self.screen.disable_prompt(&line) {
            utils::log(&format!("Failed to disable prompt: {:?}", err));
        }
        {
            let mut session = self.session.borrow_mut();
            session.phase = Phase::Processing;
            session.remember_input(&raw);
        }

        let follow_up = self.dispatch(&raw).await;
        self.arm_prompt("");

        match follow_up {
            Some(FollowUp::LoadComments) => self.load_comments().await,
            Some(FollowUp::Post { text, item }) => self.finish_post(&text, item).await,
            None => {}
        }
    }

    async fn dispatch(&self, raw: &str) -> Option<FollowUp<S::CommentItem>> {
        let outcome = match commands::parse(raw) {
            Ok(None) => return None,
            Ok(Some(command)) => {
                let mut session = self.session.borrow_mut();
                command.run(&mut session)
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(Outcome::Lines(lines)) => {
                for line in &lines {
                    self.type_line(line, self.config.output_speed_ms).await;
                }
                None
            }
            Ok(Outcome::Navigate { hide, reveal }) => self.show_section(hide, reveal),
            Ok(Outcome::Comment(text)) => self.stage_comment(text).await,
            Err(err) => {
                self.type_line(&err.banner_line(), self.config.output_speed_ms)
                    .await;
                None
            }
        }
    }

    fn show_section(
        &self,
        hide: SectionId,
        reveal: SectionId,
    ) -> Option<FollowUp<S::CommentItem>> {
        if let Err(err) = self.screen.show_section(hide, reveal) {
            utils::log(&format!("Failed to show section: {:?}", err));
        }
        (reveal == SectionId::Comments).then_some(FollowUp::LoadComments)
    }

    /// Navigates to the section a URL fragment names, bypassing the prompt.
    /// Returns whether the fragment matched a catalog entry.
    pub async fn open_deep_link(&self, hash: &str) -> bool {
        let Some(section) = catalog::lookup_fragment(hash) else {
            return false;
        };
        let hide = { self.session.borrow_mut().navigate(section) };
        if let Some(FollowUp::LoadComments) = self.show_section(hide, section) {
            self.load_comments().await;
        }
        true
    }

    async fn stage_comment(&self, text: String) -> Option<FollowUp<S::CommentItem>> {
        let auth = match self.backend.auth_status().await {
            Ok(auth) => auth,
            Err(err) => {
                utils::log(&format!("Failed to check login status: {err}"));
                self.type_line(COMMENT_UNAVAILABLE_MESSAGE, self.config.output_speed_ms)
                    .await;
                return None;
            }
        };
        if !auth.logged_in {
            self.type_line(NOT_LOGGED_IN_MESSAGE, self.config.output_speed_ms)
                .await;
            return None;
        }

        let comment = Comment {
            author: OPTIMISTIC_AUTHOR.to_string(),
            text: text.clone(),
            timestamp: (self.clock)(),
        };
        let item = match self.screen.prepend_comment(&comment) {
            Ok(item) => Some(item),
            Err(err) => {
                utils::log(&format!("Failed to render pending comment: {:?}", err));
                None
            }
        };
        self.type_line(COMMENT_POSTED_MESSAGE, self.config.output_speed_ms)
            .await;
        Some(FollowUp::Post { text, item })
    }

    async fn finish_post(&self, text: &str, item: Option<S::CommentItem>) {
        let Err(err) = self.backend.post_comment(text).await else {
            return;
        };
        utils::log(&format!("Failed to post comment: {err}"));
        if let Some(item) = item {
            if let Err(err) = self.screen.remove_comment(&item) {
                utils::log(&format!("Failed to roll back comment: {:?}", err));
            }
        }
    }

    /// Fetches and renders the comment list and login affordance, at most once
    /// per page load. A failed load may be retried by a later visit.
    pub async fn load_comments(&self) {
        let claimed = { self.session.borrow_mut().claim_comment_load() };
        if !claimed {
            return;
        }

        match self.fetch_comments().await {
            Ok((mut comments, auth)) => {
                comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                if let Err(err) = self.screen.render_comments(&comments, &auth) {
                    utils::log(&format!("Failed to render comments: {:?}", err));
                }
            }
            Err(err) => {
                utils::log(&format!("Failed to load comments: {err}"));
                self.session.borrow_mut().release_comment_load();
            }
        }
    }

    async fn fetch_comments(&self) -> Result<(Vec<Comment>, AuthStatus), BackendError> {
        let comments = self.backend.list_comments().await?;
        let auth = self.backend.auth_status().await?;
        Ok((comments, auth))
    }

    /// Tab: freeze the current prompt, say so, and carry its text over to a
    /// fresh one.
    pub fn reject_autocomplete(&self) {
        if !self.accepts_input() {
            return;
        }
        let Some(line) = self.prompt.borrow_mut().take() else {
            return;
        };
        let partial = self.screen.prompt_text(&line);
        if let Err(err) = self.screen.disable_prompt(&line) {
            utils::log(&format!("Failed to disable prompt: {:?}", err));
        }
        let notice = self
            .screen
            .append_line(Some(NO_AUTOCOMPLETE_MESSAGE))
            .and_then(|notice| self.screen.finish_line(&notice));
        if let Err(err) = notice {
            utils::log(&format!("Failed to print autocomplete notice: {:?}", err));
        }
        self.arm_prompt(&partial);
    }

    /// ArrowUp: bring back the last submitted line.
    pub fn recall_history(&self) {
        if !self.accepts_input() {
            return;
        }
        let Some(previous) = self.session.borrow().last_submitted_input.clone() else {
            return;
        };
        if let Some(line) = self.prompt.borrow().as_ref() {
            self.screen.set_prompt_text(line, &previous);
        }
    }

    async fn type_line(&self, text: &str, speed_ms: u32) {
        let result = match self.screen.append_line(None) {
            Ok(line) => typewriter::render(self.screen.as_ref(), &line, text, speed_ms).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            utils::log(&format!("Failed to write terminal line: {:?}", err));
        }
    }

    fn arm_prompt(&self, text: &str) {
        let armed = self.screen.append_line(None).and_then(|line| {
            self.screen
                .append_prompt(&line, &self.config.prompt_label, text)?;
            Ok(line)
        });
        match armed {
            Ok(line) => {
                *self.prompt.borrow_mut() = Some(line);
                self.session.borrow_mut().phase = Phase::Prompt;
            }
            Err(err) => {
                utils::log(&format!("Failed to arm prompt: {:?}", err));
                // Lets the next open try again.
                self.session.borrow_mut().phase = Phase::Idle;
            }
        }
    }
}
