use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;

use crate::auth::{CredentialProvider, StaticCredentialProvider};
use crate::domain::{AuthResponse, AuthState, Message};
use crate::services::{AuthService, ChatService};

use super::command::{self, Command, HELP};
use super::render::{ThreadView, render_sessions};

type Input = Lines<BufReader<Stdin>>;

enum Outcome {
    SignedOut,
    Quit,
}

/// Terminal front end: a sign-in prompt, then the chat screen for as long as the
/// user stays signed in.
pub struct App {
    auth: AuthService,
    credentials: Arc<StaticCredentialProvider>,
    new_chat: Box<dyn Fn() -> ChatService + Send + Sync>,
}

impl App {
    pub fn new(
        auth: AuthService,
        credentials: Arc<StaticCredentialProvider>,
        new_chat: impl Fn() -> ChatService + Send + Sync + 'static,
    ) -> Self {
        Self {
            auth,
            credentials,
            new_chat: Box::new(new_chat),
        }
    }

    pub async fn run(self) -> io::Result<()> {
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        let mut states = self.auth.state();

        loop {
            let state = match states.wait_for(|s| *s != AuthState::Checking).await {
                Ok(state) => state.clone(),
                Err(_) => return Ok(()),
            };

            match state {
                AuthState::SignedIn(user) => {
                    println!("Signed in as {}. Type /help for commands.", user.label());

                    let chat = (self.new_chat)();
                    let outcome = chat_screen(&chat, &mut input).await;
                    chat.settle().await;
                    chat.shutdown().await;

                    match outcome? {
                        Outcome::Quit => return Ok(()),
                        Outcome::SignedOut => {
                            if let AuthResponse::Error(e) = self.auth.sign_out().await {
                                println!("Sign-out failed: {}", e);
                            }
                            wait_until(&mut states, |s| *s == AuthState::SignedOut).await;
                            println!("Signed out.");
                        }
                    }
                }
                AuthState::SignedOut => {
                    if !self.sign_in(&mut input, &mut states).await? {
                        return Ok(());
                    }
                }
                AuthState::Checking => {}
            }
        }
    }

    /// Returns `false` when the user gave up.
    async fn sign_in(
        &self,
        input: &mut Input,
        states: &mut watch::Receiver<AuthState>,
    ) -> io::Result<bool> {
        if !self.credentials.has_token() {
            println!("Paste a Google ID token to sign in (or /quit):");
            let Some(line) = input.next_line().await? else {
                return Ok(false);
            };
            let line = line.trim();
            if line.is_empty() {
                return Ok(true);
            }
            if matches!(command::parse(line), Ok(Command::Quit)) {
                return Ok(false);
            }
            self.credentials.set_token(line);
        }

        match self.auth.sign_in().await {
            AuthResponse::Success => {
                wait_until(states, |s| matches!(s, AuthState::SignedIn(_))).await;
            }
            AuthResponse::Error(e) => {
                println!("Sign-in failed: {}", e);
                self.auth.clear_error();
                if let Err(e) = self.credentials.clear_credential_state().await {
                    tracing::warn!("Could not clear credential: {}", e);
                }
            }
        }
        Ok(true)
    }
}

async fn wait_until(
    states: &mut watch::Receiver<AuthState>,
    done: impl Fn(&AuthState) -> bool,
) {
    if states.wait_for(|s| done(s)).await.is_err() {
        tracing::debug!("Auth state channel closed");
    }
}

async fn chat_screen(chat: &ChatService, input: &mut Input) -> io::Result<Outcome> {
    let mut sessions = chat.sessions();
    let mut selected = chat.selected();
    let mut messages = chat.messages();
    let mut notices = chat.notices();
    let mut thread = ThreadView::default();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(Outcome::Quit);
                };
                match command::parse(&line) {
                    Ok(command) => {
                        if let Some(outcome) = handle(chat, command) {
                            return Ok(outcome);
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            Ok(()) = sessions.changed() => {
                let first = sessions.borrow_and_update().first().map(|s| s.id.clone());
                if chat.current_id().is_none() {
                    if let Some(first) = first {
                        chat.select_session(first);
                    }
                }
            }
            Ok(()) = selected.changed() => {
                selected.borrow_and_update();
                redraw(chat, &mut thread, &mut messages);
            }
            Ok(()) = messages.changed() => {
                redraw(chat, &mut thread, &mut messages);
            }
            Ok(()) = notices.changed() => {
                let notice = notices.borrow_and_update().clone();
                if let Some(notice) = notice {
                    println!("! {}", notice);
                    chat.clear_notice();
                }
            }
        }
    }
}

fn redraw(
    chat: &ChatService,
    thread: &mut ThreadView,
    messages: &mut watch::Receiver<Vec<Message>>,
) {
    let snapshot = messages.borrow_and_update().clone();
    let chat_id = chat.current_id();
    if let Some(text) = thread.update(chat_id.as_deref(), &chat.current_title(), &snapshot) {
        println!("{}", text);
    }
}

fn handle(chat: &ChatService, command: Command) -> Option<Outcome> {
    match command {
        Command::Empty => {}
        Command::Help => println!("{}", HELP),
        Command::Quit => return Some(Outcome::Quit),
        Command::SignOut => return Some(Outcome::SignedOut),
        Command::New => chat.create_session(),
        Command::Chats => {
            let current = chat.current_id();
            println!("{}", render_sessions(&chat.sessions().borrow(), current.as_deref()));
        }
        Command::Open(target) => {
            let found = target
                .resolve(&chat.sessions().borrow())
                .map(|s| s.id.clone());
            match found {
                Some(id) => chat.select_session(id),
                None => println!("No such chat. Type /chats to list them."),
            }
        }
        Command::Rename(title) => match chat.current_id() {
            Some(id) => chat.rename_session(id, title),
            None => println!("No chat selected."),
        },
        Command::Delete(target) => {
            let id = match target {
                Some(target) => target
                    .resolve(&chat.sessions().borrow())
                    .map(|s| s.id.clone()),
                None => chat.current_id(),
            };
            match id {
                Some(id) => chat.delete_session(id),
                None => println!("No such chat."),
            }
        }
        Command::Image(path) => {
            if chat.current_id().is_none() {
                println!("No chat selected. Type /new first.");
            } else {
                chat.send_image(path);
            }
        }
        Command::Send(text) => {
            if chat.current_id().is_none() {
                println!("No chat selected. Type /new first.");
            } else {
                chat.send_message(text);
            }
        }
    }
    None
}
