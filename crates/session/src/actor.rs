//! Command-driven event loop for an editor session

use crate::{EditorSession, Result};
use doc_model::{Node, NodePath};
use serde_json::Value;
use store::{AutosaveConfig, Resource};
use tokio::sync::{mpsc, oneshot};

/// User intents and lifecycle requests sent to a running session
#[derive(Debug)]
pub enum SessionCommand {
    Select(NodePath),
    Deselect,
    FormChanged(Value),
    RequestAdd {
        parent: NodePath,
        property: String,
        child_type: String,
        reply: Option<oneshot::Sender<Result<Node>>>,
    },
    ExecuteCommand {
        command_id: String,
        target: NodePath,
        reply: Option<oneshot::Sender<Result<Node>>>,
    },
    RequestDelete {
        path: NodePath,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Save {
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Revert,
    FocusLost,
    SetAutosave(AutosaveConfig),
    Close,
}

fn respond<T>(reply: Option<oneshot::Sender<Result<T>>>, result: Result<T>) {
    match reply {
        // The requester may have stopped waiting.
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => {
            if let Err(e) = result {
                tracing::warn!("Session command failed: {}", e);
            }
        }
    }
}

impl<R: Resource + 'static> EditorSession<R> {
    /// Drive the session until `Close` arrives or every command sender is
    /// dropped, then close it.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        tracing::debug!(uri = %self.uri(), "session loop started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::Close) | None => break,
                        Some(command) => self.handle_command(command).await,
                    }
                }
                Some(event) = self.next_event() => self.handle_event(event),
            }
        }
        self.close();
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Select(path) => {
                if let Err(e) = self.select(&path) {
                    tracing::warn!("Selection failed: {}", e);
                }
            }
            SessionCommand::Deselect => self.deselect(),
            SessionCommand::FormChanged(data) => self.form_changed(data),
            SessionCommand::RequestAdd {
                parent,
                property,
                child_type,
                reply,
            } => {
                let result = self.request_add(&parent, &property, &child_type);
                respond(reply, result);
            }
            SessionCommand::ExecuteCommand {
                command_id,
                target,
                reply,
            } => {
                let result = self.execute_command(&command_id, &target);
                respond(reply, result);
            }
            SessionCommand::RequestDelete { path, reply } => {
                let result = self.request_delete(&path);
                respond(reply, result);
            }
            SessionCommand::Save { reply } => {
                let result = self.save().await;
                respond(reply, result);
            }
            SessionCommand::Revert => self.revert().await,
            SessionCommand::FocusLost => self.focus_lost(),
            SessionCommand::SetAutosave(config) => self.set_autosave_config(config),
            SessionCommand::Close => {}
        }
    }
}
