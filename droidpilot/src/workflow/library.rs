//! Built-in workflows and the tool-call surface that invokes them

use super::{SocialApp, StepAction, Workflow, WorkflowEngine, WorkflowResult, WorkflowStep, WorkflowTiming};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

const DEFAULT_TRANSCRIPT_LINES: usize = 10;

/// A tool call from the agent layer.
///
/// ```json
/// {"tool": "send_message", "app": "messenger", "contact": "Lan", "message": "Hi"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum WorkflowCall {
    PostToFeed {
        app: SocialApp,
        content: String,
    },
    ReplyInConversation {
        app: SocialApp,
        message: String,
    },
    SendMessage {
        app: SocialApp,
        contact: String,
        message: String,
    },
    ReadRecentMessages {
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl WorkflowCall {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowCall::PostToFeed { .. } => "post_to_feed",
            WorkflowCall::ReplyInConversation { .. } => "reply_in_conversation",
            WorkflowCall::SendMessage { .. } => "send_message",
            WorkflowCall::ReadRecentMessages { .. } => "read_recent_messages",
        }
    }
}

impl WorkflowEngine {
    #[instrument(skip(self, call), fields(tool = call.name()))]
    pub async fn invoke(&self, call: WorkflowCall) -> WorkflowResult {
        let workflow = match call {
            WorkflowCall::ReadRecentMessages { limit } => {
                return self
                    .read_recent_messages(limit.unwrap_or(DEFAULT_TRANSCRIPT_LINES))
                    .await;
            }
            WorkflowCall::PostToFeed { app, content } => {
                post_to_feed(app, &content, &self.timing)
            }
            WorkflowCall::ReplyInConversation { app, message } => {
                reply_in_conversation(app, &message, &self.timing)
            }
            WorkflowCall::SendMessage {
                app,
                contact,
                message,
            } => send_message_to_contact(app, &contact, &message, &self.timing),
        };

        match workflow {
            Ok(workflow) => self.run(&workflow).await,
            Err(reason) => {
                warn!("Rejected tool call: {}", reason);
                WorkflowResult::failed(reason)
            }
        }
    }

    /// Parses a JSON tool call and runs it. Malformed calls come back as a
    /// failed result.
    pub async fn invoke_json(&self, payload: &str) -> WorkflowResult {
        match serde_json::from_str::<WorkflowCall>(payload) {
            Ok(call) => self.invoke(call).await,
            Err(e) => WorkflowResult::failed(format!("Invalid tool call: {e}")),
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

fn clicks(labels: &[&str]) -> Vec<StepAction> {
    labels.iter().map(|label| StepAction::click(*label)).collect()
}

fn typed_into(hints: &[&str], text: &str) -> Vec<StepAction> {
    hints
        .iter()
        .map(|hint| StepAction::type_into(*hint, text))
        .collect()
}

/// Opens the app's composer, writes `content` and publishes it.
pub fn post_to_feed(
    app: SocialApp,
    content: &str,
    timing: &WorkflowTiming,
) -> Result<Workflow, String> {
    non_empty("content", content)?;
    if app.composer_labels().is_empty() {
        return Err(format!("{app} has no feed to post to"));
    }

    let mut enter_text = vec![StepAction::type_focused(content)];
    enter_text.extend(typed_into(app.composer_labels(), content));

    Ok(Workflow::new("post_to_feed", format!("Posted to {app} feed"))
        .step(WorkflowStep::required(format!("open {app}")).candidate(StepAction::open_app(app.package())))
        .step(
            WorkflowStep::required("open the post composer")
                .candidates(clicks(app.composer_labels()))
                .after(timing.app_launch),
        )
        .step(
            WorkflowStep::required("enter the post text")
                .candidates(enter_text)
                .after(timing.composer_open),
        )
        .step(
            WorkflowStep::required("publish the post")
                .candidates(clicks(app.publish_labels()))
                .after(timing.after_typing),
        ))
}

/// Replies in the conversation that is already open.
pub fn reply_in_conversation(
    app: SocialApp,
    message: &str,
    timing: &WorkflowTiming,
) -> Result<Workflow, String> {
    non_empty("message", message)?;

    let mut send = clicks(app.send_labels());
    send.push(StepAction::PressEnter);

    Ok(Workflow::new("reply_in_conversation", format!("Replied in {app}"))
        .step(
            WorkflowStep::required("enter the reply")
                .candidates(typed_into(app.message_hints(), message)),
        )
        .step(
            WorkflowStep::required("send the reply")
                .candidates(send)
                .after(timing.after_typing),
        ))
}

/// Finds `contact` through the app's search and sends them `message`.
pub fn send_message_to_contact(
    app: SocialApp,
    contact: &str,
    message: &str,
    timing: &WorkflowTiming,
) -> Result<Workflow, String> {
    non_empty("contact", contact)?;
    non_empty("message", message)?;

    let mut enter_contact = vec![StepAction::type_focused(contact)];
    enter_contact.extend(typed_into(app.search_labels(), contact));

    let mut send = clicks(app.send_labels());
    send.push(StepAction::PressEnter);

    Ok(Workflow::new(
        "send_message",
        format!("Sent message to {contact} on {app}"),
    )
    .step(WorkflowStep::required(format!("open {app}")).candidate(StepAction::open_app(app.package())))
    .step(
        WorkflowStep::required("open search")
            .candidates(clicks(app.search_labels()))
            .after(timing.app_launch),
    )
    .step(
        WorkflowStep::required("enter the contact name")
            .candidates(enter_contact)
            .after(timing.transition),
    )
    .step(
        WorkflowStep::required(format!("open the conversation with {contact}"))
            .candidate(StepAction::click(contact))
            .after(timing.transition),
    )
    .step(
        WorkflowStep::required("enter the message")
            .candidates(typed_into(app.message_hints(), message))
            .after(timing.transition),
    )
    .step(
        WorkflowStep::required("send the message")
            .candidates(send)
            .after(timing.after_typing),
    ))
}
