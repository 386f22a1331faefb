//! The demo dialog tree the console runs.
//!
//! A profile waterfall asks for a name and a newsletter opt-in, wrapped in
//! a component that answers "help" and "cancel" at any point.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::DialogError;
use parley_dialogs::domain::context::DialogContext;
use parley_dialogs::domain::dialog::{Dialog, DialogKind, DialogReason, DialogTurnResult};
use parley_dialogs::domain::events::{ACTIVITY_RECEIVED, CANCEL_DIALOG, DialogEvent};
use parley_dialogs::domain::registry::DialogSet;
use parley_dialogs::library::component::ComponentDialog;
use parley_dialogs::library::prompt::{ConfirmPrompt, PromptOptions, TextPrompt};
use parley_dialogs::library::waterfall::{Waterfall, WaterfallStep, WaterfallStepContext};
use serde_json::Value;
use tracing::info;

/// Id of the dialog begun for new conversations.
pub const ROOT_DIALOG_ID: &str = "main";

const PROFILE: &str = "profile";
const NAME_PROMPT: &str = "name";
const NEWSLETTER_PROMPT: &str = "newsletter";
const MAX_NAME_LEN: usize = 40;

struct AskName;

#[async_trait]
impl WaterfallStep for AskName {
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let company = step
            .get::<String>("settings.companyName")?
            .unwrap_or_else(|| "Parley".to_string());
        step.prompt(
            NAME_PROMPT,
            PromptOptions::new(format!("Welcome to {company}. What is your name?"))
                .with_retry(format!("Please enter a name of at most {MAX_NAME_LEN} characters.")),
        )
        .await
    }
}

struct AskNewsletter;

#[async_trait]
impl WaterfallStep for AskNewsletter {
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let name = step.result().cloned().unwrap_or(Value::Null);
        step.save_value("name", name.clone())?;
        step.set_value("user.name", name.clone())?;
        step.prompt(
            NEWSLETTER_PROMPT,
            PromptOptions::new(format!(
                "Nice to meet you, {}. Would you like our newsletter?",
                name.as_str().unwrap_or_default()
            ))
            .with_retry("Please answer yes or no."),
        )
        .await
    }
}

struct Summarize;

#[async_trait]
impl WaterfallStep for Summarize {
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let subscribed = step.result().and_then(Value::as_bool).unwrap_or(false);
        let mut values = step.values()?;
        values.insert("newsletter".to_string(), Value::Bool(subscribed));
        step.set_value("user.newsletter", Value::Bool(subscribed))?;

        let reply = if subscribed {
            "You're subscribed. Say anything to start over."
        } else {
            "No newsletter then. Say anything to start over."
        };
        step.send_text(reply);
        step.end_dialog(Some(Value::Object(values))).await
    }
}

/// The component that hosts the profile waterfall and handles the
/// "help" and "cancel" keywords before the active prompt sees them.
#[derive(Debug)]
pub struct DemoRoot {
    component: ComponentDialog,
}

impl DemoRoot {
    /// Builds the demo tree.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::DuplicateId` if the child dialogs collide.
    pub fn new() -> Result<Self, DialogError> {
        let mut dialogs = DialogSet::new();
        dialogs.add(
            Waterfall::new(PROFILE)
                .with_tag("profile")
                .step(AskName)
                .step(AskNewsletter)
                .step(Summarize),
        )?;
        dialogs.add(TextPrompt::new(NAME_PROMPT).with_validator(|ctx| {
            ctx.recognized
                .as_str()
                .is_some_and(|name| name.chars().count() <= MAX_NAME_LEN)
        }))?;
        dialogs.add(ConfirmPrompt::new(NEWSLETTER_PROMPT))?;

        Ok(Self {
            component: ComponentDialog::new(ROOT_DIALOG_ID, PROFILE, dialogs),
        })
    }
}

fn keyword(event: &DialogEvent) -> Option<String> {
    if event.name != ACTIVITY_RECEIVED {
        return None;
    }
    event
        .value
        .as_ref()
        .and_then(|activity| activity["text"].as_str())
        .map(|text| text.trim().to_ascii_lowercase())
}

#[async_trait]
impl Dialog for DemoRoot {
    fn id(&self) -> &str {
        self.component.id()
    }

    fn kind(&self) -> DialogKind {
        DialogKind::Container
    }

    fn child_dialogs(&self) -> Option<Arc<DialogSet>> {
        self.component.child_dialogs()
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.component.begin_dialog(dc, options).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.component.continue_dialog(dc).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.component.resume_dialog(dc, reason, result).await
    }

    async fn reprompt_dialog(&self, dc: &mut DialogContext<'_>) -> Result<(), DialogError> {
        self.component.reprompt_dialog(dc).await
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        self.component.end_dialog(dc, reason).await
    }

    async fn on_pre_bubble_event(
        &self,
        dc: &mut DialogContext<'_>,
        event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        match keyword(event).as_deref() {
            Some("help") => {
                dc.send_text("Answer the question below, or say 'cancel' to stop.");
                dc.reprompt_dialog().await?;
                Ok(true)
            }
            Some("cancel") => {
                info!("user cancelled the conversation");
                dc.send_text("Cancelled. Say anything to start over.");
                dc.cancel_all_dialogs(CANCEL_DIALOG, None).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// The root dialog set the console runs.
///
/// # Errors
///
/// Returns `DialogError::DuplicateId` if the demo's ids collide.
pub fn dialogs() -> Result<DialogSet, DialogError> {
    let mut set = DialogSet::new();
    set.add(DemoRoot::new()?)?;
    Ok(set)
}
