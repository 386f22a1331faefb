//! Integration tests for the dialog library driven turn by turn.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parley_core::error::DialogError;
use parley_core::repository::StateStore;
use parley_dialogs::application::memory_store::MemoryStateStore;
use parley_dialogs::application::runner::DialogRunner;
use parley_dialogs::application::turn_handlers::TurnOutcome;
use parley_dialogs::domain::context::DialogContext;
use parley_dialogs::domain::dialog::{
    Dialog, DialogKind, DialogReason, DialogTurnResult, DialogTurnStatus,
};
use parley_dialogs::domain::events::{ACTIVITY_RECEIVED, CANCEL_DIALOG, DialogEvent};
use parley_dialogs::domain::registry::DialogSet;
use parley_dialogs::domain::turn::DIALOG_STACK_KEY;
use parley_dialogs::library::component::ComponentDialog;
use parley_dialogs::library::prompt::{ConfirmPrompt, PromptOptions, TextPrompt};
use parley_dialogs::library::waterfall::{Waterfall, WaterfallStep, WaterfallStepContext};
use parley_test_support::{FixedClock, TEST_CONVERSATION_ID, event, message};
use serde_json::{Value, json};

struct AskName;

#[async_trait]
impl WaterfallStep for AskName {
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError> {
        step.prompt(
            "name",
            PromptOptions::new("What is your name?").with_retry("I need a name to continue."),
        )
        .await
    }
}

struct ConfirmName;

#[async_trait]
impl WaterfallStep for ConfirmName {
    async fn run(
        &self,
        step: &mut WaterfallStepContext<'_, '_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let name = step.result().cloned().unwrap_or(Value::Null);
        step.save_value("name", name.clone())?;
        let company = step
            .get::<String>("settings.companyName")?
            .unwrap_or_else(|| "us".to_owned());
        let question = format!(
            "Is {} right? {company} wants to be sure.",
            name.as_str().unwrap_or_default()
        );
        step.prompt(
            "confirm",
            PromptOptions::new(question).with_retry("Please answer yes or no."),
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
        let mut values = step.values()?;
        values.insert(
            "confirmed".to_owned(),
            step.result().cloned().unwrap_or(Value::Null),
        );
        step.end_dialog(Some(Value::Object(values))).await
    }
}

fn onboarding() -> DialogSet {
    let mut set = DialogSet::new();
    set.add(
        Waterfall::new("onboarding")
            .step(AskName)
            .step(ConfirmName)
            .step(Summarize),
    )
    .unwrap();
    set.add(TextPrompt::new("name")).unwrap();
    set.add(ConfirmPrompt::new("confirm")).unwrap();
    set
}

/// Wraps a component and cancels everything when the user types "cancel".
#[derive(Debug)]
struct CancelOnKeyword(ComponentDialog);

#[async_trait]
impl Dialog for CancelOnKeyword {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn kind(&self) -> DialogKind {
        DialogKind::Container
    }

    fn child_dialogs(&self) -> Option<Arc<DialogSet>> {
        self.0.child_dialogs()
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.0.begin_dialog(dc, options).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.0.continue_dialog(dc).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.0.resume_dialog(dc, reason, result).await
    }

    async fn end_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        self.0.end_dialog(dc, reason).await
    }

    async fn on_pre_bubble_event(
        &self,
        dc: &mut DialogContext<'_>,
        event: &DialogEvent,
    ) -> Result<bool, DialogError> {
        let is_cancel = event.name == ACTIVITY_RECEIVED
            && event
                .value
                .as_ref()
                .and_then(|activity| activity["text"].as_str())
                .is_some_and(|text| text.eq_ignore_ascii_case("cancel"));
        if !is_cancel {
            return Ok(false);
        }
        dc.send_text("Cancelled.");
        dc.cancel_all_dialogs(CANCEL_DIALOG, None).await?;
        Ok(true)
    }
}

fn runner(dialogs: DialogSet, root: &str, store: Arc<MemoryStateStore>) -> DialogRunner {
    let mut settings = serde_json::Map::new();
    settings.insert("companyName".into(), json!("Acme"));
    DialogRunner::new(dialogs, root, store)
        .with_settings(settings)
        .with_clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )))
}

fn texts(outcome: &TurnOutcome) -> Vec<&str> {
    outcome
        .replies
        .iter()
        .filter_map(|reply| reply.text.as_deref())
        .collect()
}

#[tokio::test]
async fn test_waterfall_with_prompts_runs_across_turns() {
    // Arrange
    let store = Arc::new(MemoryStateStore::new());
    let runner = runner(onboarding(), "onboarding", Arc::clone(&store));

    // Act
    let greeting = runner.run_turn(message("hi")).await.unwrap();
    let blank = runner.run_turn(message("   ")).await.unwrap();
    let name = runner.run_turn(message("Ada")).await.unwrap();
    let unsure = runner.run_turn(message("maybe")).await.unwrap();
    let confirmed = runner.run_turn(message("yes")).await.unwrap();

    // Assert
    assert_eq!(greeting.status, DialogTurnStatus::Waiting);
    assert_eq!(texts(&greeting), vec!["What is your name?"]);
    assert_eq!(texts(&blank), vec!["I need a name to continue."]);
    assert_eq!(texts(&name), vec!["Is Ada right? Acme wants to be sure."]);
    assert_eq!(texts(&unsure), vec!["Please answer yes or no."]);
    assert_eq!(confirmed.status, DialogTurnStatus::Completed);
    assert_eq!(
        confirmed.result,
        Some(json!({"name": "Ada", "confirmed": true}))
    );
    let saved = store.load(TEST_CONVERSATION_ID).await.unwrap().unwrap();
    assert!(!saved.conversation.contains_key(DIALOG_STACK_KEY));
}

#[tokio::test]
async fn test_completed_conversation_restarts_root_on_next_turn() {
    let store = Arc::new(MemoryStateStore::new());
    let runner = runner(onboarding(), "onboarding", store);
    for text in ["hi", "Ada", "no"] {
        runner.run_turn(message(text)).await.unwrap();
    }

    let restarted = runner.run_turn(message("hello again")).await.unwrap();

    assert_eq!(restarted.status, DialogTurnStatus::Waiting);
    assert_eq!(texts(&restarted), vec!["What is your name?"]);
}

#[tokio::test]
async fn test_prompt_ignores_non_message_activities() {
    let store = Arc::new(MemoryStateStore::new());
    let runner = runner(onboarding(), "onboarding", store);
    runner.run_turn(message("hi")).await.unwrap();

    let outcome = runner.run_turn(event("typing", None)).await.unwrap();

    assert_eq!(outcome.status, DialogTurnStatus::Waiting);
    assert!(outcome.replies.is_empty());
}

#[tokio::test]
async fn test_keyword_interrupt_cancels_nested_stack() {
    // Arrange
    let mut root = DialogSet::new();
    root.add(CancelOnKeyword(ComponentDialog::new(
        "main",
        "onboarding",
        onboarding(),
    )))
    .unwrap();
    let store = Arc::new(MemoryStateStore::new());
    let runner = runner(root, "main", Arc::clone(&store));
    runner.run_turn(message("hi")).await.unwrap();
    runner.run_turn(message("Ada")).await.unwrap();

    // Act
    let cancelled = runner.run_turn(message("cancel")).await.unwrap();
    let restarted = runner.run_turn(message("hi")).await.unwrap();

    // Assert
    assert_eq!(cancelled.status, DialogTurnStatus::Cancelled);
    assert_eq!(texts(&cancelled), vec!["Cancelled."]);
    assert_eq!(texts(&restarted), vec!["What is your name?"]);
}

#[tokio::test]
async fn test_nested_prompt_result_flows_out_of_component() {
    let mut root = DialogSet::new();
    root.add(ComponentDialog::new("main", "onboarding", onboarding()))
        .unwrap();
    let store = Arc::new(MemoryStateStore::new());
    let runner = runner(root, "main", store);

    let mut last = None;
    for text in ["hi", "Grace", "y"] {
        last = Some(runner.run_turn(message(text)).await.unwrap());
    }
    let last = last.unwrap();

    assert_eq!(last.status, DialogTurnStatus::Completed);
    assert_eq!(last.result, Some(json!({"name": "Grace", "confirmed": true})));
}
