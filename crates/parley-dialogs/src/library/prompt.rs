//! Prompt dialogs.
//!
//! A prompt sends a question, waits for the next message, recognizes a value
//! in it and ends with that value. Unrecognized or rejected input is answered
//! with the retry prompt and the prompt keeps waiting.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::activity::Activity;
use parley_core::error::DialogError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::context::DialogContext;
use crate::domain::dialog::{Dialog, DialogReason, DialogTurnResult};
use crate::domain::scope::DIALOG_OPTIONS;

/// Number of messages the prompt has received so far.
pub const ATTEMPT_COUNT: &str = "dialog.attemptCount";

/// What a prompt says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOptions {
    /// Sent when the prompt begins and when it is re-prompted.
    pub prompt: String,
    /// Sent after input that was not recognized or not accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
}

impl PromptOptions {
    /// Options with only a prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            retry_prompt: None,
        }
    }

    /// Sets the retry prompt.
    #[must_use]
    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    fn retry_text(&self) -> &str {
        self.retry_prompt.as_deref().unwrap_or(&self.prompt)
    }
}

/// Extracts a value from an inbound message.
pub trait Recognizer: Send + Sync + fmt::Debug {
    /// Returns the recognized value, or `None` if the message holds none.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::Collaborator` when recognition depends on a
    /// service that failed.
    fn recognize(&self, activity: &Activity) -> Result<Option<Value>, DialogError>;
}

/// Recognizes any non-blank text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRecognizer;

impl Recognizer for TextRecognizer {
    fn recognize(&self, activity: &Activity) -> Result<Option<Value>, DialogError> {
        let text = activity.text_or_empty().trim();
        Ok((!text.is_empty()).then(|| Value::from(text)))
    }
}

/// Recognizes yes/no answers as booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmRecognizer;

const YES: [&str; 6] = ["yes", "y", "yeah", "sure", "ok", "true"];
const NO: [&str; 4] = ["no", "n", "nope", "false"];

impl Recognizer for ConfirmRecognizer {
    fn recognize(&self, activity: &Activity) -> Result<Option<Value>, DialogError> {
        let answer = activity
            .text_or_empty()
            .trim()
            .trim_end_matches(['.', '!'])
            .to_lowercase();
        let answer = if YES.contains(&answer.as_str()) {
            Some(Value::Bool(true))
        } else if NO.contains(&answer.as_str()) {
            Some(Value::Bool(false))
        } else {
            None
        };
        Ok(answer)
    }
}

/// What a validator gets to look at.
#[derive(Debug)]
pub struct PromptValidatorContext<'v> {
    /// The value the recognizer produced.
    pub recognized: &'v Value,
    /// Messages received so far, including this one.
    pub attempt_count: u64,
    /// The options the prompt was begun with.
    pub options: &'v PromptOptions,
}

/// Accepts or rejects a recognized value.
pub type PromptValidator = Arc<dyn Fn(&PromptValidatorContext<'_>) -> bool + Send + Sync>;

/// A leaf dialog that asks for one value.
pub struct Prompt<R> {
    id: String,
    recognizer: R,
    validator: Option<PromptValidator>,
}

/// Prompts for free text.
pub type TextPrompt = Prompt<TextRecognizer>;
/// Prompts for a yes/no answer.
pub type ConfirmPrompt = Prompt<ConfirmRecognizer>;

impl<R: Recognizer + Default> Prompt<R> {
    /// Creates a prompt with the recognizer's default configuration.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_recognizer(id, R::default())
    }
}

impl<R: Recognizer> Prompt<R> {
    /// Creates a prompt around a configured recognizer.
    #[must_use]
    pub fn with_recognizer(id: impl Into<String>, recognizer: R) -> Self {
        Self {
            id: id.into(),
            recognizer,
            validator: None,
        }
    }

    /// Adds a validator run after successful recognition.
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&PromptValidatorContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    fn accepts(&self, recognized: &Value, attempt_count: u64, options: &PromptOptions) -> bool {
        self.validator.as_ref().is_none_or(|validator| {
            validator(&PromptValidatorContext {
                recognized,
                attempt_count,
                options,
            })
        })
    }
}

impl<R: fmt::Debug> fmt::Debug for Prompt<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("id", &self.id)
            .field("recognizer", &self.recognizer)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

fn stored_options(dc: &DialogContext<'_>) -> Result<PromptOptions, DialogError> {
    dc.get(DIALOG_OPTIONS)?.ok_or_else(|| {
        DialogError::InvalidArgument("prompt is running without options".to_owned())
    })
}

#[async_trait]
impl<R: Recognizer + 'static> Dialog for Prompt<R> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let options: PromptOptions = match options {
            Some(value) => serde_json::from_value(value)?,
            None => {
                return Err(DialogError::InvalidArgument(format!(
                    "prompt '{}' requires options",
                    self.id
                )));
            }
        };
        dc.set_value(ATTEMPT_COUNT, Value::from(0))?;
        dc.send_text(options.prompt);
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        if !dc.activity().is_message() {
            return Ok(DialogTurnResult::waiting());
        }

        let options = stored_options(dc)?;
        let attempt_count = dc.get::<u64>(ATTEMPT_COUNT)?.unwrap_or(0) + 1;
        dc.set_value(ATTEMPT_COUNT, Value::from(attempt_count))?;

        let recognized = self.recognizer.recognize(dc.activity())?;
        if let Some(value) = recognized
            && self.accepts(&value, attempt_count, &options)
        {
            return dc.end_dialog(Some(value)).await;
        }

        debug!(prompt = %self.id, attempt_count, "input rejected");
        if !dc.turn().responded() {
            dc.send_text(options.retry_text());
        }
        Ok(DialogTurnResult::waiting())
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.reprompt_dialog(dc).await?;
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(&self, dc: &mut DialogContext<'_>) -> Result<(), DialogError> {
        let options = stored_options(dc)?;
        dc.send_text(options.prompt);
        Ok(())
    }
}

impl DialogContext<'_> {
    /// Begins the prompt `dialog_id` with `options`.
    ///
    /// # Errors
    ///
    /// Returns `DialogError::InvalidArgument` if the prompt text is blank,
    /// plus everything [`DialogContext::begin_dialog`] returns.
    pub async fn prompt(
        &mut self,
        dialog_id: &str,
        options: PromptOptions,
    ) -> Result<DialogTurnResult, DialogError> {
        if options.prompt.trim().is_empty() {
            return Err(DialogError::InvalidArgument(format!(
                "prompt '{dialog_id}' needs prompt text"
            )));
        }
        let options = serde_json::to_value(options)?;
        self.begin_dialog(dialog_id, Some(options)).await
    }
}
