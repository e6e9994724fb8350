use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Infrastructure command the workflow ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Status,
    Destroy,
    ConfirmDestroy,
}

impl CommandKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Status => "status",
            CommandKind::Destroy => "destroy",
            CommandKind::ConfirmDestroy => "confirm_destroy",
        }
    }

    /// Strict parse used for chat commands (`/status`, `status`, `/status@bot`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('/');
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "status" => Some(CommandKind::Status),
            "destroy" => Some(CommandKind::Destroy),
            "confirm_destroy" | "confirm-destroy" => Some(CommandKind::ConfirmDestroy),
            _ => None,
        }
    }

    /// Lenient parse used for workflow callbacks: unknown kinds are treated as `status`.
    #[must_use]
    pub fn parse_or_status(name: &str) -> Self {
        Self::parse(name).unwrap_or(CommandKind::Status)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete output blob reported back by the automation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub text: String,
    pub command_kind: CommandKind,
    pub origin_chat_id: String,
}

impl RawOutput {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        command_kind: CommandKind,
        origin_chat_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            command_kind,
            origin_chat_id: origin_chat_id.into(),
        }
    }

    /// Length in characters, the unit every threshold is expressed in.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    ResourceList,
    Error,
    Warning,
    Other,
}

/// Contiguous, semantically delimited slice of a raw output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub key: String,
    pub body: String,
}

impl Section {
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.body.lines().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    Create,
    Update,
    Destroy,
    NoOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Partial,
    Failed,
    #[default]
    Unknown,
}

/// Structured facts pulled out of normalized sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedSummary {
    pub resource_counts: BTreeMap<ResourceAction, usize>,
    pub resource_types: BTreeMap<String, usize>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub completion_status: CompletionStatus,
}

impl ExtractedSummary {
    /// Count for one action; absent actions count as zero.
    #[must_use]
    pub fn count(&self, action: ResourceAction) -> usize {
        self.resource_counts.get(&action).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_resources(&self) -> usize {
        self.resource_counts.values().sum()
    }
}

/// Markdown dialect understood by the chat surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    #[default]
    Markdown,
    MarkdownV2,
    Plain,
}

impl MessageFormat {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "markdown" => Some(MessageFormat::Markdown),
            "markdownv2" | "markdown_v2" => Some(MessageFormat::MarkdownV2),
            "plain" | "text" | "none" => Some(MessageFormat::Plain),
            _ => None,
        }
    }

    /// Value for Telegram's `parse_mode`; plain text sends none.
    #[must_use]
    pub fn parse_mode(self) -> Option<&'static str> {
        match self {
            MessageFormat::Markdown => Some("Markdown"),
            MessageFormat::MarkdownV2 => Some("MarkdownV2"),
            MessageFormat::Plain => None,
        }
    }
}

/// Final chat payload for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub truncated: bool,
    pub format: MessageFormat,
}

/// Command typed by a user in the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommandEvent {
    pub chat_id: String,
    pub command: String,
}

/// Asynchronous result reported by the automation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCallbackEvent {
    pub command_kind: CommandKind,
    pub raw_output: String,
    pub chat_id: String,
    pub correlation_id: String,
}

impl WorkflowCallbackEvent {
    #[must_use]
    pub fn into_raw_output(self) -> RawOutput {
        RawOutput::new(self.raw_output, self.command_kind, self.chat_id)
    }
}

/// Closed set of inbound events, validated at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    ChatCommand(ChatCommandEvent),
    WorkflowCallback(WorkflowCallbackEvent),
    /// Update that carries no command; acknowledged so it is not redelivered.
    Ignored(String),
}
