/// Slash command types.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Who may invoke a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    /// Any recipient.
    Everyone,
    /// Only the configured operator.
    Operator,
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    General,
    Content,
    Access,
    Broadcast,
}

impl CommandCategory {
    pub fn title(&self) -> &'static str {
        match self {
            CommandCategory::General => "General",
            CommandCategory::Content => "Files",
            CommandCategory::Access => "Access",
            CommandCategory::Broadcast => "Broadcast",
        }
    }
}

// ---------------------------------------------------------------------------
// Arg
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// If true, consumes all remaining text.
    pub capture_remaining: bool,
    pub choices: Vec<String>,
}

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key (e.g. "start", "del").
    pub key: String,
    pub description: String,
    pub scope: CommandScope,
    pub category: CommandCategory,
    /// Slash aliases, each starting with '/'.
    pub text_aliases: Vec<String>,
    pub args: Vec<CommandArg>,
}

impl CommandDef {
    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.text_aliases.first().map(|s| s.as_str()).unwrap_or(&self.key)
    }

    /// `/del <code>` style usage line.
    pub fn usage(&self) -> String {
        let mut usage = self.primary_alias().to_string();
        for arg in &self.args {
            if !arg.choices.is_empty() {
                usage.push_str(&format!(" [{}]", arg.choices.join("|")));
            } else if arg.required {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage
    }

    pub fn operator_only(&self) -> bool {
        self.scope == CommandScope::Operator
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected and parsed slash-command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    pub raw_alias: String,
    /// Positional arguments parsed from remaining text.
    pub args: Vec<String>,
    /// Full remaining text after the command name.
    pub raw_args: String,
}

impl CommandInvocation {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }
}
