/// Slash command registry for the relay bot.
use crate::types::{CommandArg, CommandCategory, CommandDef, CommandScope};

fn arg(name: &str, description: &str, required: bool, choices: &[&str]) -> CommandArg {
    CommandArg {
        name: name.to_string(),
        description: description.to_string(),
        required,
        capture_remaining: false,
        choices: choices.iter().map(|s| s.to_string()).collect(),
    }
}

fn command(
    key: &str,
    description: &str,
    scope: CommandScope,
    category: CommandCategory,
    args: Vec<CommandArg>,
) -> CommandDef {
    CommandDef {
        key: key.into(),
        description: description.into(),
        scope,
        category,
        text_aliases: vec![format!("/{key}")],
        args,
    }
}

/// Build the full built-in command registry.
pub fn builtin_commands() -> Vec<CommandDef> {
    use CommandCategory::*;
    use CommandScope::*;

    vec![
        command(
            "start",
            "Open a shared link, or show the welcome message.",
            Everyone,
            General,
            vec![arg("code", "Code from a deep link", false, &[])],
        ),
        command("help", "Show available commands.", Everyone, General, vec![]),
        // Content
        command("list", "List every stored file, newest first.", Operator, Content, vec![]),
        CommandDef {
            text_aliases: vec!["/del".into(), "/delete".into()],
            ..command(
                "del",
                "Delete a stored file by code.",
                Operator,
                Content,
                vec![arg("code", "Code of the file to delete", true, &[])],
            )
        },
        command("stats", "File count, total downloads and the top 5.", Operator, Content, vec![]),
        // Access
        command(
            "gate",
            "Toggle the channel membership requirement.",
            Operator,
            Access,
            vec![arg("state", "Explicit state", false, &["on", "off"])],
        ),
        // Broadcast
        command(
            "broadcast",
            "Reply to a message with this to send it to every user.",
            Operator,
            Broadcast,
            vec![],
        ),
        command("cancel", "Stop the running broadcast.", Operator, Broadcast, vec![]),
        command("resume", "Resume an interrupted broadcast.", Operator, Broadcast, vec![]),
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Commands the sender is allowed to see.
    pub fn visible_to(&self, is_operator: bool) -> impl Iterator<Item = &CommandDef> {
        self.commands.iter().filter(move |c| is_operator || !c.operator_only())
    }

    /// Find a command by slash-text alias (e.g. "/del").
    pub fn find_by_alias(&self, alias: &str) -> Option<&CommandDef> {
        let lower = alias.to_lowercase();
        self.commands
            .iter()
            .find(|c| c.text_aliases.iter().any(|a| a.to_lowercase() == lower))
    }

    pub fn find_by_key(&self, key: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.key == key)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
