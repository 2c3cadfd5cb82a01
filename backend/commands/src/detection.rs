/// Slash command detection: identify /commands in inbound text.
use crate::registry::CommandRegistry;
use crate::types::{CommandArg, CommandInvocation};

/// Detect a slash command at the start of `text`.
///
/// Group-style `/cmd@BotName` mentions are accepted. Returns `None` for plain
/// text and for slash words that are not registered.
pub fn detect_command(text: &str, registry: &CommandRegistry) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (alias_part, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(a, r)| (a, r.trim()))
        .unwrap_or((trimmed, ""));
    let alias = alias_part.split_once('@').map(|(a, _)| a).unwrap_or(alias_part);

    let def = registry.find_by_alias(alias)?;
    let args = parse_args(rest, &def.args);

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: alias.to_string(),
        args,
        raw_args: rest.to_string(),
    })
}

/// Whether `text` looks like a slash command at all, known or not.
pub fn looks_like_command(text: &str) -> bool {
    text.trim_start()
        .strip_prefix('/')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

fn parse_args(text: &str, arg_defs: &[CommandArg]) -> Vec<String> {
    if text.is_empty() || arg_defs.is_empty() {
        return vec![];
    }

    let mut result = Vec::new();
    let mut remaining = text.trim();

    for (i, def) in arg_defs.iter().enumerate() {
        if remaining.is_empty() {
            break;
        }
        if def.capture_remaining || i == arg_defs.len() - 1 {
            result.push(remaining.to_string());
            break;
        }
        let (token, rest) = remaining
            .split_once(char::is_whitespace)
            .map(|(t, r)| (t, r.trim()))
            .unwrap_or((remaining, ""));
        result.push(token.to_string());
        remaining = rest;
    }
    result
}
