//! Reply texts (Telegram HTML) and `/list` pagination.

use linkdrop_core::{Button, Code, ContentReference, OutboundText, RelayError};
use linkdrop_relay::{BroadcastReport, LinkBuilder, RegistryStats, Resolution};

/// Callback data prefix of the gate's "check again" button.
pub const RECHECK_PREFIX: &str = "recheck:";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn recheck_data(code: &Code) -> String {
    format!("{RECHECK_PREFIX}{code}")
}

/// Public join link for a gate target, when one can be derived.
fn join_url(target: &str) -> Option<String> {
    target
        .strip_prefix('@')
        .filter(|name| !name.is_empty())
        .map(|name| format!("https://t.me/{name}"))
}

// ----- Greetings -----

pub fn operator_greeting(files: usize) -> String {
    format!(
        "👑 <b>You own this bot</b>\n\n\
         📂 Files stored: <b>{files}</b>\n\n\
         ▸ Send any file to get a shareable link\n\n\
         Send /help for the command list."
    )
}

pub fn recipient_greeting() -> String {
    "👋 Hi! I hand out shared files.\nOpen a link from the sender to get your file.".to_string()
}

pub fn fallback_hint(is_operator: bool) -> String {
    if is_operator {
        "📤 Send a file to get a link.\n/list shows stored files.".to_string()
    } else {
        "Open a link from the sender to get your file.".to_string()
    }
}

// ----- Uploads -----

pub fn upload_reply(reference: &ContentReference, links: &LinkBuilder) -> String {
    let link = links.link(&reference.code);
    format!(
        "✅ <b>File saved!</b>\n\n\
         📁 <b>{name}</b>\n\
         🔑 Code: <code>{code}</code>\n\n\
         🔗 Link (tap to copy):\n<code>{link}</code>\n\n\
         Share this link with anyone!",
        name = escape_html(&reference.display_name),
        code = reference.code,
    )
}

pub fn upload_refused() -> String {
    "⛔ Only the owner can add files.".to_string()
}

// ----- Resolution -----

/// Reply for a finished resolution; `None` when the delivered file is the
/// whole answer.
pub fn resolution_reply(resolution: &Resolution) -> Option<OutboundText> {
    match resolution {
        Resolution::Resolved { .. } => None,
        Resolution::Denied { code, target } => {
            let mut reply = OutboundText::new(format!(
                "🔒 This file is available to members of <b>{}</b>.\n\n\
                 Join, then tap <b>Check again</b>.",
                escape_html(target)
            ));
            if let Some(url) = join_url(target) {
                reply = reply.with_button(Button::Url { label: "📢 Join".into(), url });
            }
            Some(reply.with_button(Button::Callback {
                label: "🔄 Check again".into(),
                data: recheck_data(code),
            }))
        }
        Resolution::NotFound { .. } => {
            Some(OutboundText::new("❌ File not found or the link has expired."))
        }
        Resolution::Unsupported { .. } => Some(OutboundText::new("❌ Unknown file type.")),
        Resolution::DeliveryFailed { .. } => Some(OutboundText::new("❌ Could not send the file.")),
    }
}

/// User-facing text for an error that ended an inbound event.
pub fn error_reply(err: &RelayError) -> String {
    match err {
        RelayError::NotFound(code) => format!("❌ File not found: <code>{code}</code>"),
        RelayError::Unauthorized(_) => "⛔ This command is only available to the owner.".into(),
        RelayError::InvalidCode(e) => format!("❌ Invalid code: {}", escape_html(&e.to_string())),
        RelayError::BroadcastInProgress => {
            "⏳ A broadcast is already running. Use /cancel to stop it.".into()
        }
        RelayError::NothingToResume => "ℹ️ There is no interrupted broadcast to resume.".into(),
        RelayError::StorageError(_) | RelayError::Other(_) => {
            "⚠️ Something went wrong, please try again later.".into()
        }
    }
}

// ----- Operator views -----

pub fn list_entry(reference: &ContentReference, links: &LinkBuilder) -> String {
    format!(
        "📁 <b>{name}</b>  📥 {downloads}\n    Code: <code>{code}</code>\n    {link}",
        name = escape_html(&reference.display_name),
        downloads = reference.download_count,
        code = reference.code,
        link = links.link(&reference.code),
    )
}

/// Join entries with blank lines into pages of at most `budget` characters.
///
/// Pages break between entries so HTML tags are never split. A single entry
/// longer than the budget is cut at character boundaries.
pub fn paginate(entries: &[String], budget: usize) -> Vec<String> {
    const SEPARATOR: &str = "\n\n";
    let budget = budget.max(1);
    let mut pages = Vec::new();
    let mut page = String::new();
    let mut page_chars = 0usize;

    for entry in entries {
        let entry_chars = entry.chars().count();
        let needed = if page.is_empty() { entry_chars } else { entry_chars + SEPARATOR.len() };

        if page_chars + needed <= budget {
            if !page.is_empty() {
                page.push_str(SEPARATOR);
            }
            page.push_str(entry);
            page_chars += needed;
            continue;
        }

        if !page.is_empty() {
            pages.push(std::mem::take(&mut page));
            page_chars = 0;
        }
        if entry_chars <= budget {
            page.push_str(entry);
            page_chars = entry_chars;
        } else {
            let chars: Vec<char> = entry.chars().collect();
            pages.extend(chars.chunks(budget).map(|chunk| chunk.iter().collect::<String>()));
        }
    }
    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

pub fn stats_text(stats: &RegistryStats) -> String {
    let mut text = format!(
        "📊 <b>Statistics</b>\n\n📁 Files: <b>{}</b>\n📥 Total downloads: <b>{}</b>",
        stats.files, stats.downloads
    );
    if !stats.top.is_empty() {
        text.push_str("\n\n🔝 <b>Top 5:</b>\n");
        for reference in &stats.top {
            text.push_str(&format!(
                "  📁 {} ({}): {} downloads\n",
                escape_html(&reference.display_name),
                reference.code,
                reference.download_count
            ));
        }
    }
    text
}

pub fn deleted_text(reference: &ContentReference) -> String {
    format!(
        "🗑 Deleted: <b>{}</b> (<code>{}</code>)",
        escape_html(&reference.display_name),
        reference.code
    )
}

pub fn gate_text(required: bool, target: Option<&str>) -> String {
    match (required, target) {
        (true, Some(target)) => format!(
            "🔒 Gate <b>on</b>: recipients must join <b>{}</b>.",
            escape_html(target)
        ),
        (true, None) => "🔒 Gate <b>on</b>, but no gate channel is configured; everyone is let through.".into(),
        (false, _) => "🔓 Gate <b>off</b>: links work for everyone.".into(),
    }
}

pub fn report_text(report: &BroadcastReport) -> String {
    escape_html(&report.render())
}
