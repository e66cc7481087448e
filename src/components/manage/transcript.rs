//! Transcript rendering, archiving and search.
//!
//! A transcript is a static rendering of a channel history, written under
//! [`TRANSCRIPT_DIR`]. The filename carries the channel id and a timestamp
//! (`transcript_<channel>_<YYYYMMDD_HHMMSS>.<ext>`), which is all the search
//! has to go on: there is no index, every search walks the whole directory.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::StreamExt;
use regex::{Regex, RegexBuilder};
use serenity::client::Context;
use serenity::model::channel::GuildChannel;
use serenity::model::id::ChannelId;

use crate::{log_error, log_info, log_warn};

pub const TRANSCRIPT_DIR: &str = "transcripts";

const PREVIEW_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Text,
    Html,
}

impl TranscriptFormat {
    /// Map the optional command argument onto a format. HTML when absent.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(value) if value.eq_ignore_ascii_case("text") => TranscriptFormat::Text,
            _ => TranscriptFormat::Html,
        }
    }
    pub fn extension(self) -> &'static str {
        match self {
            TranscriptFormat::Text => "txt",
            TranscriptFormat::Html => "html",
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            TranscriptFormat::Text => "Text",
            TranscriptFormat::Html => "HTML",
        }
    }
    pub fn describe(self) -> &'static str {
        match self {
            TranscriptFormat::Text => "plain text",
            TranscriptFormat::Html => "HTML with enhanced styling",
        }
    }
}

pub struct Transcript {
    pub content: String,
    pub format: TranscriptFormat,
}

mod intern {
    use crate::components::utils;
    mod ser {
        pub use serenity::model::channel::Message;
    }

    pub struct TranscriptAttachment {
        pub filename: String,
        pub url: String,
    }

    pub struct TranscriptMessage {
        pub author: String,
        pub author_name: String,
        pub avatar: String,
        pub timestamp: i64,
        pub content: String,
        pub attachments: Vec<TranscriptAttachment>,
    }

    impl From<ser::Message> for TranscriptMessage {
        fn from(message: ser::Message) -> Self {
            Self {
                author: utils::user_fullname(&message.author),
                author_name: message.author.name.clone(),
                avatar: message.author.avatar_url()
                    .unwrap_or_else(|| "https://cdn.discordapp.com/embed/avatars/0.png".to_string()),
                timestamp: message.timestamp.unix_timestamp(),
                attachments: message.attachments.iter()
                    .map(|a| TranscriptAttachment { filename: a.filename.clone(), url: a.url.clone() })
                    .collect(),
                content: message.content,
            }
        }
    }
}

use intern::TranscriptMessage;

/// Fetch the full history of a channel, oldest first.
///
/// Unbounded on purpose: large channels cost what they cost. A missing read
/// permission yields an empty history rather than an error.
async fn fetch_messages(ctx: &Context, channel: &GuildChannel) -> Vec<TranscriptMessage> {
    let mut messages = Vec::new();
    let mut history = channel.id.messages_iter(ctx).boxed();
    while let Some(message) = history.next().await {
        match message {
            Ok(message) => messages.push(TranscriptMessage::from(message)),
            Err(e) => log_warn!("Error while fetching a message for the transcript: {}", e),
        }
    }
    messages.reverse();
    log_info!("Fetched {} messages from channel {}", messages.len(), channel.name);
    messages
}

/// Render the full history of a channel into a transcript document.
pub async fn generate(ctx: &Context, channel: &GuildChannel, format: TranscriptFormat) -> Transcript {
    let messages = fetch_messages(ctx, channel).await;
    let guild_name = channel.guild_id.name(ctx).unwrap_or_else(|| channel.guild_id.0.to_string());
    let content = match format {
        TranscriptFormat::Text => render_text(channel, &guild_name, &messages),
        TranscriptFormat::Html => render_html(channel, &guild_name, &messages),
    };
    Transcript { content, format }
}

fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

fn render_message(message: &TranscriptMessage) -> String {
    let attachments = if message.attachments.is_empty() {
        String::new()
    } else {
        let links = message.attachments.iter()
            .map(|a| format!("  - {}", a.url))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nAttachments:\n{}", links)
    };
    let content = if message.content.is_empty() { "[No text content]" } else { message.content.as_str() };
    format!("[{}] {}:\n{}{}\n", format_timestamp(message.timestamp), message.author, content, attachments)
}

fn render_text(channel: &GuildChannel, guild_name: &str, messages: &[TranscriptMessage]) -> String {
    let mut transcript = format!("# Transcript of #{}\n", channel.name);
    transcript.push_str(&format!("Generated on: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    transcript.push_str(&format!("Channel ID: {}\n", channel.id.0));
    transcript.push_str(&format!("Guild: {}\n\n", guild_name));
    transcript.push_str("---\n\n");
    transcript.push_str(&messages.iter().map(render_message).collect::<Vec<_>>().join("\n\n"));
    transcript
}

const HTML_STYLE: &str = "\
    body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 20px; color: #2e3338; background-color: #f9f9f9; line-height: 1.5; }\n\
    .transcript-container { max-width: 900px; margin: 0 auto; background: white; border-radius: 8px; box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1); overflow: hidden; }\n\
    .transcript-header { background-color: #5865f2; color: white; padding: 20px; border-bottom: 1px solid #4752c4; }\n\
    .transcript-header h1 { margin: 0; font-size: 24px; }\n\
    .transcript-header .ticket-info { font-size: 14px; margin-top: 5px; }\n\
    .transcript-body { padding: 10px 20px; }\n\
    .message { padding: 10px 0; border-bottom: 1px solid #e3e5e8; }\n\
    .message:nth-child(odd) { background-color: #f6f7f9; }\n\
    .message-info { display: flex; align-items: center; margin-bottom: 5px; }\n\
    .avatar { width: 40px; height: 40px; border-radius: 50%; margin-right: 10px; }\n\
    .username { font-weight: bold; color: #5865f2; }\n\
    .timestamp { font-size: 12px; color: #8e9297; margin-left: 10px; }\n\
    .content { padding-left: 50px; overflow-wrap: break-word; }\n\
    .attachments { margin-top: 5px; padding-left: 50px; }\n\
    .attachment { display: block; margin: 5px 0; }\n\
    .attachment a { color: #00b0f4; text-decoration: none; }\n\
    .attachment a:hover { text-decoration: underline; }\n";

fn render_html(channel: &GuildChannel, guild_name: &str, messages: &[TranscriptMessage]) -> String {
    let mut document = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Transcript of {name}</title>\n\
         <style id=\"transcript-css\">\n{style}</style>\n\
         </head>\n<body>\n\
         <div class=\"transcript-container\">\n\
         <div class=\"transcript-header\">\n\
         <h1>Transcript of #{name}</h1>\n\
         <div class=\"ticket-info\">\n\
         <p>Generated on: {generated}</p>\n\
         <p>Channel ID: {id}</p>\n\
         <p>Guild: {guild}</p>\n\
         </div>\n</div>\n\
         <div class=\"transcript-body\">\n",
        name = escape_html(&channel.name),
        style = HTML_STYLE,
        generated = Local::now().format("%Y-%m-%d %H:%M:%S"),
        id = channel.id.0,
        guild = escape_html(guild_name),
    );
    for message in messages {
        let content = if message.content.is_empty() {
            "[No text content]".to_string()
        } else {
            escape_html(&message.content).replace('\n', "<br>")
        };
        document.push_str(&format!(
            "<div class=\"message\">\n\
             <div class=\"message-info\">\n\
             <img src=\"{avatar}\" class=\"avatar\" alt=\"Avatar\">\n\
             <span class=\"username\">{username}</span>\n\
             <span class=\"timestamp\">{timestamp}</span>\n\
             </div>\n\
             <div class=\"content\">{content}</div>\n",
            avatar = message.avatar,
            username = escape_html(&message.author_name),
            timestamp = format_timestamp(message.timestamp),
            content = content,
        ));
        if !message.attachments.is_empty() {
            document.push_str("<div class=\"attachments\">");
            for attachment in &message.attachments {
                document.push_str(&format!(
                    "<div class=\"attachment\"><a href=\"{}\" target=\"_blank\">{}</a></div>",
                    attachment.url,
                    escape_html(&attachment.filename),
                ));
            }
            document.push_str("</div>\n");
        }
        document.push_str("</div>\n");
    }
    document.push_str("</div>\n</div>\n</body>\n</html>\n");
    document
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Write a transcript under [`TRANSCRIPT_DIR`]. Returns the file path, or
/// `None` when nothing was produced: callers skip the upload and say so.
pub async fn save(transcript: &Transcript, channel_id: ChannelId) -> Option<PathBuf> {
    save_in(Path::new(TRANSCRIPT_DIR), transcript, channel_id.0).await
}

async fn save_in(directory: &Path, transcript: &Transcript, channel_id: u64) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(directory) {
        log_error!("Error while creating the transcript directory: {}", e);
        return None;
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = directory.join(format!("transcript_{}_{}.{}", channel_id, stamp, transcript.format.extension()));
    match async_std::fs::write(&path, &transcript.content).await {
        Ok(_) => {
            log_info!("Transcript saved to {}", path.display());
            Some(path)
        }
        Err(e) => {
            log_error!("Error while saving the transcript: {}", e);
            None
        }
    }
}

#[derive(Debug)]
pub struct SearchResult {
    pub filename: String,
    pub path: PathBuf,
    pub date: Option<NaiveDateTime>,
    pub channel_id: Option<u64>,
    pub preview: String,
}

/// Parse the `YYYYMMDD_HHMMSS` stamp out of a transcript filename.
pub fn parse_filename_date(filename: &str) -> Option<NaiveDateTime> {
    let stem = filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename);
    let mut parts = stem.rsplit('_');
    let time = parts.next()?;
    let date = parts.next()?;
    NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), "%Y%m%d_%H%M%S").ok()
}

/// Walk the archive directory and collect up to `limit` matching transcripts,
/// newest first.
///
/// A filename whose date cannot be parsed is never excluded by the date
/// filters, it just escapes them. Styled (`.html`) documents are reachable
/// through the content query only; the author filter applies to plain-text
/// documents and lets styled ones through.
pub fn search(
    directory: &Path,
    query: Option<&str>,
    user: Option<&str>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    limit: usize,
) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            log_error!("Transcript directory {} cannot be read: {}", directory.display(), e);
            return results;
        }
    };
    let from_date = date_from.and_then(|d| d.and_hms_opt(0, 0, 0));
    let to_date = date_to.and_then(|d| d.and_hms_opt(23, 59, 59));
    let author_patterns = user.and_then(build_author_patterns);

    let mut filenames = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".txt") || name.ends_with(".html"))
        .collect::<Vec<_>>();
    filenames.sort();

    for filename in filenames {
        let path = directory.join(&filename);
        let date = parse_filename_date(&filename);
        if let Some(date) = date {
            if let Some(from) = from_date {
                if date < from {
                    continue;
                }
            }
            if let Some(to) = to_date {
                if date > to {
                    continue;
                }
            }
        }
        let is_html = filename.ends_with(".html");
        // Styled documents only support the content query.
        if is_html && query.is_none() {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log_error!("Error while reading {}: {}", filename, e);
                continue;
            }
        };
        if let Some(query) = query {
            if !content.to_lowercase().contains(&query.to_lowercase()) {
                continue;
            }
        }
        if let Some((stamped, bare)) = &author_patterns {
            if !is_html && !stamped.is_match(&content) && !bare.is_match(&content) {
                continue;
            }
        }
        let channel_id = filename.split('_').nth(1).and_then(|part| part.parse::<u64>().ok());
        results.push(SearchResult {
            filename,
            path,
            date,
            channel_id,
            preview: preview(&content),
        });
        if results.len() >= limit {
            break;
        }
    }
    results.sort_by(|a, b| b.date.cmp(&a.date));
    results.truncate(limit);
    results
}

/// `[YYYY-MM-DD HH:MM:SS] username...:` and a bare `username...:` fallback.
fn build_author_patterns(user: &str) -> Option<(Regex, Regex)> {
    let stamped = RegexBuilder::new(&format!(
        r"\[\d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}}:\d{{2}}\] {}[^:]*:",
        regex::escape(user)
    )).case_insensitive(true).build().ok()?;
    let bare = RegexBuilder::new(&format!(r"{}[^:]*:", regex::escape(user)))
        .case_insensitive(true).build().ok()?;
    Some((stamped, bare))
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_LENGTH {
        format!("{}...", content.chars().take(PREVIEW_LENGTH).collect::<String>())
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ticketio-transcripts-{}-{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn populate(dir: &Path) {
        std::fs::write(
            dir.join("transcript_111_20240101_120000.txt"),
            "# Transcript of #ticket-0001\n---\n\n[2024-01-01 12:00:00] alice#0001:\nhello world\n",
        ).unwrap();
        std::fs::write(
            dir.join("transcript_222_20240315_090000.txt"),
            "# Transcript of #ticket-0002\n---\n\n[2024-03-15 09:00:00] bob#0002:\npayment sorted\n",
        ).unwrap();
        std::fs::write(
            dir.join("transcript_333_20240101_130000.html"),
            "<html><body><span class=\"username\">alice</span> hello styled</body></html>",
        ).unwrap();
        std::fs::write(
            dir.join("notes.txt"),
            "loose notes without a stamp\n",
        ).unwrap();
    }

    #[test]
    fn filename_dates() {
        let date = parse_filename_date("transcript_111_20240101_120000.txt").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap());
        assert!(parse_filename_date("notes.txt").is_none());
        assert!(parse_filename_date("transcript_111_garbage_stamp.txt").is_none());
    }

    #[test]
    fn message_rendering() {
        let message = TranscriptMessage {
            author: "alice#0001".to_string(),
            author_name: "alice".to_string(),
            avatar: String::new(),
            timestamp: 1704110400,
            content: String::new(),
            attachments: vec![intern::TranscriptAttachment {
                filename: "proof.png".to_string(),
                url: "https://cdn.example/proof.png".to_string(),
            }],
        };
        let rendered = render_message(&message);
        assert!(rendered.starts_with("[2024-01-01 12:00:00] alice#0001:\n"));
        assert!(rendered.contains("[No text content]"));
        assert!(rendered.contains("Attachments:\n  - https://cdn.example/proof.png"));
    }

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#x27;");
    }

    #[test]
    fn date_boundary_is_inclusive_per_day() {
        let dir = fixture_dir("boundary");
        populate(&dir);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let results = search(&dir, None, None, Some(day), Some(day), 100);
        // The matching text transcript plus the stampless file, which escapes
        // the date filter; the styled one is out because there is no query.
        let names = results.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["transcript_111_20240101_120000.txt", "notes.txt"]);
    }

    #[test]
    fn query_is_case_insensitive_and_reaches_styled_documents() {
        let dir = fixture_dir("query");
        populate(&dir);
        let results = search(&dir, Some("HELLO"), None, None, None, 100);
        let names = results.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert!(names.contains(&"transcript_111_20240101_120000.txt"));
        assert!(names.contains(&"transcript_333_20240101_130000.html"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn author_filter_skips_styled_documents() {
        let dir = fixture_dir("author");
        populate(&dir);
        let results = search(&dir, None, Some("alice"), None, None, 100);
        let names = results.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        // Only the plain-text transcript; the styled one is skipped without a query.
        assert_eq!(names, vec!["transcript_111_20240101_120000.txt"]);
        // With a query, the styled document comes back even though the author
        // pattern cannot match its markup.
        let results = search(&dir, Some("hello"), Some("alice"), None, None, 100);
        let names = results.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert!(names.contains(&"transcript_333_20240101_130000.html"));
    }

    #[test]
    fn results_are_sorted_newest_first_and_capped() {
        let dir = fixture_dir("sort");
        populate(&dir);
        let results = search(&dir, None, None, None, None, 100);
        let names = results.iter().map(|r| r.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![
            "transcript_222_20240315_090000.txt",
            "transcript_111_20240101_120000.txt",
            "notes.txt",
        ]);
        assert_eq!(search(&dir, None, None, None, None, 1).len(), 1);
    }

    #[test]
    fn channel_id_comes_from_the_filename() {
        let dir = fixture_dir("channel");
        populate(&dir);
        let results = search(&dir, Some("hello world"), None, None, None, 100);
        assert_eq!(results[0].channel_id, Some(111));
    }

    #[tokio::test]
    async fn save_stamps_the_filename() {
        let dir = fixture_dir("save");
        let transcript = Transcript { content: "content".to_string(), format: TranscriptFormat::Text };
        let path = save_in(&dir, &transcript, 424242).await.unwrap();
        let filename = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(filename.starts_with("transcript_424242_"));
        assert!(filename.ends_with(".txt"));
        // The stamp parses back, so the search date filters can use it.
        assert!(parse_filename_date(&filename).is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }
}
