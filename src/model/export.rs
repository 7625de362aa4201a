// convo_kit — Sticky-scroll and streaming reveal engines for chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Static transcript export: plain text for emails/logs, HTML for archives.

use super::group::group_messages;
use super::types::{ChatMessage, ContentPart, ToolCall};
use pulldown_cmark::{Options, Parser, html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Language {
    #[default]
    #[value(name = "en")]
    English,
    #[value(name = "se")]
    Swedish,
}

impl Language {
    fn user(self) -> &'static str {
        match self {
            Self::English => "User",
            Self::Swedish => "Användare",
        }
    }

    fn assistant(self) -> &'static str {
        match self {
            Self::English => "Assistant",
            Self::Swedish => "Assistent",
        }
    }

    fn attached_image(self) -> &'static str {
        match self {
            Self::English => "User attached an image",
            Self::Swedish => "Användaren bifogade en bild",
        }
    }

    fn attached_file(self) -> &'static str {
        match self {
            Self::English => "User attached a file",
            Self::Swedish => "Användaren bifogade en fil",
        }
    }

    fn tool_called(self, name: &str) -> String {
        match self {
            Self::English => format!("<tool {name} was called>"),
            Self::Swedish => format!("<verktyg {name} användes>"),
        }
    }
}

/// Hooks for customizing labels per message. `data` is the metadata attached
/// to the first source message of the turn. Defaults keep the stock label.
pub trait TranscriptLabels<D> {
    fn user(&self, label: &str, _data: &D) -> String {
        label.to_owned()
    }
    fn attach_image(&self, label: &str, _data: &D) -> String {
        label.to_owned()
    }
    fn attach_file(&self, label: &str, _data: &D) -> String {
        label.to_owned()
    }
    fn assistant(&self, label: &str, _data: &D) -> String {
        label.to_owned()
    }
    /// Text for a tool call; an empty string hides the call.
    fn tool(&self, call: &ToolCall, _data: &D, language: Language) -> String {
        language.tool_called(&call.function.name)
    }
}

/// Stock labels.
pub struct DefaultLabels;

impl<D> TranscriptLabels<D> for DefaultLabels {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub html: String,
}

/// Render a transcript (grouped first) as plain text and HTML.
///
/// System messages and tool responses are omitted.
pub fn render_transcript<D, L>(entries: &[(D, ChatMessage)], language: Language, labels: &L) -> Transcript
where
    L: TranscriptLabels<D>,
{
    let messages: Vec<ChatMessage> = entries.iter().map(|(_, m)| m.clone()).collect();
    let mut text_parts: Vec<String> = Vec::new();
    let mut html_out = String::new();

    for turn in group_messages(&messages) {
        let data = &entries[turn.key()].0;
        match &turn.message {
            ChatMessage::User { content } => {
                for part in content {
                    render_user_part(part, data, language, labels, &mut text_parts, &mut html_out);
                }
            }
            ChatMessage::Assistant { content } => {
                let label = labels.assistant(language.assistant(), data);
                text_parts.push(format!("{label}:\n{content}"));
                html_out.push_str("<div style=\"max-width: 50em\">");
                html_out.push_str(&format!(
                    "<p style=\"white-space: pre-wrap; overflow-wrap: anywhere\"><b>{}:</b><br/></p>",
                    escape_html(&label)
                ));
                html_out.push_str(&markdown_to_html(content));
                html_out.push_str("</div>");
            }
            ChatMessage::ToolCall { tool_call } => {
                let line = labels.tool(tool_call, data, language);
                if !line.is_empty() {
                    html_out.push_str(&format!("<p><i>{}</i></p>", escape_html(&line)));
                    text_parts.push(line);
                }
            }
            ChatMessage::System { .. } | ChatMessage::ToolResponse(_) => {}
        }
    }

    Transcript { text: text_parts.join("\n\n"), html: html_out }
}

fn render_user_part<D, L: TranscriptLabels<D>>(
    part: &ContentPart,
    data: &D,
    language: Language,
    labels: &L,
    text_parts: &mut Vec<String>,
    html_out: &mut String,
) {
    match part {
        ContentPart::Text { content } => {
            let label = labels.user(language.user(), data);
            text_parts.push(format!("{label}:\n{content}"));
            html_out.push_str(&format!(
                "<p style=\"white-space: pre-wrap; overflow-wrap: anywhere; max-width: 50em\"><b>{}:</b><br/>{}</p>",
                escape_html(&label),
                escape_html(content)
            ));
        }
        ContentPart::Image { mime_type, base64 } => {
            let label = labels.attach_image(language.attached_image(), data);
            html_out.push_str(&format!(
                "<p><b>{}:</b></p><img src=\"data:{};base64,{}\" style=\"max-width: 20em; max-height: 20em; object-fit: contain\"/>",
                escape_html(&label),
                escape_html(mime_type),
                escape_html(base64)
            ));
            text_parts.push(label);
        }
        ContentPart::File { .. } => {
            let label = labels.attach_file(language.attached_file(), data);
            html_out.push_str(&format!("<p><b>{}</b></p>", escape_html(&label)));
            text_parts.push(label);
        }
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ToolResponse;
    use pretty_assertions::assert_eq;

    fn entries(messages: Vec<ChatMessage>) -> Vec<((), ChatMessage)> {
        messages.into_iter().map(|m| ((), m)).collect()
    }

    #[test]
    fn text_export_groups_and_labels() {
        let transcript = render_transcript(
            &entries(vec![
                ChatMessage::system("hidden"),
                ChatMessage::user_text("Hi"),
                ChatMessage::assistant("Hel"),
                ChatMessage::assistant("lo"),
                ChatMessage::ToolCall { tool_call: ToolCall::new("tc-1", "search") },
                ChatMessage::ToolResponse(ToolResponse {
                    name: "search".to_owned(),
                    content: serde_json::Value::Null,
                    additional_parts: Vec::new(),
                    tool_call_id: "tc-1".to_owned(),
                }),
            ]),
            Language::English,
            &DefaultLabels,
        );
        assert_eq!(
            transcript.text,
            "User:\nHi\n\nAssistant:\nHello\n\n<tool search was called>"
        );
    }

    #[test]
    fn swedish_labels() {
        let transcript = render_transcript(
            &entries(vec![ChatMessage::User {
                content: vec![
                    ContentPart::Image { mime_type: "image/png".to_owned(), base64: "AA".to_owned() },
                    ContentPart::File { base64: "BB".to_owned() },
                ],
            }]),
            Language::Swedish,
            &DefaultLabels,
        );
        assert_eq!(
            transcript.text,
            "Användaren bifogade en bild\n\nAnvändaren bifogade en fil"
        );
        assert!(transcript.html.contains("data:image/png;base64,AA"));
    }

    #[test]
    fn html_renders_assistant_markdown_and_escapes_user_text() {
        let transcript = render_transcript(
            &entries(vec![
                ChatMessage::user_text("<script>alert(1)</script>"),
                ChatMessage::assistant("**bold** [docs](https://example.com)"),
            ]),
            Language::English,
            &DefaultLabels,
        );
        assert!(transcript.html.contains("&lt;script&gt;"));
        assert!(!transcript.html.contains("<script>"));
        assert!(transcript.html.contains("<strong>bold</strong>"));
        assert!(transcript.html.contains("<a href=\"https://example.com\">docs</a>"));
    }

    struct NamedLabels;

    impl TranscriptLabels<&'static str> for NamedLabels {
        fn user(&self, _label: &str, data: &&'static str) -> String {
            (*data).to_owned()
        }
        fn tool(&self, _call: &ToolCall, _data: &&'static str, _language: Language) -> String {
            String::new()
        }
    }

    #[test]
    fn label_hooks_receive_message_data() {
        let transcript = render_transcript(
            &[
                ("Ada", ChatMessage::user_text("question")),
                ("Ada", ChatMessage::ToolCall { tool_call: ToolCall::new("tc-1", "search") }),
            ],
            Language::English,
            &NamedLabels,
        );
        assert_eq!(transcript.text, "Ada:\nquestion");
    }
}
