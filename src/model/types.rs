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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on tool names, argument keys and correlation ids.
pub const MAX_NAME_LEN: usize = 200;

/// One entry of a chat transcript, tagged by `role` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: Vec<ContentPart>,
    },
    /// Assistant text. Streamed fragments arrive as separate messages and are
    /// merged by the grouper.
    Assistant {
        content: String,
    },
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    ToolResponse(ToolResponse),
}

/// Role discriminant, for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
    ToolCall,
    ToolResponse,
}

impl ChatMessage {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant { content: text.into() }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::User { content: vec![ContentPart::Text { content: text.into() }] }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::System { content: text.into() }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolCall { .. } => Role::ToolCall,
            Self::ToolResponse(_) => Role::ToolResponse,
        }
    }

    /// Assistant text, if this is an assistant message.
    #[must_use]
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            Self::Assistant { content } => Some(content),
            _ => None,
        }
    }
}

/// A piece of user-supplied content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        content: String,
    },
    Image {
        #[serde(rename = "mimeType")]
        mime_type: String,
        base64: String,
    },
    File {
        base64: String,
    },
}

/// Always `"function"` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionTag {
    #[default]
    #[serde(rename = "function")]
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    String(String),
    Number(f64),
}

impl ArgumentValue {
    fn param_type(&self) -> ParamType {
        match self {
            Self::String(_) => ParamType::String,
            Self::Number(_) => ParamType::Number,
        }
    }
}

impl std::fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgumentValue>,
}

/// A structured function invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "type", default)]
    pub kind: FunctionTag,
    pub function: FunctionCall,
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: FunctionTag::Function,
            function: FunctionCall { name: name.into(), arguments: BTreeMap::new() },
            tool_call_id: id.into(),
        }
    }

    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: ArgumentValue) -> Self {
        self.function.arguments.insert(key.into(), value);
        self
    }
}

/// Result of running a tool, correlated to its call by `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub name: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub additional_parts: Vec<ContentPart>,
    pub tool_call_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
}

/// Always `"object"` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectTag {
    #[default]
    #[serde(rename = "object")]
    Object,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(rename = "type", default)]
    pub kind: ObjectTag,
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Parameters,
}

/// A function the model is allowed to call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default)]
    pub kind: FunctionTag,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: FunctionTag::Function,
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters: Parameters::default(),
            },
        }
    }

    #[must_use]
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.function
            .parameters
            .properties
            .insert(name.into(), ParamSpec { param_type, description: description.into() });
        self
    }
}

/// Check a model-emitted tool call against the declared definitions.
///
/// Returns a sanitized copy holding only the declared arguments, or `None` if
/// the function is unknown, an argument is missing or has the wrong type, or
/// an identifier is over [`MAX_NAME_LEN`]. `None` is an ordinary outcome; the
/// caller answers the user with a fallback message.
pub fn validate_tool_call(call: &ToolCall, definitions: &[ToolDefinition]) -> Option<ToolCall> {
    if call.function.name.chars().count() > MAX_NAME_LEN
        || call.tool_call_id.chars().count() > MAX_NAME_LEN
        || call.function.arguments.keys().any(|k| k.chars().count() > MAX_NAME_LEN)
    {
        return None;
    }

    let definition = definitions.iter().find(|d| d.function.name == call.function.name)?;

    let mut arguments = BTreeMap::new();
    for (key, spec) in &definition.function.parameters.properties {
        let value = call.function.arguments.get(key)?;
        if value.param_type() != spec.param_type {
            return None;
        }
        arguments.insert(key.clone(), value.clone());
    }

    Some(ToolCall {
        kind: FunctionTag::Function,
        function: FunctionCall { name: definition.function.name.clone(), arguments },
        tool_call_id: call.tool_call_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::new("get_weather", "Look up the weather")
            .param("city", ParamType::String, "City name")
            .param("days", ParamType::Number, "Forecast length")
    }

    #[test]
    fn deserializes_every_role() {
        let raw = json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": [
                {"type": "text", "content": "hi"},
                {"type": "image", "mimeType": "image/png", "base64": "AAAA"},
                {"type": "file", "base64": "BBBB"}
            ]},
            {"role": "assistant", "content": "hello"},
            {"role": "toolCall", "toolCall": {
                "type": "function",
                "function": {"name": "get_weather", "arguments": {"city": "Oslo", "days": 3}},
                "toolCallId": "tc-1"
            }},
            {"role": "toolResponse", "name": "get_weather", "content": {"temp": 4},
             "additionalParts": [], "toolCallId": "tc-1"}
        ]);
        let messages: Vec<ChatMessage> = serde_json::from_value(raw).unwrap();
        let roles: Vec<Role> = messages.iter().map(ChatMessage::role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::ToolCall, Role::ToolResponse]
        );
        let ChatMessage::ToolCall { tool_call } = &messages[3] else {
            panic!("expected tool call");
        };
        assert_eq!(tool_call.function.arguments["days"], ArgumentValue::Number(3.0));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let raw = json!({"role": "narrator", "content": "once upon a time"});
        assert!(serde_json::from_value::<ChatMessage>(raw).is_err());
    }

    #[test]
    fn unknown_content_part_is_rejected() {
        let raw = json!({"role": "user", "content": [{"type": "video", "base64": "AA"}]});
        assert!(serde_json::from_value::<ChatMessage>(raw).is_err());
    }

    #[test]
    fn serializes_tool_call_with_wire_names() {
        let msg = ChatMessage::ToolCall {
            tool_call: ToolCall::new("tc-9", "get_weather")
                .arg("city", ArgumentValue::String("Rome".to_owned())),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "toolCall",
                "toolCall": {
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": {"city": "Rome"}},
                    "toolCallId": "tc-9"
                }
            })
        );
    }

    #[test]
    fn validate_accepts_and_strips_undeclared_arguments() {
        let call = ToolCall::new("tc-1", "get_weather")
            .arg("city", ArgumentValue::String("Oslo".to_owned()))
            .arg("days", ArgumentValue::Number(2.0))
            .arg("units", ArgumentValue::String("metric".to_owned()));
        let valid = validate_tool_call(&call, &[weather_tool()]).unwrap();
        assert_eq!(valid.function.arguments.len(), 2);
        assert!(!valid.function.arguments.contains_key("units"));
        assert_eq!(valid.tool_call_id, "tc-1");
    }

    #[test]
    fn validate_rejects_unknown_function() {
        let call = ToolCall::new("tc-1", "get_time");
        assert!(validate_tool_call(&call, &[weather_tool()]).is_none());
    }

    #[test]
    fn validate_rejects_missing_argument() {
        let call = ToolCall::new("tc-1", "get_weather")
            .arg("city", ArgumentValue::String("Oslo".to_owned()));
        assert!(validate_tool_call(&call, &[weather_tool()]).is_none());
    }

    #[test]
    fn validate_rejects_wrong_argument_type() {
        let call = ToolCall::new("tc-1", "get_weather")
            .arg("city", ArgumentValue::Number(1.0))
            .arg("days", ArgumentValue::Number(2.0));
        assert!(validate_tool_call(&call, &[weather_tool()]).is_none());
    }

    #[test]
    fn validate_rejects_oversized_id() {
        let call = ToolCall::new("x".repeat(MAX_NAME_LEN + 1), "get_weather")
            .arg("city", ArgumentValue::String("Oslo".to_owned()))
            .arg("days", ArgumentValue::Number(2.0));
        assert!(validate_tool_call(&call, &[weather_tool()]).is_none());
    }
}
