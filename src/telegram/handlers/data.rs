//! `/data_*` commands: read and write the key-value store from chat
//!
//! Values set with `/data_set` are kept as text, values set with
//! `/data_set_json` as parsed JSON. Both getters read either kind, and a path
//! with nothing stored at it reads as the object of everything stored below
//! it, so `/data_get_json users` shows `users/1`, `users/2`, ...

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::{BotRegistry, HandlerDeps};
use crate::core::error::AppError;
use crate::core::utils::escape_markdown_v2_code;
use crate::storage::{KeyValueStore, StoredValue};
use crate::telegram::bot::Command;
use crate::telegram::transport::Transport;
use crate::telegram::types::{CommandEvent, OutboundMessage, Update, UpdateKind};

/// `<path> <value>`, where the value may span lines
static PATH_AND_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^ \r\n]+)[ \r\n]([\s\S]*)$").expect("path and value regex"));

static PATH_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^ ]+)$").expect("path regex"));

pub fn mount(registry: &mut BotRegistry) {
    registry.on(UpdateKind::Command, on_command);
}

async fn on_command(deps: HandlerDeps, update: Arc<Update>) {
    let Some(command) = update.command() else {
        return;
    };
    let transport = deps.transport.as_ref();
    let store = deps.store.as_ref();

    let (name, result) = match &command.command {
        Command::DataSet(args) => ("data_set", data_set(transport, store, command, args).await),
        Command::DataGet(args) => ("data_get", data_get(transport, store, command, args).await),
        Command::DataSetJson(args) => ("data_set_json", data_set_json(transport, store, command, args).await),
        Command::DataGetJson(args) => ("data_get_json", data_get_json(transport, store, command, args).await),
        _ => return,
    };

    if let Err(e) = result {
        log::error!("/{} failed in chat {}: {}", name, command.message.chat_id, e);
    }
}

fn path_and_value(args: &str) -> Option<(&str, &str)> {
    let caps = PATH_AND_VALUE.captures(args)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn path_only(args: &str) -> Option<&str> {
    Some(PATH_ONLY.captures(args)?.get(1)?.as_str())
}

async fn reply_markdown(transport: &dyn Transport, command: &CommandEvent, text: String) -> Result<(), AppError> {
    transport
        .send_message(OutboundMessage::new(command.message.chat_id, text).markdown())
        .await?;
    Ok(())
}

async fn usage(
    transport: &dyn Transport,
    command: &CommandEvent,
    name: &str,
    arguments: &str,
) -> Result<(), AppError> {
    reply_markdown(transport, command, format!("*Usage:* `/{} {}`", name, arguments)).await
}

async fn confirm_set(transport: &dyn Transport, command: &CommandEvent, getter: &str, path: &str) -> Result<(), AppError> {
    reply_markdown(
        transport,
        command,
        format!(
            "Data has been set, you can now use `/{} {}` to retrieve it",
            getter,
            escape_markdown_v2_code(path)
        ),
    )
    .await
}

fn json_block(body: &str) -> String {
    format!("```json\n{}\n```", escape_markdown_v2_code(body))
}

async fn data_set(
    transport: &dyn Transport,
    store: &dyn KeyValueStore,
    command: &CommandEvent,
    args: &str,
) -> Result<(), AppError> {
    let Some((path, value)) = path_and_value(args) else {
        return usage(transport, command, "data_set", "<path> <value>").await;
    };

    store.set(path, StoredValue::Text(value.to_string()))?;
    confirm_set(transport, command, "data_get", path).await
}

async fn data_get(
    transport: &dyn Transport,
    store: &dyn KeyValueStore,
    command: &CommandEvent,
    args: &str,
) -> Result<(), AppError> {
    let Some(path) = path_only(args) else {
        return usage(transport, command, "data_get", "<path>").await;
    };

    let text = match store.get_tree(path)? {
        Some(StoredValue::Text(text)) => text,
        Some(StoredValue::Json(Value::String(text))) => text,
        Some(StoredValue::Json(json)) => json.to_string(),
        None => format!("Nothing is stored at {}", path),
    };
    // Telegram refuses empty messages
    let text = if text.is_empty() { "(empty)".to_string() } else { text };

    transport
        .send_message(OutboundMessage::new(command.message.chat_id, text))
        .await?;
    Ok(())
}

async fn data_set_json(
    transport: &dyn Transport,
    store: &dyn KeyValueStore,
    command: &CommandEvent,
    args: &str,
) -> Result<(), AppError> {
    let Some((path, raw)) = path_and_value(args) else {
        return usage(transport, command, "data_set_json", "<path> <json>").await;
    };

    let json: Value = match serde_json::from_str(raw) {
        Ok(json) => json,
        Err(e) => {
            log::debug!("/data_set_json got invalid JSON for {}: {}", path, e);
            if !raw.is_empty() {
                reply_markdown(transport, command, format!("{}\nis not valid JSON", json_block(raw))).await?;
            }
            return usage(transport, command, "data_set_json", "<path> <json>").await;
        }
    };

    store.set(path, StoredValue::Json(json))?;
    confirm_set(transport, command, "data_get_json", path).await
}

async fn data_get_json(
    transport: &dyn Transport,
    store: &dyn KeyValueStore,
    command: &CommandEvent,
    args: &str,
) -> Result<(), AppError> {
    let Some(path) = path_only(args) else {
        return usage(transport, command, "data_get_json", "<path>").await;
    };

    let json = store.get_tree(path)?.map_or(Value::Null, StoredValue::into_json);

    reply_markdown(transport, command, json_block(&serde_json::to_string_pretty(&json)?)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::testing::{fixtures, RecordingTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Harness {
        transport: Arc<RecordingTransport>,
        store: Arc<SqliteStore>,
        deps: HandlerDeps,
    }

    fn harness() -> Harness {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let deps = HandlerDeps::new(transport.clone(), store.clone());
        Harness { transport, store, deps }
    }

    impl Harness {
        async fn run(&self, command: Command) -> Vec<OutboundMessage> {
            self.transport.clear();
            on_command(self.deps.clone(), Arc::new(fixtures::command(8, 1, command))).await;
            self.transport.sent_messages()
        }
    }

    #[test]
    fn test_argument_patterns() {
        assert_eq!(path_and_value("users/1 Ada"), Some(("users/1", "Ada")));
        assert_eq!(path_and_value("note line one\nline two"), Some(("note", "line one\nline two")));
        assert_eq!(path_and_value("k "), Some(("k", "")));
        assert_eq!(path_and_value("lonely"), None);
        assert_eq!(path_only("users/1"), Some("users/1"));
        assert_eq!(path_only("users 1"), None);
        assert_eq!(path_only(""), None);
    }

    #[tokio::test]
    async fn test_set_and_get_text() {
        let h = harness();

        let sent = h.run(Command::DataSet("greeting hello world".to_string())).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].markdown);
        assert_eq!(
            sent[0].text,
            "Data has been set, you can now use `/data_get greeting` to retrieve it"
        );
        assert_eq!(
            h.store.get("greeting").unwrap(),
            Some(StoredValue::Text("hello world".to_string()))
        );

        let sent = h.run(Command::DataGet("greeting".to_string())).await;
        assert_eq!(sent[0].text, "hello world");
        assert!(!sent[0].markdown);
    }

    #[tokio::test]
    async fn test_usage_hints() {
        let h = harness();

        assert_eq!(h.run(Command::DataSet("".to_string())).await[0].text, "*Usage:* `/data_set <path> <value>`");
        assert_eq!(h.run(Command::DataGet("a b".to_string())).await[0].text, "*Usage:* `/data_get <path>`");
        assert_eq!(
            h.run(Command::DataSetJson("only-path".to_string())).await[0].text,
            "*Usage:* `/data_set_json <path> <json>`"
        );
        assert_eq!(h.run(Command::DataGetJson("".to_string())).await[0].text, "*Usage:* `/data_get_json <path>`");
    }

    #[tokio::test]
    async fn test_get_missing_path() {
        let h = harness();
        assert_eq!(h.run(Command::DataGet("nothing".to_string())).await[0].text, "Nothing is stored at nothing");
        assert_eq!(h.run(Command::DataGetJson("nothing".to_string())).await[0].text, "```json\nnull\n```");
    }

    #[tokio::test]
    async fn test_set_and_get_json() {
        let h = harness();

        let sent = h.run(Command::DataSetJson("config {\"limit\": 3, \"tags\": [\"a\"]}".to_string())).await;
        assert_eq!(
            sent[0].text,
            "Data has been set, you can now use `/data_get_json config` to retrieve it"
        );
        assert_eq!(
            h.store.get("config").unwrap(),
            Some(StoredValue::Json(json!({"limit": 3, "tags": ["a"]})))
        );

        let sent = h.run(Command::DataGetJson("config".to_string())).await;
        assert_eq!(
            sent[0].text,
            "```json\n{\n  \"limit\": 3,\n  \"tags\": [\n    \"a\"\n  ]\n}\n```"
        );

        let sent = h.run(Command::DataGet("config".to_string())).await;
        assert_eq!(sent[0].text, "{\"limit\":3,\"tags\":[\"a\"]}");
    }

    #[tokio::test]
    async fn test_invalid_json_is_echoed() {
        let h = harness();

        let sent = h.run(Command::DataSetJson("config {oops`".to_string())).await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text, "```json\n{oops\\`\n```\nis not valid JSON");
        assert_eq!(sent[1].text, "*Usage:* `/data_set_json <path> <json>`");
        assert_eq!(h.store.get("config").unwrap(), None);
    }

    #[tokio::test]
    async fn test_text_value_read_as_json_string() {
        let h = harness();
        h.run(Command::DataSet("name Ada".to_string())).await;
        assert_eq!(h.run(Command::DataGetJson("name".to_string())).await[0].text, "```json\n\"Ada\"\n```");
    }

    #[tokio::test]
    async fn test_empty_value_has_placeholder() {
        let h = harness();
        h.run(Command::DataSet("blank ".to_string())).await;
        assert_eq!(h.run(Command::DataGet("blank".to_string())).await[0].text, "(empty)");
    }

    #[tokio::test]
    async fn test_get_reads_subtree() {
        let h = harness();
        h.run(Command::DataSet("users/1 Ada".to_string())).await;
        h.run(Command::DataSetJson("users/2 {\"age\": 41}".to_string())).await;
        h.run(Command::DataSet("users/2/name Bob".to_string())).await;

        assert_eq!(
            h.run(Command::DataGetJson("users".to_string())).await[0].text,
            "```json\n{\n  \"1\": \"Ada\",\n  \"2\": {\n    \"age\": 41,\n    \"name\": \"Bob\"\n  }\n}\n```"
        );
        assert_eq!(
            h.run(Command::DataGet("users".to_string())).await[0].text,
            "{\"1\":\"Ada\",\"2\":{\"age\":41,\"name\":\"Bob\"}}"
        );
        assert_eq!(h.run(Command::DataGet("users/1".to_string())).await[0].text, "Ada");
    }

    #[tokio::test]
    async fn test_other_commands_ignored() {
        let h = harness();
        assert!(h.run(Command::Counter).await.is_empty());
    }
}
