use std::{
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Error};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub const NAME_PLACEHOLDER: &str = "{name}";

const LEGACY_RESERVED_PREFIX: char = '_';
const LEGACY_WELCOME_KEY: &str = "_welcome";
const LEGACY_RELOAD_KEY: &str = "_reload_success";

/// A keyword and the canned reply it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub keyword: String,
    pub reply: String,
}

/// Trigger keywords in file order; that order is the scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triggers(pub Vec<Trigger>);

/// System messages that are never matched against chat text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub welcome: String,
    pub reload_success: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            welcome: format!("👋 Welcome {NAME_PLACEHOLDER}!"),
            reload_success: "Reloaded!".to_string(),
        }
    }
}

impl Templates {
    pub fn welcome_for(&self, name: &str) -> String {
        self.welcome.replace(NAME_PLACEHOLDER, name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseTable {
    #[serde(default)]
    pub triggers: Triggers,
    #[serde(default)]
    pub templates: Templates,
}

impl ResponseTable {
    /// Table written to disk when no responses file exists yet.
    pub fn starter() -> Self {
        let triggers = [
            (
                "hello",
                "👋 Welcome to our Trading Group! Type 'help' for commands.",
            ),
            (
                "help",
                "📌 Commands:\n- /price: Check live prices\n- deposit: How to deposit funds\n- withdraw: Withdrawal guide",
            ),
            (
                "deposit",
                "💳 To deposit, open your wallet, choose Deposit and follow the on-screen steps.",
            ),
            (
                "withdraw",
                "🏦 Withdrawals are processed from the wallet page. Double-check the address before confirming.",
            ),
        ]
        .into_iter()
        .map(|(keyword, reply)| Trigger {
            keyword: keyword.to_string(),
            reply: reply.to_string(),
        })
        .collect();

        Self {
            triggers: Triggers(triggers),
            templates: Templates {
                welcome: format!("👋 Welcome {NAME_PLACEHOLDER} to our Trading Group!"),
                reload_success: "🔄 Responses reloaded successfully!".to_string(),
            },
        }
    }

    /// Accepts the structured layout or the older flat `keyword -> text`
    /// object with `_`-prefixed template keys.
    /// A file that fails both reports the structured layout's error.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let structured = match serde_json::from_str::<ResponseTable>(raw) {
            Ok(table) => return Ok(table),
            Err(e) => e,
        };

        match serde_json::from_str::<LegacyFile>(raw) {
            Ok(LegacyFile(flat)) => Ok(Self::from_legacy(flat)),
            Err(_) => Err(structured.into()),
        }
    }

    fn from_legacy(flat: Vec<(String, String)>) -> Self {
        let mut table = ResponseTable::default();
        for (key, text) in flat {
            match key.as_str() {
                LEGACY_WELCOME_KEY => table.templates.welcome = text,
                LEGACY_RELOAD_KEY => table.templates.reload_success = text,
                k if k.starts_with(LEGACY_RESERVED_PREFIX) => {}
                _ => table.triggers.0.push(Trigger {
                    keyword: key.to_lowercase(),
                    reply: text,
                }),
            }
        }
        table
    }

    /// First trigger whose keyword occurs in `text`, ignoring case.
    pub fn match_reply(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.triggers
            .0
            .iter()
            .find(|t| !t.keyword.is_empty() && lowered.contains(t.keyword.as_str()))
            .map(|t| t.reply.as_str())
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.triggers.0.iter().map(|t| t.keyword.as_str())
    }
}

/// Flat `keyword -> text` object, in file order.
#[derive(Deserialize)]
struct LegacyFile(#[serde(deserialize_with = "ordered_pairs")] Vec<(String, String)>);

fn ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(PairsVisitor)
}

struct PairsVisitor;

impl<'de> Visitor<'de> for PairsVisitor {
    type Value = Vec<(String, String)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of keyword to reply text")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(pair) = map.next_entry::<String, String>()? {
            pairs.push(pair);
        }
        Ok(pairs)
    }
}

impl<'de> Deserialize<'de> for Triggers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = ordered_pairs(deserializer)?;
        Ok(Triggers(
            pairs
                .into_iter()
                .map(|(keyword, reply)| Trigger {
                    keyword: keyword.to_lowercase(),
                    reply,
                })
                .collect(),
        ))
    }
}

impl Serialize for Triggers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for t in &self.0 {
            map.serialize_entry(&t.keyword, &t.reply)?;
        }
        map.end()
    }
}

/// The response table plus the file it is (re)loaded from.
pub struct ResponseStore {
    path: PathBuf,
    table: RwLock<ResponseTable>,
}

impl ResponseStore {
    /// Expects RESPONSES_PATH, defaults to `responses.json` in the working directory.
    pub async fn from_env() -> Self {
        let path = std::env::var("RESPONSES_PATH").unwrap_or_else(|_| "responses.json".to_string());
        Self::open(path).await
    }

    /// Never fails: a missing file is seeded with the starter table. A
    /// corrupt one is not overwritten with defaults, so hand edits survive
    /// until fixed and reloaded; the starter table is used in memory meanwhile.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = match read_table(&path).await {
            Ok(table) => table,
            Err(e) => {
                error!(path = %path.display(), error = ?e, "responses unreadable, using built-in defaults");
                ResponseTable::starter()
            }
        };

        info!(
            path = %path.display(),
            triggers = table.triggers.0.len(),
            "responses loaded"
        );

        Self {
            path,
            table: RwLock::new(table),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> ResponseTable {
        self.table.read().await.clone()
    }

    pub async fn templates(&self) -> Templates {
        self.table.read().await.templates.clone()
    }

    /// Replace the in-memory table with the file contents. On error the
    /// current table is kept.
    pub async fn reload(&self) -> Result<Templates, Error> {
        let fresh = read_table(&self.path).await?;
        let templates = fresh.templates.clone();

        info!(triggers = fresh.triggers.0.len(), "responses reloaded");
        *self.table.write().await = fresh;

        Ok(templates)
    }
}

async fn read_table(path: &Path) -> Result<ResponseTable, Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            ResponseTable::parse(&raw).with_context(|| format!("parsing {}", path.display()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let table = ResponseTable::starter();
            if let Err(e) = write_table(path, &table).await {
                warn!(path = %path.display(), error = ?e, "could not write default responses");
            } else {
                info!(path = %path.display(), "wrote default responses");
            }
            Ok(table)
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

async fn write_table(path: &Path, table: &ResponseTable) -> Result<(), Error> {
    let body = serde_json::to_string_pretty(table)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn table(pairs: &[(&str, &str)]) -> ResponseTable {
        ResponseTable {
            triggers: Triggers(
                pairs
                    .iter()
                    .map(|(k, v)| Trigger {
                        keyword: k.to_string(),
                        reply: v.to_string(),
                    })
                    .collect(),
            ),
            templates: Templates::default(),
        }
    }

    #[test]
    fn first_match_in_file_order_wins() {
        let t = ResponseTable::parse(
            r#"{"triggers": {"with": "first", "withdraw": "second"}, "templates": {}}"#,
        )
        .unwrap();

        assert_eq!(t.match_reply("How do I WITHDRAW?"), Some("first"));
        assert_eq!(t.match_reply("nothing here"), None);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let t = ResponseTable::parse(r#"{"triggers": {"Hello": "hi"}}"#).unwrap();
        assert_eq!(t.keywords().collect::<Vec<_>>(), vec!["hello"]);
        assert_eq!(t.match_reply("hElLo there"), Some("hi"));
    }

    #[test]
    fn missing_templates_use_defaults() {
        let t = ResponseTable::parse(r#"{"triggers": {"gm": "gm!"}}"#).unwrap();
        assert_eq!(t.templates, Templates::default());

        let t = ResponseTable::parse(r#"{"templates": {"welcome": "yo {name}"}}"#).unwrap();
        assert_eq!(t.templates.welcome, "yo {name}");
        assert_eq!(t.templates.reload_success, "Reloaded!");
    }

    #[test]
    fn legacy_flat_file_is_understood() {
        let t = ResponseTable::parse(
            r#"{"hello": "hi", "_welcome": "hey {name}", "_reload_success": "done", "_note": "x", "help": "h"}"#,
        )
        .unwrap();

        assert_eq!(t.keywords().collect::<Vec<_>>(), vec!["hello", "help"]);
        assert_eq!(t.templates.welcome, "hey {name}");
        assert_eq!(t.templates.reload_success, "done");
        assert_eq!(t.match_reply("_note"), None);
    }

    #[test]
    fn structured_layout_round_trips_through_disk_format() {
        let starter = ResponseTable::starter();
        let body = serde_json::to_string_pretty(&starter).unwrap();
        assert_eq!(ResponseTable::parse(&body).unwrap(), starter);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ResponseTable::parse("[1, 2, 3]").is_err());
        assert!(ResponseTable::parse("{ nope").is_err());
    }

    #[test]
    fn misspelled_section_names_the_field() {
        let err = ResponseTable::parse(r#"{"template": {"welcome": "hey {name}"}}"#).unwrap_err();
        assert!(
            err.to_string().contains("unknown field `template`"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn welcome_substitutes_every_placeholder() {
        let templates = Templates {
            welcome: "{name}! welcome, {name}".into(),
            ..Templates::default()
        };
        assert_eq!(templates.welcome_for("<@42>"), "<@42>! welcome, <@42>");
    }

    #[tokio::test]
    async fn missing_file_is_seeded_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.json");

        let store = ResponseStore::open(&path).await;
        assert_eq!(store.snapshot().await, ResponseTable::starter());

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(ResponseTable::parse(&on_disk).unwrap(), ResponseTable::starter());
    }

    #[tokio::test]
    async fn corrupt_file_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, "{ broken").unwrap();

        let store = ResponseStore::open(&path).await;
        assert_eq!(store.snapshot().await, ResponseTable::starter());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[tokio::test]
    async fn hand_fixed_file_is_picked_up_on_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, r#"{"triggers": {"hello": "hi",}}"#).unwrap();

        let store = ResponseStore::open(&path).await;
        assert_eq!(store.snapshot().await, ResponseTable::starter());

        std::fs::write(&path, r#"{"triggers": {"hello": "hi"}}"#).unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.snapshot().await.keywords().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[tokio::test]
    async fn reload_replaces_table_exactly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, r#"{"triggers": {"hello": "hi", "gm": "gm"}}"#).unwrap();

        let store = ResponseStore::open(&path).await;
        assert_eq!(store.snapshot().await.match_reply("gm all"), Some("gm"));

        std::fs::write(
            &path,
            r#"{"triggers": {"bye": "see ya"}, "templates": {"reload_success": "fresh"}}"#,
        )
        .unwrap();

        let templates = store.reload().await.unwrap();
        assert_eq!(templates.reload_success, "fresh");

        let expected = ResponseTable {
            templates: Templates {
                reload_success: "fresh".into(),
                ..Templates::default()
            },
            ..table(&[("bye", "see ya")])
        };
        assert_eq!(store.snapshot().await, expected);
        assert_eq!(store.snapshot().await.match_reply("gm all"), None);
    }

    #[tokio::test]
    async fn failed_reload_keeps_current_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, r#"{"triggers": {"hello": "hi"}}"#).unwrap();

        let store = ResponseStore::open(&path).await;
        std::fs::write(&path, "not json").unwrap();

        assert!(store.reload().await.is_err());
        assert_eq!(store.snapshot().await, table(&[("hello", "hi")]));
    }
}
