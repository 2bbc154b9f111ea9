use crate::fsutil;
use eyre::Context as _;
use serde_json::{json, Map, Value};
use std::{fs, path::Path};

// Every line carries the same keys. Fields may be null depending on the event.
const REQUIRED_KEYS: [&str; 7] = [
    "ts",
    "event",
    "wallet_id",
    "custody",
    "solana_derivation",
    "result",
    "error_code",
];

// Never written to the log, whatever the caller passes in.
const FORBIDDEN_KEYS: [&str; 4] = ["mnemonic", "phrase", "password", "secret_key"];

pub fn normalize_entry(v: Value) -> Value {
    let mut obj = match v {
        Value::Object(m) => m,
        other @ (Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Array(_)) => {
            let mut m = Map::new();
            m.insert("raw".to_owned(), other);
            m
        }
    };

    for k in FORBIDDEN_KEYS {
        obj.remove(k);
    }

    if !obj.contains_key("ts") {
        obj.insert(
            "ts".to_owned(),
            Value::String(crate::keystore::utc_now_iso()),
        );
    }

    for k in REQUIRED_KEYS {
        if !obj.contains_key(k) {
            obj.insert(k.to_owned(), Value::Null);
        }
    }

    Value::Object(obj)
}

/// Outcome fields for an event that may have failed.
pub fn outcome<T>(res: &eyre::Result<T>) -> Value {
    match res {
        Ok(_) => json!({ "result": "ok" }),
        Err(e) => json!({
            "result": "error",
            "error_code": crate::errors::ErrorReport::from_eyre(e).code,
        }),
    }
}

pub fn append(path: &Path, entry: Value) -> eyre::Result<()> {
    let entry = normalize_entry(entry);
    fsutil::append_private_line(path, &entry.to_string()).context("write audit log")
}

/// Newest first, skipping lines that do not parse.
pub fn read_recent(path: &Path, limit: usize) -> eyre::Result<Vec<Value>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = fs::read_to_string(path).context("read audit log")?;
    Ok(contents
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .take(limit)
        .collect())
}
