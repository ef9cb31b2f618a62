//! Shared helpers for CLI commands: input reading, model paths, JSON output

use anyhow::Context;
use evalsense_core::ScoringConfig;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read a file, or stdin when `path` is `None` or `-`
pub fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read standard input")?;
            Ok(buf)
        }
    }
}

/// Parse either a JSON array or JSON lines into items
pub fn parse_items<T: serde::de::DeserializeOwned>(content: &str) -> anyhow::Result<Vec<T>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON array");
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("Failed to parse line {}", n + 1)))
        .collect()
}

pub fn sentiment_model_path(explicit: Option<PathBuf>, config: &ScoringConfig) -> PathBuf {
    explicit.unwrap_or_else(|| config.paths.sentiment_model())
}

pub fn anomaly_model_path(explicit: Option<PathBuf>, config: &ScoringConfig) -> PathBuf {
    explicit.unwrap_or_else(|| config.paths.anomaly_model())
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode output")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalsense_core::RawRatings;

    #[test]
    fn test_parse_items_accepts_both_layouts() {
        let array: Vec<RawRatings> = parse_items(r#"[{"q1": 1}, {"q2": 2}]"#).unwrap();
        let lines: Vec<RawRatings> = parse_items("{\"q1\": 1}\n\n{\"q2\": 2}\n").unwrap();
        assert_eq!(array, lines);
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = ScoringConfig::default();
        let explicit = PathBuf::from("/tmp/custom.evs");
        assert_eq!(sentiment_model_path(Some(explicit.clone()), &config), explicit);
        assert_eq!(anomaly_model_path(None, &config), config.paths.anomaly_model());
    }
}
