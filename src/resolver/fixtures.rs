//! Fixture loading: on-disk files providing structured response data.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DoubleError, Result};

/// Loads a fixture by filename relative to a fixtures folder.
#[async_trait]
pub trait FixtureLoader: Send + Sync {
    /// Load and parse `folder/name`.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::FixtureNotFound`] if the file does not exist
    /// and [`DoubleError::FixtureParse`] if it is not valid structured data.
    async fn load_fixture(&self, folder: &Path, name: &str) -> Result<Value>;
}

/// Reads fixtures from the filesystem.
///
/// The format is picked by [`parse_fixture`]; `.js` fixtures must export a
/// JSON-like object literal and cannot run code.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFixtureLoader;

#[async_trait]
impl FixtureLoader for FsFixtureLoader {
    #[tracing::instrument(skip(self))]
    async fn load_fixture(&self, folder: &Path, name: &str) -> Result<Value> {
        let path = folder.join(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DoubleError::FixtureNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };
        parse_fixture(&path, &content)
    }
}

/// Parse fixture `content`, picking the format from the extension of `path`.
///
/// - `.yaml` / `.yml`: YAML.
/// - `.js` / `.cjs`: a CommonJS module of the form `module.exports = {...};`.
///   The exported object or array literal may use unquoted keys but must
///   otherwise be plain data. Comments, functions and `require` calls are
///   not supported.
/// - anything else: JSON.
pub fn parse_fixture(path: &Path, content: &str) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
        // YAML flow syntax covers JSON plus unquoted object keys
        Some("js" | "cjs") => {
            let literal = exported_literal(content);
            if literal.starts_with(['{', '[']) {
                serde_yaml::from_str::<Value>(literal).map_err(|e| e.to_string())
            } else {
                Err("module must export an object or array literal".to_string())
            }
        }
        _ => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| DoubleError::FixtureParse {
        path: path.to_path_buf(),
        message,
    })
}

/// Strip `module.exports =` and a trailing `;` from a CommonJS fixture.
fn exported_literal(content: &str) -> &str {
    let body = content.trim();
    let body = body
        .strip_prefix("module.exports")
        .and_then(|rest| rest.trim_start().strip_prefix('='))
        .unwrap_or(body);
    body.trim().trim_end_matches(';').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_loads_json_fixture() {
        let value = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "arbitraryFixture.json")
            .await
            .unwrap();

        assert_eq!(value["name"], "Batman");
        assert_eq!(value["sidekicks"], json!(["Robin", "Batgirl"]));
    }

    #[tokio::test]
    async fn test_loads_yaml_fixture() {
        let yaml = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "arbitraryFixture.yaml")
            .await
            .unwrap();
        let json = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "arbitraryFixture.json")
            .await
            .unwrap();

        assert_eq!(yaml, json);
    }

    #[tokio::test]
    async fn test_missing_fixture() {
        let err = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "doesNotExist.json")
            .await
            .unwrap_err();

        assert!(matches!(err, DoubleError::FixtureNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_fixture() {
        let err = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "broken.json")
            .await
            .unwrap_err();

        assert!(matches!(err, DoubleError::FixtureParse { .. }));
    }

    #[test]
    fn test_parse_fixture_picks_format_from_extension() {
        let value = parse_fixture(Path::new("f.yml"), "answer: 42\n").unwrap();
        assert_eq!(value, json!({ "answer": 42 }));

        assert!(parse_fixture(Path::new("f.json"), "answer: 42\n").is_err());
    }

    #[tokio::test]
    async fn test_loads_commonjs_fixture_from_default_folder() {
        let commonjs = FsFixtureLoader
            .load_fixture(
                Path::new(crate::server::DEFAULT_FIXTURES_FOLDER),
                "arbitraryFixture.js",
            )
            .await
            .unwrap();
        let json = FsFixtureLoader
            .load_fixture(Path::new("tests/fixtures"), "arbitraryFixture.json")
            .await
            .unwrap();

        assert_eq!(commonjs, json);
    }

    #[test]
    fn test_parse_commonjs_fixture() {
        let value = parse_fixture(
            Path::new("f.js"),
            "module.exports = {\n  answer: 42,\n  \"quoted\": [\"a\", \"b\"]\n};\n",
        )
        .unwrap();
        assert_eq!(value, json!({ "answer": 42, "quoted": ["a", "b"] }));

        // Bare literal without the export is accepted too
        let value = parse_fixture(Path::new("f.js"), "{\"answer\": 42}").unwrap();
        assert_eq!(value, json!({ "answer": 42 }));
    }

    #[test]
    fn test_commonjs_fixture_with_code_is_rejected() {
        let err = parse_fixture(
            Path::new("f.js"),
            "module.exports = require('./other');",
        )
        .unwrap_err();

        assert!(matches!(err, DoubleError::FixtureParse { .. }));
    }
}
