//! Module argument documents

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::modules::ModuleArgs;

/// Parse a JSON or YAML mapping of module arguments. An empty document
/// means no arguments.
pub fn parse_args(content: &str) -> Result<ModuleArgs> {
    if content.trim().is_empty() {
        return Ok(ModuleArgs::default());
    }
    // YAML is a superset of JSON, so one parser covers both
    let value: serde_json::Value =
        serde_yaml::from_str(content).context("Failed to parse module arguments")?;
    Ok(ModuleArgs::from_value(value)?)
}

/// Read arguments from `path`, from stdin when `path` is `-`, or none at all
pub fn load_args(path: Option<&Path>) -> Result<ModuleArgs> {
    let content = match path {
        None => return Ok(ModuleArgs::default()),
        Some(p) if p == Path::new("-") => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read module arguments from stdin")?;
            buffer
        }
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read argument file: {}", p.display()))?,
    };
    parse_args(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = parse_args("name: Web\nstate: absent\nwait: no\n").unwrap();
        assert_eq!(yaml.get_str("name").unwrap().as_deref(), Some("Web"));
        assert!(!yaml.get_bool("wait", true).unwrap());

        let json = parse_args(r#"{"server_ids": ["UC1TEST-SVR01"], "cpu": 2}"#).unwrap();
        assert_eq!(json.get_str_list("server_ids").unwrap(), vec!["UC1TEST-SVR01"]);
        assert_eq!(json.get_u64("cpu").unwrap(), Some(2));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_args("  \n").unwrap().args.is_empty());
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(parse_args("- a\n- b\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name: Web").unwrap();
        writeln!(file, "parent: Default Group").unwrap();

        let args = load_args(Some(file.path())).unwrap();
        assert_eq!(args.get_str("parent").unwrap().as_deref(), Some("Default Group"));
        assert!(load_args(None).unwrap().args.is_empty());
        assert!(load_args(Some(Path::new("/nonexistent/args.yml"))).is_err());
    }
}
