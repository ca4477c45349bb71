//! The package.json sub-pipeline: parse as a JSON object, then extract the
//! fields the module resolver cares about.

use lattice_core::types::artifacts::{PackageInfo, PackageJsonError};

/// Parse a `package.json` body. `node_main_fields` decides which field
/// supplies `main`: the first configured field present with a string value
/// wins.
pub fn parse_package_json(
    content: &str,
    node_main_fields: &[String],
) -> Result<PackageInfo, PackageJsonError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| PackageJsonError {
            message: e.to_string(),
        })?;
    let obj = value.as_object().ok_or_else(|| PackageJsonError {
        message: "package.json is not an object".to_string(),
    })?;

    let name = obj.get("name").and_then(|v| v.as_str()).map(str::to_string);
    let main = node_main_fields
        .iter()
        .find_map(|field| obj.get(field).and_then(|v| v.as_str()))
        .map(str::to_string);

    Ok(PackageInfo { name, main })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_matching_main_field() {
        let pkg = parse_package_json(
            r#"{"name": "widget", "module": "./es/index.js", "main": "./index.js"}"#,
            &["module".to_string(), "main".to_string()],
        )
        .unwrap();
        assert_eq!(pkg.name.as_deref(), Some("widget"));
        assert_eq!(pkg.main.as_deref(), Some("./es/index.js"));
    }

    #[test]
    fn missing_fields_are_none() {
        let pkg = parse_package_json("{}", &["main".to_string()]).unwrap();
        assert_eq!(pkg, PackageInfo::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_package_json("{", &[]).is_err());
    }

    #[test]
    fn non_object_json_is_an_error() {
        assert!(parse_package_json("[1, 2]", &[]).is_err());
    }

    #[test]
    fn non_string_main_is_skipped() {
        let pkg = parse_package_json(
            r#"{"main": 42, "module": "./index.js"}"#,
            &["main".to_string(), "module".to_string()],
        )
        .unwrap();
        assert_eq!(pkg.main.as_deref(), Some("./index.js"));
    }
}
