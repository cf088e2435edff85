//! Integration tests using shared test cases from tests/fixtures/*.json

use hige::{render, Context, Hige, HigeError, Template};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct TestSuite {
    #[allow(dead_code)]
    description: String,
    tests: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    name: String,
    template: String,
    data: serde_json::Value,
    #[serde(default)]
    partials: Option<HashMap<String, String>>,
    #[serde(default)]
    expected: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn get_fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_test_suite(filename: &str) -> TestSuite {
    let path = get_fixtures_dir().join(filename);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {filename}: {e}"))
}

fn render_case(case: &TestCase) -> Result<String, HigeError> {
    let Some(sources) = &case.partials else {
        return render(&case.template, case.data.clone());
    };

    let mut partials = HashMap::new();
    for (name, source) in sources {
        let template: Template = hige_ast::parse(source)?;
        partials.insert(name.clone(), Arc::new(template));
    }
    let context = Context::from_json(case.data.clone())?;
    Hige::parse(&case.template)?.render_with(&context, &mut partials)
}

fn run_test_case(case: &TestCase) {
    let result = render_case(case);

    if let Some(expected) = &case.expected {
        match result {
            Ok(output) => assert_eq!(&output, expected, "Test '{}' failed", case.name),
            Err(e) => panic!(
                "Test '{}' should succeed with '{}', but got error: {:?}",
                case.name, expected, e
            ),
        }
    } else if let Some(error_type) = &case.error {
        match result {
            Ok(output) => panic!(
                "Test '{}' should fail with {}, but succeeded with '{}'",
                case.name, error_type, output
            ),
            Err(e) => {
                let error_name = format!("{e:?}");
                assert!(
                    error_name.contains(error_type.as_str()),
                    "Test '{}' expected error type '{}', got '{:?}'",
                    case.name,
                    error_type,
                    e
                );
            }
        }
    }
}

fn run_test_suite(filename: &str) {
    let suite = load_test_suite(filename);
    for case in &suite.tests {
        run_test_case(case);
    }
    eprintln!("{}: {} tests passed", filename, suite.tests.len());
}

#[test]
fn test_interpolation() {
    run_test_suite("interpolation.json");
}

#[test]
fn test_sections() {
    run_test_suite("sections.json");
}

#[test]
fn test_inverted() {
    run_test_suite("inverted.json");
}

#[test]
fn test_partials() {
    run_test_suite("partials.json");
}

#[test]
fn test_delimiters() {
    run_test_suite("delimiters.json");
}

#[test]
fn test_comments() {
    run_test_suite("comments.json");
}

#[test]
fn test_errors() {
    run_test_suite("errors.json");
}
