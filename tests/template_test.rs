// tests/template_test.rs
use flex_version::config::OutputConfig;
use flex_version::template::{parse, Environment, Evaluator, OutputRenderer};
use flex_version::FlexVersionError;
use indexmap::IndexMap;
use serial_test::serial;
use std::env;

fn render(env: &Environment, template: &str) -> Result<String, FlexVersionError> {
    let nodes = parse(template).map_err(|m| FlexVersionError::template("Out", template, m))?;
    Evaluator::new(env, true, "Out", template).render(&nodes)
}

fn version_env() -> Environment {
    let mut env = Environment::default();
    for (k, v) in [("major", "1"), ("minor", "2"), ("patch", "3")] {
        env.parameters.insert(k.to_string(), v.to_string());
    }
    env.git_info
        .insert("BranchName".to_string(), "release/1.2".to_string());
    env
}

#[test]
fn test_text_without_markup_renders_to_itself() {
    let env = Environment::default();
    let samples = [
        "",
        "plain",
        "1.0.0 (build), final > beta",
        "tabs\tand\nnewlines",
        "unicode ✓ ünïcødé",
        "((nested)) , commas ,",
        ">>>",
    ];
    for sample in samples {
        assert_eq!(render(&env, sample).unwrap(), sample);
    }
}

#[test]
fn test_substring_clamps_to_string_length() {
    let env = Environment::default();
    let rendered = render(&env, "$Substring(abcde,3,10)").unwrap();
    assert_eq!(rendered, "de");
    assert_eq!(rendered.len(), 2);
}

#[test]
fn test_realistic_version_templates() {
    let env = version_env();

    assert_eq!(
        render(&env, "<Match:major>.<Match:minor>.$Calc(<Match:patch>*10)").unwrap(),
        "1.2.30"
    );
    assert_eq!(
        render(
            &env,
            "$If($RegexMatch(<GitInfo:BranchName>,^release/),rc,dev)-$PadLeft(<Match:patch>,4,0)"
        )
        .unwrap(),
        "rc-0003"
    );
    assert_eq!(
        render(&env, "$Substring(<GitInfo:BranchName>,$Add($Index(<GitInfo:BranchName>,/),1),99)")
            .unwrap(),
        "1.2"
    );
}

#[test]
fn test_unknown_function_fails_in_strict_mode() {
    let env = Environment::default();
    let err = render(&env, "$Bogus(1)").unwrap_err();
    assert!(err.to_string().contains("Bogus"));
}

#[test]
#[serial]
fn test_env_namespace_reads_process_environment() {
    env::set_var("FLEX_VERSION_TEST_BUILD", "314");
    let environment = Environment::default();

    let bracket = render(&environment, "<env:FLEX_VERSION_TEST_BUILD>");
    let function = render(&environment, "$Env(FLEX_VERSION_TEST_BUILD)");
    env::remove_var("FLEX_VERSION_TEST_BUILD");

    assert_eq!(bracket.unwrap(), "314");
    assert_eq!(function.unwrap(), "314");
}

#[test]
#[serial]
fn test_missing_env_variable_is_an_error() {
    env::remove_var("FLEX_VERSION_TEST_MISSING");
    let environment = Environment::default();

    let err = render(&environment, "<env:FLEX_VERSION_TEST_MISSING>").unwrap_err();
    assert!(matches!(err, FlexVersionError::Template { .. }));
    assert!(err.to_string().contains("FLEX_VERSION_TEST_MISSING"));
}

#[test]
fn test_lenient_renderer_keeps_going() {
    let settings = OutputConfig {
        strict: false,
        ..OutputConfig::default()
    };
    let renderer = OutputRenderer::new(&settings, false).unwrap();

    let mut templates = IndexMap::new();
    templates.insert("Broken".to_string(), "$Nope(<Match:major>)".to_string());
    templates.insert("Missing".to_string(), "v<Arg:Build>".to_string());
    templates.insert("Fine".to_string(), "<Match:major>.<Match:minor>".to_string());

    let out = renderer.render(&templates, &mut version_env()).unwrap();
    assert_eq!(out["Broken"], "Nope(1)");
    assert_eq!(out["Missing"], "v<Arg:Build>");
    assert_eq!(out["Fine"], "1.2");
}
