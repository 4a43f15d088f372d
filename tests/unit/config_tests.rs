// Configuration loading tests

use std::io::Write;
use std::path::PathBuf;

use proofstamp::config::Config;
use proofstamp::watermark::{AssetPolicy, Color, Theme};
use rstest::rstest;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

// Test: A realistic deployment file loads and validates
#[test]
fn test_deployment_config_loads_from_file() {
    let file = write_config(
        r##"
theme: card
fonts:
  - /usr/share/fonts/HYQiHei-65W.ttf
  - /usr/share/fonts/NotoSansSC-Regular.otf
brand_fonts:
  - /usr/share/fonts/Montserrat-Bold.ttf
assets:
  dir: /srv/proofstamp/assets
palette:
  card: "#2F63FFEB"
  security_code: "#FC3"
text:
  brand_name: "Field Cam"
  slogan: "Every shot on record"
security:
  length: 10
output:
  jpeg_quality: 88
"##,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.theme, Theme::Card);
    assert_eq!(config.fonts[1], PathBuf::from("/usr/share/fonts/NotoSansSC-Regular.otf"));
    assert_eq!(config.brand_fonts.len(), 1);
    assert_eq!(config.assets.on_missing, AssetPolicy::Skip);
    assert_eq!(config.palette.security_code, Color::rgba(0xFF, 0xCC, 0x33, 0xFF));
    assert_eq!(config.text.slogan, "Every shot on record");
    assert_eq!(config.text.security_label, "Anti-fake: ");
    assert_eq!(config.security.length, 10);
    assert_eq!(config.security.seed, None);
    assert_eq!(config.output.jpeg_quality, 88);
}

// Test: Style overrides merge with defaults
#[test]
fn test_style_overrides_keep_other_defaults() {
    let config = Config::from_yaml_with_env(
        r#"
style:
  overlay_height: { min: 0.10, target: 0.25, max: 0.30 }
  card:
    padding_x: 0.10
  location_max_lines: 3
"#,
    )
    .unwrap();

    assert_eq!(config.style.overlay_height.target, 0.25);
    assert_eq!(config.style.card.padding_x, 0.10);
    assert_eq!(config.style.card.padding_y, 0.16);
    assert_eq!(config.style.location_max_lines, 3);
    assert_eq!(config.style.max_rounds, 8);
    assert!(config.validate().is_ok());
}

// Test: Invalid values are caught by validate()
#[rstest]
#[case("security: { length: 2 }", "security.length")]
#[case("security: { length: 33 }", "security.length")]
#[case("output: { jpeg_quality: 0 }", "jpeg_quality")]
#[case("style: { overlay_height: { min: 0.3, target: 0.2, max: 0.4 } }", "overlay_height")]
#[case("style: { card_unit: 0.0 }", "card_unit")]
#[case("style: { max_rounds: 0 }", "round limits")]
fn test_validation_rejects(#[case] yaml: &str, #[case] expected: &str) {
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains(expected), "'{}' should mention '{}'", err, expected);
}

// Test: Malformed documents fail to parse
#[rstest]
#[case("theme: poster")]
#[case("assets: { on_missing: explode }")]
#[case("palette: { ribbon: \"#12345\" }")]
#[case("security: { length: -1 }")]
fn test_malformed_config_is_rejected(#[case] yaml: &str) {
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

// Test: ${VAR} references are substituted from the environment
#[test]
fn test_environment_substitution_in_file() {
    std::env::set_var("PROOFSTAMP_IT_BRAND", "Patrol Cam");
    let file = write_config("text:\n  brand_name: ${PROOFSTAMP_IT_BRAND}\n");
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.text.brand_name, "Patrol Cam");

    let file = write_config("text:\n  brand_name: ${PROOFSTAMP_IT_NEVER_SET}\n");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.contains("PROOFSTAMP_IT_NEVER_SET"));
}
