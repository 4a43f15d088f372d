// End-to-end pipeline tests: file in, stamped file out

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use proofstamp::codec::{decode_image, encode_image, EncoderQuality, OutputFormat};
use proofstamp::config::Config;
use proofstamp::watermark::{
    AssetPolicy, FixedClock, FontLibrary, FontLoader, PanelKind, SeededCodes, Theme,
    WatermarkError, WatermarkRequest, Watermarker,
};
use rstest::rstest;
use tempfile::TempDir;

const BACKGROUND: Rgba<u8> = Rgba([30, 60, 90, 255]);

fn write_image(path: &Path, width: u32, height: u32, color: Rgba<u8>) {
    let img = RgbaImage::from_pixel(width, height, color);
    let bytes = encode_image(&img, OutputFormat::Png, EncoderQuality::default()).unwrap();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

fn watermarker(config: Config) -> Watermarker {
    Watermarker::with_fonts(config, FontLibrary::builtin())
        .with_clock(FixedClock::ymd_hm(2024, 5, 1, 14, 5))
        .with_codes(SeededCodes::new(2024))
}

fn request(dir: &TempDir, output: &str) -> WatermarkRequest {
    let input = dir.path().join("photo.png");
    write_image(&input, 1920, 1080, BACKGROUND);

    let mut request = WatermarkRequest::new(input, dir.path().join(output));
    request.fields.set_location("北京市朝阳区");
    request.fields.set_time("14:05");
    request.fields.set_date("2024年05月01日");
    request
}

// Test: The reference 1920x1080 capture is stamped in every output format
#[rstest]
#[case("stamped.png")]
#[case("stamped.jpg")]
#[case("stamped.webp")]
fn test_reference_capture_in_each_format(#[case] output: &str) {
    let dir = TempDir::new().unwrap();
    let report = watermarker(Config::default()).apply(&request(&dir, output)).unwrap();

    assert_eq!((report.width, report.height), (1920, 1080));
    assert!(!report.layout.overflow);
    assert!(report.layout.overlay.bottom <= 1080);
    assert!(report.layout.overlay.right <= 1920);

    let location = report.layout.panel(PanelKind::LocationBlock).unwrap();
    assert_eq!(location.texts.len(), 1);
    let time = report.layout.panel(PanelKind::TimeBlock).unwrap();
    assert!(time.rect.bottom <= location.rect.top);

    let stamped = decode_image(&std::fs::read(&report.output).unwrap()).unwrap();
    assert_eq!((stamped.width(), stamped.height()), (1920, 1080));
}

// Test: Pixels outside the overlay are untouched, pixels inside the card are not
#[test]
fn test_overlay_only_touches_its_band() {
    let dir = TempDir::new().unwrap();
    let report = watermarker(Config::default()).apply(&request(&dir, "out.png")).unwrap();
    let stamped = decode_image(&std::fs::read(&report.output).unwrap())
        .unwrap()
        .to_rgba8();

    let overlay = report.layout.overlay;
    assert_eq!(*stamped.get_pixel(960, (overlay.top - 1) as u32), BACKGROUND);
    assert_eq!(*stamped.get_pixel(960, 10), BACKGROUND);

    let card = report.layout.panel(PanelKind::Card).unwrap().rect;
    let probe = stamped.get_pixel((card.right - 10) as u32, (card.top + card.height() as i32 / 2) as u32);
    assert_ne!(*probe, BACKGROUND);
}

// Test: Seeded runs reproduce the same security code and layout
#[test]
fn test_seeded_runs_are_reproducible() {
    let dir = TempDir::new().unwrap();
    let a = watermarker(Config::default()).apply(&request(&dir, "a.png")).unwrap();
    let b = watermarker(Config::default()).apply(&request(&dir, "b.png")).unwrap();

    assert_eq!(a.security_code, b.security_code);
    assert_eq!(a.security_code.len(), 12);
    assert_eq!(a.layout, b.layout);
    assert_eq!(std::fs::read(&a.output).unwrap(), std::fs::read(&b.output).unwrap());
}

// Test: Configured code length and seed drive the generated code
#[test]
fn test_config_seed_and_length() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.security.length = 6;
    config.security.seed = Some(5);

    let report = Watermarker::with_fonts(config, FontLibrary::builtin())
        .apply(&request(&dir, "out.png"))
        .unwrap();
    assert_eq!(report.security_code.len(), 6);
    assert!(report
        .security_code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

// Test: Banner decorations are loaded from the asset directory
#[test]
fn test_banner_uses_asset_directory() {
    let dir = TempDir::new().unwrap();
    let assets = dir.path().join("assets");
    write_image(&assets.join("separator.png"), 8, 64, Rgba([255, 255, 255, 200]));
    write_image(&assets.join("logo.png"), 64, 32, Rgba([255, 0, 0, 255]));

    let mut config = Config::default();
    config.theme = Theme::Banner;
    config.assets.dir = Some(assets);
    config.assets.on_missing = AssetPolicy::Fail;

    let report = watermarker(config).apply(&request(&dir, "out.png")).unwrap();
    let time = report.layout.panel(PanelKind::TimeBlock).unwrap();
    assert_eq!(time.images.len(), 1);
    assert!(time.accents.is_empty());

    let brand = report.layout.panel(PanelKind::BrandBlock).unwrap();
    assert_eq!(brand.images.len(), 1);
    assert!(report.layout.geometry_problems().is_empty());
}

// Test: Missing font files fall back to the built-in face
#[test]
fn test_missing_fonts_fall_back_to_builtin() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.fonts = vec![
        PathBuf::from("/nonexistent/HYQiHei-65W.ttf"),
        dir.path().join("empty.ttf"),
    ];
    std::fs::write(dir.path().join("empty.ttf"), b"").unwrap();

    let loader = FontLoader::new();
    let stamper = Watermarker::from_config(config, &loader)
        .with_clock(FixedClock::ymd_hm(2024, 5, 1, 14, 5));
    assert!(stamper.fonts().uses_builtin());
    // One warning per file plus one for the built-in fallback
    assert_eq!(loader.warning_count(), 3);

    let report = stamper.apply(&request(&dir, "out.png")).unwrap();
    assert!(report.output.exists());
}

// Test: A missing input aborts before anything is written
#[test]
fn test_missing_input_aborts() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("never.png");
    let request = WatermarkRequest::new(dir.path().join("absent.jpg"), &output);

    let err = watermarker(Config::default()).apply(&request).unwrap_err();
    assert!(matches!(err, WatermarkError::InputNotFound(_)));
    assert!(err.to_string().contains("absent.jpg"));
    assert!(!output.exists());
}

// Test: The report layout serializes to JSON for --layout-json
#[test]
fn test_layout_report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let report = watermarker(Config::default()).apply(&request(&dir, "out.png")).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["width"], 1920);
    assert_eq!(json["layout"]["theme"], "card");
    assert_eq!(json["layout"]["orientation"], "landscape");
    assert_eq!(json["layout"]["overflow"], false);
    assert_eq!(json["security_code"], report.security_code.as_str());

    let panels = json["layout"]["panels"].as_array().unwrap();
    assert_eq!(panels.len(), report.layout.panels.len());
    assert!(panels.iter().any(|p| p["kind"] == "LocationBlock"));
}
