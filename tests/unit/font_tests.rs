// Outline font tests against the bundled DejaVu Sans fixture
//
// The built-in block face is exercised everywhere else; these run the
// measuring, wrapping, fitting and planning paths through a real TrueType
// face loaded from disk.

use std::path::PathBuf;

use proofstamp::codec::{encode_image, EncoderQuality, OutputFormat};
use proofstamp::config::Config;
use proofstamp::watermark::fields::{CaptureFields, FixedClock};
use proofstamp::watermark::text_renderer::{FamilyRef, FontRole};
use proofstamp::watermark::{
    fit, wrap, Decorations, FitRequest, FontLibrary, FontLoader, FontSpec, LayoutPlanner,
    LayoutStyle, Orientation, Palette, PanelKind, ResolvedFields, SeededCodes, ShrinkPolicy,
    TextDefaults, TextMeasurer, Theme, WatermarkRequest, Watermarker,
};
use rstest::rstest;
use tempfile::TempDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSans.ttf")
}

fn fixture_fonts() -> FontLibrary {
    let loader = FontLoader::new();
    let fonts = loader.load_library(&[fixture_path()], &[]);
    assert!(!fonts.uses_builtin(), "fixture font failed to load");
    assert_eq!(loader.warning_count(), 0);
    fonts
}

fn display(size: u32) -> FontSpec {
    FontSpec::new(FamilyRef::DISPLAY, FontRole::Location, size)
}

fn resolved(location: &str) -> ResolvedFields {
    let mut fields = CaptureFields::new();
    fields.set_location(location);
    fields.set_time("14:05");
    fields.set_date("2024-05-01");
    fields.resolve(
        &FixedClock::ymd_hm(2024, 5, 1, 14, 5),
        &mut SeededCodes::new(11),
        &TextDefaults::default(),
        12,
    )
}

// Test: Brand and display families share the fixture face when no brand chain is given
#[test]
fn test_library_loads_outline_face() {
    let fonts = fixture_fonts();
    assert!(!fonts.face(FamilyRef::DISPLAY).is_builtin());
    assert!(!fonts.face(FamilyRef::BRAND).is_builtin());

    let small = fonts.measure(&display(20), "Chaoyang");
    let large = fonts.measure(&display(40), "Chaoyang");
    assert!(small.has_ink());
    assert!(large.width > small.width && large.height > small.height);
}

// Test: Every wrapped line fits the budget unless it is a single character
#[rstest]
#[case("Chaoyang District, Beijing, People's Republic of China", 120)]
#[case("Jianguomenwai Avenue 1 Building 3 Floor 27 East Entrance", 90)]
#[case("Beijing\nChaoyang\r\nSanlitun Road 19", 80)]
#[case("WWWWWWWWWW", 10)]
fn test_wrapped_lines_fit_budget(#[case] text: &str, #[case] max_width: u32) {
    let fonts = fixture_fonts();
    let font = display(24);
    let lines = wrap(&fonts, text, &font, max_width);

    assert!(!lines.is_empty());
    for line in &lines {
        let width = fonts.measure(&font, line).width;
        assert!(
            width <= max_width || line.chars().count() == 1,
            "line '{}' is {} px, budget {}",
            line,
            width,
            max_width
        );
    }

    let expected: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    assert_eq!(lines.concat(), expected);
}

// Test: Fitted sizes stay between the minimum and the preferred size
#[rstest]
#[case("Chaoyang District, Beijing", 400, 60)]
#[case("Chaoyang District, Beijing", 150, 60)]
#[case("Chaoyang District, Beijing", 20, 60)]
#[case("14:05", 300, 30)]
fn test_fit_respects_size_bounds(
    #[case] text: &str,
    #[case] max_width: u32,
    #[case] max_height: u32,
    #[values(ShrinkPolicy::default(), ShrinkPolicy::linear())] policy: ShrinkPolicy,
) {
    let fonts = fixture_fonts();
    let request = FitRequest::single_line(display(48), 10, max_width, max_height);
    let outcome = fit(&fonts, text, &request, policy);

    assert!(outcome.font.size >= 10 && outcome.font.size <= 48);
    if outcome.overflow {
        assert_eq!(outcome.font.size, 10);
    } else {
        assert!(outcome.block.width() <= max_width);
        assert!(outcome.block.height() <= max_height);
    }
}

// Test: Text that already fits keeps its preferred size
#[test]
fn test_fit_keeps_preferred_size_when_it_fits() {
    let fonts = fixture_fonts();
    let request = FitRequest::single_line(display(32), 10, 2000, 500);
    let outcome = fit(&fonts, "Chaoyang", &request, ShrinkPolicy::default());
    assert_eq!(outcome.font.size, 32);
    assert_eq!(outcome.iterations, 1);
    assert!(!outcome.overflow);
}

// Test: Reference capture sizes lay out cleanly with a real font
#[rstest]
#[case(1920, 1080, Orientation::Landscape)]
#[case(1080, 1920, Orientation::Portrait)]
fn test_reference_sizes_with_outline_font(
    #[case] width: u32,
    #[case] height: u32,
    #[case] orientation: Orientation,
    #[values(Theme::Card, Theme::Banner)] theme: Theme,
) {
    let fonts = fixture_fonts();
    let style = LayoutStyle::default();
    let palette = Palette::default();
    let text = TextDefaults::default();
    let layout = LayoutPlanner::new(theme, &style, &palette, &text).plan(
        &fonts,
        width,
        height,
        &resolved("Chaoyang, Beijing"),
        &Decorations::none(),
    );

    assert_eq!(layout.orientation, orientation);
    assert!(!layout.overflow, "{}x{} {:?} overflowed", width, height, theme);
    let problems = layout.geometry_problems();
    assert!(problems.is_empty(), "{}x{} {:?}: {:?}", width, height, theme, problems);

    let location = layout.panel(PanelKind::LocationBlock).unwrap();
    assert_eq!(location.texts.len(), 1);
    let time = layout.panel(PanelKind::TimeBlock).unwrap();
    assert!(time.texts[0].ink.bottom <= location.texts[0].ink.top);
}

// Test: The pipeline stamps a capture with fonts loaded from configuration
#[test]
fn test_pipeline_with_configured_font() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("photo.png");
    let photo = image::RgbaImage::from_pixel(1920, 1080, image::Rgba([30, 60, 90, 255]));
    let bytes = encode_image(&photo, OutputFormat::Png, EncoderQuality::default()).unwrap();
    std::fs::write(&input, bytes).unwrap();

    let mut config = Config::default();
    config.fonts = vec![fixture_path()];
    let loader = FontLoader::new();
    let stamper = Watermarker::from_config(config, &loader)
        .with_clock(FixedClock::ymd_hm(2024, 5, 1, 14, 5))
        .with_codes(SeededCodes::new(2024));
    assert!(!stamper.fonts().uses_builtin());

    let mut request = WatermarkRequest::new(&input, dir.path().join("out.png"));
    request.fields.set_location("Chaoyang, Beijing");
    let report = stamper.apply(&request).unwrap();

    assert!(report.output.exists());
    assert!(!report.layout.overflow);
    assert!(report.layout.geometry_problems().is_empty());
}
