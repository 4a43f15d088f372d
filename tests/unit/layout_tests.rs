// Layout planner tests through the public API

use proofstamp::watermark::fields::{CaptureFields, FixedClock};
use proofstamp::watermark::{
    compose, Decorations, DrawCommand, FontLibrary, LayoutPlanner, LayoutResult, LayoutStyle,
    Orientation, Palette, PanelKind, ResolvedFields, SeededCodes, TextDefaults, Theme,
};
use rstest::rstest;

fn resolved(location: &str) -> ResolvedFields {
    let mut fields = CaptureFields::new();
    fields.set_location(location);
    fields.set_time("14:05");
    fields.set_date("2024年05月01日");
    fields.set_weather("晴");
    fields.set_temperature("26℃");
    fields.resolve(
        &FixedClock::ymd_hm(2024, 5, 1, 14, 5),
        &mut SeededCodes::new(11),
        &TextDefaults::default(),
        12,
    )
}

fn plan(theme: Theme, width: u32, height: u32, location: &str) -> LayoutResult {
    let style = LayoutStyle::default();
    let palette = Palette::default();
    let text = TextDefaults::default();
    LayoutPlanner::new(theme, &style, &palette, &text).plan(
        &FontLibrary::builtin(),
        width,
        height,
        &resolved(location),
        &Decorations::none(),
    )
}

// Test: Every common camera size produces a valid layout in both themes
#[rstest]
#[case(1920, 1080)]
#[case(1080, 1920)]
#[case(4000, 3000)]
#[case(3000, 4000)]
#[case(1280, 1280)]
#[case(2400, 1080)]
fn test_common_sizes_produce_valid_layouts(
    #[case] width: u32,
    #[case] height: u32,
    #[values(Theme::Card, Theme::Banner)] theme: Theme,
) {
    let layout = plan(theme, width, height, "北京市朝阳区");

    assert!(!layout.overflow, "{}x{} {:?} overflowed", width, height, theme);
    let problems = layout.geometry_problems();
    assert!(problems.is_empty(), "{}x{} {:?}: {:?}", width, height, theme, problems);

    let expected = if width >= height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    };
    assert_eq!(layout.orientation, expected);

    let band = LayoutStyle::default().overlay_height;
    let ratio = layout.overlay.height() as f32 / height as f32;
    assert!(ratio <= band.max + 0.001, "overlay ratio {} above band", ratio);
}

// Test: Card width follows the orientation bands
#[rstest]
#[case(1080, 1920, 0.75, 0.90)]
#[case(1920, 1080, 0.33, 0.40)]
fn test_card_width_band(#[case] width: u32, #[case] height: u32, #[case] min: f32, #[case] max: f32) {
    let layout = plan(Theme::Card, width, height, "北京市朝阳区");
    let card = layout.panel(PanelKind::Card).unwrap();
    let ratio = card.rect.width() as f32 / width as f32;
    assert!(ratio >= min && ratio <= max, "card ratio {} outside [{}, {}]", ratio, min, max);
}

// Test: Planning is a pure function of its inputs
#[test]
fn test_plan_is_deterministic_across_calls() {
    for theme in [Theme::Card, Theme::Banner] {
        let a = plan(theme, 2048, 1536, "浙江省杭州市西湖区龙井路");
        let b = plan(theme, 2048, 1536, "浙江省杭州市西湖区龙井路");
        assert_eq!(a, b);
        assert_eq!(compose(&a), compose(&b));
    }
}

// Test: A very long location shrinks and wraps instead of escaping the card column
#[test]
fn test_long_location_degrades_gracefully() {
    let location = "新疆维吾尔自治区乌鲁木齐市天山区人民路与解放北路交叉口东北角国际大巴扎二号门停车场入口处";
    let layout = plan(Theme::Card, 1920, 1080, location);

    let card = layout.panel(PanelKind::Card).unwrap();
    let block = layout.panel(PanelKind::LocationBlock).unwrap();
    assert!(block.texts.len() >= 2);
    for run in &block.texts {
        assert!(run.ink.right <= card.rect.right);
        assert!(run.ink.bottom <= 1080);
    }
    let shown: String = block
        .texts
        .iter()
        .flat_map(|run| run.segments.iter().map(|s| s.text.as_str()))
        .collect();
    assert_eq!(shown, location);
}

// Test: Banner body shows the conditions line under the date
#[test]
fn test_banner_conditions_line() {
    let layout = plan(Theme::Banner, 1920, 1080, "北京市朝阳区");
    let date = layout.panel(PanelKind::DateBlock).unwrap();
    let lines: Vec<String> = date
        .texts
        .iter()
        .map(|run| run.segments.iter().map(|s| s.text.as_str()).collect())
        .collect();
    assert_eq!(lines, vec!["2024年05月01日".to_string(), "星期三 晴 26℃".to_string()]);
}

// Test: Composed commands stay inside the overlay raster
#[test]
fn test_composed_fills_lie_within_overlay() {
    let layout = plan(Theme::Card, 1920, 1080, "北京市朝阳区");
    let (w, h) = (layout.overlay.width() as i32, layout.overlay.height() as i32);

    let commands = compose(&layout);
    assert!(commands.iter().any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "14:05")));
    for command in &commands {
        match command {
            DrawCommand::FillRect { rect, .. } | DrawCommand::FillRoundedRect { rect, .. } => {
                assert!(rect.left >= 0 && rect.top >= 0 && rect.right <= w && rect.bottom <= h);
            }
            DrawCommand::FillPolygon { points, .. } => {
                assert!(points.iter().all(|p| p.x >= 0 && p.y >= 0 && p.x <= w && p.y <= h));
            }
            _ => {}
        }
    }
}

// Test: Degenerate images never panic and keep everything in bounds
#[rstest]
#[case(1, 1)]
#[case(12, 900)]
#[case(900, 12)]
#[case(64, 48)]
fn test_degenerate_sizes_stay_in_bounds(#[case] width: u32, #[case] height: u32) {
    let layout = plan(Theme::Banner, width, height, "北京市朝阳区");
    let image = layout.dimensions();
    assert!(layout.overlay.within(&image));
    for panel in &layout.panels {
        assert!(panel.rect.within(&image), "{:?} escapes {}x{}", panel.kind, width, height);
    }
}
