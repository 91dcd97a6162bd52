//! The encoded images in a bundle are cropped to the padded content box

use base64::Engine as _;
use report_capture::export::{ExportFormat, Exporter, JsonFileGenerator, ReportBundle};
use report_capture::metrics::NoMetrics;
use report_capture::notify::NoopNotifier;
use report_capture::{CaptureConfig, RenderSurface, ReportCategory, SceneSurface};

const SCENE: &str = r##"{
    "active": null,
    "charts": [
        {
            "category": "inventory",
            "id": "rack-fill",
            "layout": {"x": 0, "y": 0, "width": 400, "height": 300},
            "paint": [
                {"op": "fill", "rgba": [255, 255, 255, 255]},
                {"op": "solid_rect", "x": 100, "y": 75, "width": 200, "height": 150, "rgba": [20, 60, 140, 255]}
            ]
        },
        {
            "category": "inventory",
            "id": "svg-only",
            "layout": {"x": 0, "y": 420, "width": 200, "height": 100},
            "svg": "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"400\" height=\"300\"><rect x=\"100\" y=\"100\" width=\"200\" height=\"100\" fill=\"#8c2d04\"/></svg>"
        }
    ]
}"##;

fn decode(data_url: &str) -> image::DynamicImage {
    let b64 = data_url.strip_prefix("data:image/jpeg;base64,").expect("jpeg data url");
    let bytes = base64::engine::general_purpose::STANDARD.decode(b64).expect("base64");
    image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).expect("jpeg")
}

#[tokio::test]
async fn bundle_images_are_trimmed() {
    let config = CaptureConfig::from_json(
        r#"{"categories": ["inventory"], "category_settle_ms": 0, "chart_settle_ms": 0}"#,
    )
    .unwrap();
    let exporter = Exporter::new(config).unwrap();
    let mut surface = SceneSurface::from_json(SCENE).unwrap();

    let bytes = exporter
        .run(&mut surface, &NoMetrics, &JsonFileGenerator, &NoopNotifier, ExportFormat::Json)
        .await
        .unwrap();
    let bundle: ReportBundle = serde_json::from_slice(&bytes).unwrap();

    let inventory = bundle.get(ReportCategory::Inventory).unwrap();
    assert!(inventory.metrics.is_none());
    assert_eq!(inventory.images.len(), 2);

    // 200x150 content, padded by 10 / 7 px per side
    let painted = decode(&inventory.images[0].image);
    assert_eq!((painted.width(), painted.height()), (220, 164));

    // Floored to 400x300, SVG drawn 1:1, 200x100 content padded by 10 / 5 px
    let vector = decode(&inventory.images[1].image);
    assert_eq!((vector.width(), vector.height()), (220, 110));

    assert_eq!(surface.active_category(), None);
}
