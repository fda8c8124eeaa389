use retail_report::config::ReportConfig;
use retail_report::error::ReportError;
use retail_report::fetch::BasicClient;
use retail_report::output::discover_pages;
use retail_report::pipeline;
use printpdf::lopdf::{Document, content::Content};
use retail_report::report::assemble_dir;
use std::fs;
use std::path::Path;

const STORES: &str = "\
License Number,Entity Name,DBA Name,County,Square Footage
1,FRESH FOODS INC,FRESH FOODS,Albany,100
2,FRESH FOODS INC,FRESH FOODS 2,Albany,200
3,CORNER MART LLC,CORNER MART,Albany,0
4,CORNER MART LLC,CORNER MART,Bronx,300
5,HARBOR DELI,HARBOR DELI,Westchester,0
6,BIG CHAIN CORP,BIG CHAIN,Bronx,\"12,500\"
7,BIG CHAIN CORP,BIG CHAIN,Kings,
";

const FIPS: &str = "\
County Name,County FIPS
Albany,36001
Bronx,36005
Westchester,36119
";

const COUNTIES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "id": "36001",
      "geometry": { "type": "Polygon",
        "coordinates": [[[-74.3, 42.4], [-73.7, 42.4], [-73.7, 42.8], [-74.3, 42.8], [-74.3, 42.4]]] } },
    { "type": "Feature", "id": "36005",
      "geometry": { "type": "Polygon",
        "coordinates": [[[-73.9, 40.8], [-73.8, 40.8], [-73.8, 40.9], [-73.9, 40.9], [-73.9, 40.8]]] } },
    { "type": "Feature", "id": "36119",
      "geometry": { "type": "Polygon",
        "coordinates": [[[-73.9, 41.0], [-73.5, 41.0], [-73.5, 41.4], [-73.9, 41.4], [-73.9, 41.0]]] } },
    { "type": "Feature", "id": "34003",
      "geometry": { "type": "Polygon",
        "coordinates": [[[-74.2, 40.8], [-73.9, 40.8], [-73.9, 41.1], [-74.2, 40.8]]] } }
  ]
}"#;

/// Writes the fixture sources under `root` and returns a config pointing at them.
fn setup(root: &Path, stores: &str) -> ReportConfig {
    let data = root.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("stores.csv"), stores).unwrap();
    fs::write(data.join("fips.csv"), FIPS).unwrap();
    fs::write(data.join("counties.json"), COUNTIES).unwrap();

    let json = serde_json::json!({
        "report_name": "retail_report.pdf",
        "viz": {
            "template": "plotly_white",
            "colours": "Blues",
            "margin": { "t": 40, "b": 20, "l": 20, "r": 20 }
        },
        "sources": {
            "stores": data.join("stores.csv"),
            "fips": data.join("fips.csv")
        },
        "map": { "geometry": data.join("counties.json"), "state_fips": 36 },
        "output": {
            "pages_dir": root.join("output"),
            "report_dir": root.join("report")
        }
    });
    let path = root.join("config.json");
    fs::write(&path, json.to_string()).unwrap();
    ReportConfig::load(&path).unwrap()
}

fn page_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// The text shown on each page of the PDF at `path`, in page order.
fn pdf_text(path: &Path) -> Vec<Vec<String>> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page| {
            let content = Content::decode(&doc.get_page_content(page).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| op.operands.first()?.as_str().ok())
                .map(|bytes| Document::decode_text(Some("WinAnsiEncoding"), bytes))
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), STORES);
    let client = BasicClient::new();

    let report = pipeline::run(&client, &config).await.unwrap();

    assert_eq!(report.path, dir.path().join("report").join("retail_report.pdf"));
    assert!(fs::read(&report.path).unwrap().starts_with(b"%PDF"));
    assert_eq!(
        page_names(&dir.path().join("output")),
        vec!["fig_01.svg", "fig_02.svg", "fig_03.svg"]
    );

    let county_page = fs::read_to_string(dir.path().join("output").join("fig_02.svg")).unwrap();
    assert!(county_page.contains("6,400"), "Bronx mean of 300 and 12,500");

    let text = pdf_text(&report.path);
    assert_eq!(text.len(), 3);
    assert!(text[0].iter().any(|t| t == "Average Retail Square Footage By County Map"));
    assert!(text[1].iter().any(|t| t.contains("6,400")));
    assert!(text[2].iter().any(|t| t == "Store Count By Entity"));
}

#[tokio::test]
async fn test_rerun_is_byte_identical_and_clears_stale_pages() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), STORES);
    let client = BasicClient::new();
    let pages_dir = dir.path().join("output");

    pipeline::run(&client, &config).await.unwrap();
    let first_pdf = fs::read(config.report_path()).unwrap();
    let first: Vec<Vec<u8>> = discover_pages(&pages_dir)
        .unwrap()
        .iter()
        .map(|p| fs::read(&p.path).unwrap())
        .collect();

    fs::write(pages_dir.join("fig_09.svg"), "<svg/>").unwrap();
    fs::write(pages_dir.join("keep.txt"), "unrelated").unwrap();

    pipeline::run(&client, &config).await.unwrap();
    let second_pdf = fs::read(config.report_path()).unwrap();
    let second: Vec<Vec<u8>> = discover_pages(&pages_dir)
        .unwrap()
        .iter()
        .map(|p| fs::read(&p.path).unwrap())
        .collect();

    assert_eq!(first, second);
    assert!(first_pdf == second_pdf, "report bytes differ between runs");
    assert_eq!(
        page_names(&pages_dir),
        vec!["fig_01.svg", "fig_02.svg", "fig_03.svg", "keep.txt"]
    );
}

#[tokio::test]
async fn test_schema_mismatch_aborts_without_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), "Entity Name,DBA Name\nFOO,FOO\n");
    let client = BasicClient::new();

    let err = pipeline::run(&client, &config).await.unwrap_err();
    match err {
        ReportError::SchemaMismatch { missing, .. } => {
            assert_eq!(missing, vec!["County".to_string(), "Square Footage".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
    assert!(!config.report_path().exists());
}

#[tokio::test]
async fn test_missing_source_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), STORES);
    config.sources.fips = dir.path().join("absent.csv").display().to_string();
    let client = BasicClient::new();

    let err = pipeline::run(&client, &config).await.unwrap_err();
    assert!(matches!(err, ReportError::SourceUnavailable { .. }));
    assert_eq!(err.stage(), "load");
    assert!(!config.report_path().exists());
}

#[tokio::test]
async fn test_unknown_template_fails_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), STORES);
    config.viz.template = "neon".to_string();
    config.sources.stores = dir.path().join("absent.csv").display().to_string();
    let client = BasicClient::new();

    let err = pipeline::run(&client, &config).await.unwrap_err();
    assert!(matches!(err, ReportError::Render { .. }));
}

#[tokio::test]
async fn test_reassemble_from_existing_pages() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), STORES);
    let client = BasicClient::new();
    pipeline::run(&client, &config).await.unwrap();
    fs::remove_file(config.report_path()).unwrap();

    let report = assemble_dir(
        &config.output.pages_dir,
        &config.report_name,
        &config.report_path(),
    )
    .unwrap();

    let ordinals: Vec<_> = report.pages.iter().map(|p| p.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);
    assert!(config.report_path().exists());
}
