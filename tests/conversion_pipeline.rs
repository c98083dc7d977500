use std::fs;

use serde_json::json;

use oscem_converter::conversion::{convert, ConversionOptions, Diagnostic};
use oscem_converter::document::load_document_from_path;
use oscem_converter::mapping::{load_mapping_from_path, MappingTable};
use oscem_converter::pipeline::{run_conversion, ConversionRequest, MappingSource, PipelineOptions};
use oscem_converter::ConversionError;

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn embedded_mapping_converts_xml_export() {
    let dir = tempfile::tempdir().unwrap();
    let opts = PipelineOptions {
        output_name: Some("xml_session".to_string()),
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };

    let report = run_conversion("tests/fixtures/xml_metadata.json", &opts).unwrap();
    assert_eq!(report.output_path, dir.path().join("xml_session.json"));
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.stats.array_elements, 2);

    let um = |v: f64| json!({"value": v, "unit": "um"});
    assert_eq!(
        read_json(&report.output_path),
        json!({
            "instrument": {
                "microscope": "TITAN52336320",
                "acceleration_voltage": {"value": 300.0, "unit": "kV"},
                "energy_filter": {
                    "used": true,
                    "width": {"value": 20.0, "unit": "eV"}
                }
            },
            "acquisition": {
                "nominal_magnification": 105000,
                "spot_size": 7,
                "binning_camera": 1.0,
                "pixel_size": {"value": 0.83, "unit": "A"},
                "exposure_time": {"value": 1.5, "unit": "s"},
                "nominal_defocus": um(-2.0),
                "tilt_angle": {"value": 10.0, "unit": "degree"},
                "date_time": "2024-03-01T10:15:00Z",
                "software": {"name": "Velox", "version": "3.9"},
                "stage_position": [
                    {"value": um(12.5)},
                    {"value": um(-2.0)},
                    {"value": um(0.1)}
                ],
                "detectors": [
                    {
                        "name": "BM-Falcon",
                        "mode": "Linear",
                        "pixel_size_x": um(14.0),
                        "pixel_size_y": um(14.0),
                        "dimensions_x": 4096,
                        "dimensions_y": 4096
                    },
                    {"name": "EF-CCD"}
                ]
            }
        })
    );
}

#[test]
fn mdoc_keys_take_priority_over_xml_keys() {
    let table = MappingTable::embedded().unwrap();
    let input = load_document_from_path("tests/fixtures/mdoc_metadata.json").unwrap();
    let output = convert(&table, &input, &ConversionOptions::default());

    assert_eq!(
        output.to_json(),
        json!({
            "instrument": {
                "acceleration_voltage": {"value": 300.0, "unit": "kV"},
                "energy_filter": {"used": false}
            },
            "acquisition": {
                "nominal_magnification": 81000,
                "exposure_time": {"value": 2.5, "unit": "s"},
                "tilt_angle": {"value": -30.0, "unit": "degree"},
                "frames_per_movie": 0,
                "camera_length": {"value": 175.0, "unit": "mm"},
                "date_time": "01-Mar-24 10:15:00",
                "stage_position": [
                    {"value": {"value": 12.5, "unit": "um"}},
                    {"value": {"value": -3.25, "unit": "um"}}
                ]
            }
        })
    );
}

#[test]
fn simplified_mapping_with_constants() {
    let dir = tempfile::tempdir().unwrap();
    let request = ConversionRequest {
        input: "tests/fixtures/simple_input.json".into(),
        options: PipelineOptions {
            mapping: MappingSource::Path("tests/fixtures/simple_mapping.csv".into()),
            output_name: Some("simple.json".to_string()),
            output_dir: Some(dir.path().to_path_buf()),
            conversion: ConversionOptions {
                cs: Some("2.7".to_string()),
                gain_flip_rotate: Some("flipx".to_string()),
            },
            ..Default::default()
        },
    };

    let report = request.run().unwrap();
    assert_eq!(report.output_path, dir.path().join("simple.json"));
    assert_eq!(
        read_json(&report.output_path),
        json!({
            "instrument": {
                "microscope": "Krios G4",
                "cs": {"value": 2.7, "unit": "mm"}
            },
            "acquisition": {
                "exposure_time": {"value": 3.5, "unit": "s"},
                "dose": {"value": 0.0, "unit": "e/A^2"},
                "frames": 40,
                "counting": true,
                "gainref_flip_rotate": "flipx",
                "detectors": [
                    {"name": "Falcon 4i"},
                    {"name": "K3", "gain": 1.25}
                ]
            }
        })
    );

    assert_eq!(report.diagnostics.len(), 1);
    assert!(matches!(
        &report.diagnostics[0],
        Diagnostic::UnitConversionFailed { target, error }
            if target == "acquisition.dose" && error.raw == "not measured"
    ));
}

#[test]
fn output_file_is_pretty_printed() {
    let dir = tempfile::tempdir().unwrap();
    let opts = PipelineOptions {
        mapping: MappingSource::Path("tests/fixtures/simple_mapping.csv".into()),
        output_name: Some("pretty".to_string()),
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let report = run_conversion("tests/fixtures/simple_input.json", &opts).unwrap();
    let text = fs::read_to_string(report.output_path).unwrap();
    assert!(text.starts_with("{\n  \"acquisition\": {\n    \"counting\": true,"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn input_without_mapped_keys_writes_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.json");
    fs::write(&input, r#"{"Nothing": "mapped"}"#).unwrap();

    let opts = PipelineOptions {
        output_name: Some("empty_out".to_string()),
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let report = run_conversion(&input, &opts).unwrap();
    assert!(report.document.is_empty());
    assert_eq!(fs::read_to_string(report.output_path).unwrap(), "{}\n");
}

#[test]
fn fatal_errors_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let opts = PipelineOptions {
        mapping: MappingSource::Path("tests/fixtures/missing_column_mapping.csv".into()),
        output_name: Some("never".to_string()),
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let err = run_conversion("tests/fixtures/simple_input.json", &opts).unwrap_err();
    assert!(matches!(err, ConversionError::MissingColumn { ref column, .. } if column == "crunch"));
    assert!(!dir.path().join("never.json").exists());

    let opts = PipelineOptions {
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let err = run_conversion("tests/fixtures/array_input.json", &opts).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidInput { .. }));
}

#[test]
fn custom_table_matches_loaded_rules() {
    let table = load_mapping_from_path("tests/fixtures/simple_mapping.csv").unwrap();
    assert_eq!(table.rules.len(), 8);
    assert_eq!(table.skipped, 2);
}
