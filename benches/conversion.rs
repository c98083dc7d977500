use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oscem_converter::conversion::{convert, ConversionOptions};
use oscem_converter::mapping::MappingTable;
use oscem_converter::types::FlatDocument;

fn input_with_detectors(detectors: usize) -> FlatDocument {
    let mut doc = FlatDocument::new();
    doc.insert("MicroscopeImage.microscopeData.gun.AccelerationVoltage".into(), "300000".into());
    doc.insert("Magnification".into(), "105000".into());
    doc.insert("ExposureTime".into(), "1.5".into());
    doc.insert("StagePosition.X".into(), "12.5".into());
    doc.insert("StagePosition.Y".into(), "-3.0".into());
    for i in 0..detectors {
        doc.insert(format!("Detectors.Detector-{i}.DetectorName"), format!("det-{i}"));
        doc.insert(format!("Detectors.Detector-{i}.Mode"), "Counting".into());
        doc.insert(format!("Detectors.Detector-{i}.PixelSize.x"), "1.4e-05".into());
        doc.insert(format!("Detectors.Detector-{i}.ReadoutArea.width"), "4096".into());
    }
    for i in 0..500 {
        doc.insert(format!("Unmapped.Key{i}"), i.to_string());
    }
    doc
}

fn bench_convert(c: &mut Criterion) {
    let Ok(table) = MappingTable::embedded() else {
        return;
    };
    let options = ConversionOptions {
        cs: Some("2.7".into()),
        gain_flip_rotate: None,
    };

    for detectors in [2usize, 64] {
        let input = input_with_detectors(detectors);
        c.bench_function(&format!("convert_embedded_{detectors}_detectors"), |b| {
            b.iter(|| convert(black_box(&table), black_box(&input), &options))
        });
    }
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
