//! Integration tests for exporting parsed questions.

mod common;

use common::{aufgabe_document, jpeg, png, translucent_png, DocxFixture};
use qbank::selection::{pick, select};
use qbank::{
    export, parse_bytes, Error, ExportEngine, ExportFormat, ExportOptions, ImageCache,
    ImageProcessor, NoProgress, Qbank, Question, Selection,
};
use std::sync::Arc;

fn questions() -> Vec<Question> {
    parse_bytes(&aufgabe_document()).unwrap().questions
}

fn encode(questions: &[Question], options: &ExportOptions) -> Vec<u8> {
    let engine = ExportEngine::with_defaults();
    engine.encode(questions, options, &mut NoProgress).unwrap().0
}

#[test]
fn test_sequential_text_export() {
    let options = ExportOptions::new(ExportFormat::Txt).sequential();
    let text = String::from_utf8(encode(&questions(), &options)).unwrap();

    let rule = "=".repeat(50);
    assert_eq!(
        text,
        format!(
            "Aufgabe 1\nWas ist 2 + 2?\n\n{rule}\n\n\
             Aufgabe 2\nBeschreibe das Bild:\n[Image]\nImages: 1\n\n{rule}\n\n"
        )
    );
}

#[test]
fn test_original_numbering_kept() {
    let options = ExportOptions::new(ExportFormat::Txt);
    let text = String::from_utf8(encode(&questions(), &options)).unwrap();
    assert!(text.starts_with("Aufgabe 7\n"));
    assert!(text.contains("Aufgabe 12\n"));
}

#[test]
fn test_json_export_is_reproducible() {
    let options = ExportOptions::new(ExportFormat::Json).sequential();
    let first = encode(&questions(), &options);
    let second = encode(&questions(), &options);
    assert_eq!(first, second);

    let json: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(json["total_questions"], 2);
    assert_eq!(json["questions"][1]["number"], 2);
    assert_eq!(json["questions"][1]["text"], "Aufgabe 2\nBeschreibe das Bild:\n[BILD]");
    assert_eq!(json["questions"][1]["images_count"], 1);
}

#[test]
fn test_text_export_is_reproducible() {
    let options = ExportOptions::new(ExportFormat::Txt).sequential();
    assert_eq!(encode(&questions(), &options), encode(&questions(), &options));
}

#[test]
fn test_written_files_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let questions = questions();

    for format in [ExportFormat::Json, ExportFormat::Txt] {
        let options = ExportOptions::new(format).sequential();
        let first = dir.path().join(format!("first.{}", format.extension()));
        let second = dir.path().join(format!("second.{}", format.extension()));
        export(&questions, &options, &first).unwrap();
        export(&questions, &options, &second).unwrap();

        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap(),
            "{} output differs",
            format
        );
    }
}

#[test]
fn test_selection_renumbered_by_output_position() {
    let all = questions();
    let indices = select(&all, &[Selection::parse("2").unwrap()]).unwrap();
    let picked = pick(&all, &indices);

    let options = ExportOptions::new(ExportFormat::Json).sequential();
    let json: serde_json::Value = serde_json::from_slice(&encode(&picked, &options)).unwrap();
    assert_eq!(json["total_questions"], 1);
    assert_eq!(json["questions"][0]["number"], 1);
    assert!(json["questions"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Aufgabe 1\n"));
}

#[test]
fn test_every_format_written() {
    let dir = tempfile::tempdir().unwrap();
    let questions = questions();

    for format in ExportFormat::ALL {
        let dest = dir.path().join(format!("out.{}", format.extension()));
        let summary = export(&questions, &ExportOptions::new(format), &dest).unwrap();

        let written = std::fs::read(&dest).unwrap();
        assert_eq!(summary.bytes_written, written.len());
        assert_eq!(summary.questions, 2);
        assert_eq!(summary.destination.as_deref(), Some(dest.as_path()));

        match format {
            ExportFormat::Docx => assert!(qbank::detect::is_docx_bytes(&written)),
            ExportFormat::Pdf => {
                assert!(written.starts_with(b"%PDF-"));
                assert!(summary.pages >= 1);
            }
            ExportFormat::Html => assert!(written.starts_with(b"<!DOCTYPE html>")),
            ExportFormat::Json => {
                serde_json::from_slice::<serde_json::Value>(&written).unwrap();
            }
            ExportFormat::Txt => assert!(written.starts_with(b"Aufgabe 7")),
        }

        if format != ExportFormat::Txt {
            assert_eq!(summary.images_embedded, 1);
            assert_eq!(summary.images_scaled, 1);
        }
    }
}

#[test]
fn test_images_bounded_to_quarter_page() {
    let data = DocxFixture::new()
        .paragraph("---START---")
        .image(translucent_png(300, 1200), "png")
        .image(jpeg(50, 40), "jpeg")
        .paragraph("---END---")
        .build();
    let questions = parse_bytes(&data).unwrap().questions;

    let json: serde_json::Value = serde_json::from_slice(&encode(
        &questions,
        &ExportOptions::new(ExportFormat::Json),
    ))
    .unwrap();

    use base64::Engine as _;
    let decode = |i: usize| {
        let data = base64::engine::general_purpose::STANDARD
            .decode(json["questions"][0]["images"][i]["data"].as_str().unwrap())
            .unwrap();
        image::load_from_memory_with_format(&data, image::ImageFormat::Png).unwrap()
    };
    let scaled = decode(0);
    assert_eq!((scaled.width(), scaled.height()), (70, 280));
    let small = decode(1);
    assert_eq!((small.width(), small.height()), (50, 40));
}

#[test]
fn test_docx_export_reparses() {
    let data = DocxFixture::new()
        .block(&["Aufgabe 3", "Text"])
        .build();
    let questions = parse_bytes(&data).unwrap().questions;

    // an exported sheet has no delimiters, so its text survives as plain paragraphs
    let docx = encode(&questions, &ExportOptions::new(ExportFormat::Docx));
    let parser = qbank::DocxParser::from_bytes(&docx).unwrap();
    let texts: Vec<String> = parser.paragraphs().iter().map(|p| p.plain_text()).collect();
    assert_eq!(texts, vec!["Aufgabe 3", "Text"]);
    assert_eq!(parser.parse().question_count(), 0);
}

#[test]
fn test_images_disabled_everywhere() {
    let questions = questions();
    for format in [ExportFormat::Docx, ExportFormat::Pdf, ExportFormat::Html, ExportFormat::Json] {
        let options = ExportOptions::new(format).with_images(false);
        let engine = ExportEngine::with_defaults();
        let (_, summary) = engine.encode(&questions, &options, &mut NoProgress).unwrap();
        assert_eq!(summary.images_embedded, 0, "{}", format);
        assert_eq!(summary.images_omitted, 1, "{}", format);
    }
}

#[test]
fn test_shared_cache_across_formats() {
    let cache = Arc::new(ImageCache::new());
    let processor = ImageProcessor::with_cache(Arc::clone(&cache));
    let engine = ExportEngine::with_defaults().with_processor(processor);
    let questions = questions();

    let options = ExportOptions::new(ExportFormat::Html);
    engine.encode(&questions, &options, &mut NoProgress).unwrap();
    let after_first = cache.len();
    assert!(after_first > 0);

    // JSON asks for the same PNG rendition at the same bounds
    engine
        .encode(&questions, &options.clone().with_format(ExportFormat::Json), &mut NoProgress)
        .unwrap();
    assert_eq!(cache.len(), after_first);
}

#[test]
fn test_builder_export() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("auswahl.txt");

    let result = Qbank::new()
        .sequential_numbering()
        .with_cache()
        .parse_bytes(&aufgabe_document())
        .unwrap();
    let picked = result.select(&[Selection::parse("2").unwrap()]).unwrap();
    let summary = result.export(&picked, ExportFormat::Txt, &dest).unwrap();

    assert_eq!(summary.questions, 1);
    let text = std::fs::read_to_string(&dest).unwrap();
    assert!(text.starts_with("Aufgabe 1\nBeschreibe das Bild:\n[Image]\nImages: 1\n"));
}

#[test]
fn test_empty_selection_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("leer.pdf");
    let result = export(&[], &ExportOptions::new(ExportFormat::Pdf), &dest);
    assert!(matches!(result, Err(Error::NothingToExport)));
    assert!(!dest.exists());
}

#[test]
fn test_unwritable_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("missing").join("out.txt");
    let result = export(&questions(), &ExportOptions::new(ExportFormat::Txt), &dest);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_many_questions_paginate() {
    let mut fixture = DocxFixture::new();
    for i in 1..=30 {
        let heading = format!("Aufgabe {}", i);
        fixture = fixture.block(&[heading.as_str(), "Erste Zeile", "Zweite Zeile"]);
    }
    fixture = fixture
        .paragraph("---START---")
        .image(png(200, 200), "png")
        .paragraph("---END---");
    let questions = parse_bytes(&fixture.build()).unwrap().questions;
    assert_eq!(questions.len(), 31);

    let engine = ExportEngine::with_defaults();
    let (bytes, summary) = engine
        .encode(&questions, &ExportOptions::new(ExportFormat::Pdf), &mut NoProgress)
        .unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert!(summary.pages > 1);
    assert_eq!(doc.get_pages().len(), summary.pages);
}
