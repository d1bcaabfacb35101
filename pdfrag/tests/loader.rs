use std::fs;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use pdfrag::{
    chunk_pages, pages_from_texts, scan_files, Config, Document, DocumentLoader, LoadError,
    PdfLoader,
};

/// Builds an uncompressed PDF with one line of Courier text per page.
fn build_pdf(page_texts: &[&str]) -> lopdf::Document {
    let mut pdf = lopdf::Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = pdf.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    pdf
}

fn to_bytes(mut pdf: lopdf::Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes).expect("save pdf");
    bytes
}

#[test]
fn two_page_pdf_loads_and_chunks_by_page() {
    let bytes = to_bytes(build_pdf(&["Alpha conceptA.", "Beta conceptB."]));
    let pages = PdfLoader
        .load(&Document::new("report.pdf", bytes))
        .expect("load two-page pdf");

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 1);
    assert_eq!(pages[1].page_number, 2);
    assert!(pages[0].text.contains("Alpha conceptA."));
    assert!(pages[1].text.contains("Beta conceptB."));
    assert!(pages.iter().all(|p| p.source == "report.pdf"));

    let chunks = chunk_pages(&pages, 20, 5);
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| c.source == "report.pdf"));
    let alpha = chunks
        .iter()
        .find(|c| c.text.contains("Alpha"))
        .expect("chunk for page one");
    assert_eq!(alpha.page_number, 1);
    let beta = chunks
        .iter()
        .find(|c| c.text.contains("Beta"))
        .expect("chunk for page two");
    assert_eq!(beta.page_number, 2);
}

#[test]
fn page_text_mentioning_encrypt_key_still_loads() {
    let bytes = to_bytes(build_pdf(&["(See /Encrypt key)"]));
    let pages = PdfLoader
        .load(&Document::new("manual.pdf", bytes))
        .expect("plain pdf must load");
    assert_eq!(pages.len(), 1);
    assert!(pages[0].text.contains("Encrypt"));
}

#[test]
fn pdf_with_encrypt_trailer_entry_is_rejected() {
    let mut pdf = build_pdf(&["Secret text."]);
    let encrypt_id = pdf.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    pdf.trailer.set("Encrypt", encrypt_id);
    pdf.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![1u8; 16]),
            Object::string_literal(vec![1u8; 16]),
        ],
    );
    let err = PdfLoader
        .load(&Document::new("locked.pdf", to_bytes(pdf)))
        .expect_err("encrypted PDF must fail");
    assert!(matches!(err, LoadError::Encrypted { ref filename } if filename == "locked.pdf"));
}

#[test]
fn non_pdf_bytes_are_rejected() {
    let doc = Document::new("notes.txt", b"just some text".to_vec());
    let err = PdfLoader.load(&doc).expect_err("plain text is not a PDF");
    assert!(matches!(err, LoadError::NotPdf { ref filename } if filename == "notes.txt"));
}

#[test]
fn unparseable_pdf_with_encrypt_trailer_is_rejected() {
    let bytes = b"%PDF-1.7\ntrailer\n<< /Root 1 0 R /Encrypt 5 0 R >>\n%%EOF\n".to_vec();
    let err = PdfLoader
        .load(&Document::new("locked.pdf", bytes))
        .expect_err("encrypted PDF must fail");
    assert!(matches!(err, LoadError::Encrypted { .. }));
}

#[test]
fn corrupt_pdfs_fail_without_panicking() {
    let bytes = b"%PDF-1.4\nthis is not really a pdf body\n".to_vec();
    let err = PdfLoader
        .load(&Document::new("corrupt.pdf", bytes))
        .expect_err("corrupt PDF must fail");
    assert!(matches!(err, LoadError::Unreadable { ref filename, .. } if filename == "corrupt.pdf"));
    assert!(err.to_string().starts_with("corrupt.pdf"));
}

#[test]
fn pages_are_numbered_from_one_and_keep_blank_pages() {
    let pages = pages_from_texts(
        "scan.pdf",
        vec!["cover".to_string(), String::new(), "body".to_string()],
    );
    let numbers: Vec<usize> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(pages[1].text.is_empty());
    assert!(pages.iter().all(|p| p.source == "scan.pdf"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Document::from_path(&dir.path().join("missing.pdf")).expect_err("missing file");
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn scan_finds_pdfs_in_path_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(root.join("a.pdf"), b"%PDF-a").expect("write a");
    fs::write(root.join("B.PDF"), b"%PDF-b").expect("write B");
    fs::write(root.join("notes.txt"), b"text").expect("write notes");
    fs::write(root.join("huge.pdf"), vec![b'x'; 4096]).expect("write huge");
    fs::create_dir_all(root.join("sub")).expect("mkdir sub");
    fs::write(root.join("sub").join("c.pdf"), b"%PDF-c").expect("write c");
    fs::create_dir_all(root.join("target")).expect("mkdir target");
    fs::write(root.join("target").join("d.pdf"), b"%PDF-d").expect("write d");

    let cfg = Config {
        max_file_bytes: 1024,
        ..Config::default()
    };
    let docs = scan_files(&cfg, root.to_str());
    let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, vec!["B.PDF", "a.pdf", "c.pdf"]);
    assert_eq!(docs[1].bytes, b"%PDF-a".to_vec());
}
