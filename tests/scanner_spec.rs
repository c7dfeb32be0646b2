use dsl_reader::{ArticleDom, DslEncoding, DslError, DslScanner, LineFeed, headword, language};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_path(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    for part in parts {
        p.push(part);
    }
    p
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap_or_else(|e| panic!("failed to write {}: {}", path.display(), e));
    path
}

fn utf16(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    let units = bom.then_some(0xFEFF).into_iter().chain(text.encode_utf16());
    for unit in units {
        if big_endian {
            bytes.extend_from_slice(&unit.to_be_bytes());
        } else {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }
    bytes
}

fn read_all(scanner: &mut DslScanner) -> Vec<(String, u64)> {
    scanner
        .lines(false)
        .map(|line| line.expect("line ok"))
        .map(|line| (line.text, line.offset))
        .collect()
}

fn sample_path() -> PathBuf {
    fixture_path(&["tests", "fixtures", "sample.dsl"])
}

fn byte_position(path: &Path, needle: &str) -> u64 {
    let content = fs::read_to_string(path).expect("read fixture");
    content
        .find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in {}", needle, path.display())) as u64
}

#[test]
fn header_is_parsed_and_scanning_resumes_at_first_article() {
    let path = sample_path();
    let mut scanner = DslScanner::open(&path).expect("open sample");

    assert_eq!(scanner.dictionary_name(), "My Dict");
    assert_eq!(scanner.lang_from(), "English");
    assert_eq!(scanner.lang_to(), "Russian");
    assert_eq!(scanner.sound_dictionary(), Some("My Sounds"));
    assert_eq!(scanner.header().lang_from_id(), language::code_to_id("en"));
    assert_eq!(scanner.header().lang_to_id(), language::code_to_id("ru"));
    assert_eq!(scanner.encoding(), DslEncoding::Utf8);
    assert_eq!(scanner.line_feed(), LineFeed::Lf);

    let first = scanner.read_next_line(false).expect("read").expect("first article line");
    assert_eq!(first.text, "cat", "header lines must not be returned again");
    assert_eq!(first.offset, byte_position(&path, "cat\n"));
    assert_eq!(scanner.lines_read(), 5);
}

#[test]
fn all_lines_are_returned_then_end_then_misuse_is_reported() {
    let path = sample_path();
    let mut scanner = DslScanner::open(&path).expect("open sample");

    let mut texts = Vec::new();
    while let Some(line) = scanner.read_next_line(false).expect("read") {
        texts.push(line.text);
    }
    assert_eq!(
        texts,
        vec![
            "cat",
            "\t[m1][p]n[/p] an animal{{ a comment }}",
            "\t[m1][ex]~ food[/ex][/m]",
            "dog(s)",
            "\t[m1]a {{multi",
            "line}} pet[/m]",
        ]
    );
    assert!(matches!(scanner.read_next_line(false), Err(DslError::ReadPastEnd)));
}

#[test]
fn comments_are_stripped_across_physical_lines() {
    let path = sample_path();
    let mut scanner = DslScanner::open(&path).expect("open sample");

    let mut lines = Vec::new();
    while let Some(line) = scanner.read_next_line_without_comments(false).expect("read") {
        lines.push(line);
    }

    let texts: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "cat",
            "\t[m1][p]n[/p] an animal",
            "\t[m1][ex]~ food[/ex][/m]",
            "dog(s)",
            "\t[m1]a  pet[/m]",
        ]
    );
    assert_eq!(
        lines[4].offset,
        byte_position(&path, "\t[m1]a {{multi"),
        "joined line reports the offset of its first physical line"
    );
    assert!(matches!(
        scanner.read_next_line_without_comments(false),
        Err(DslError::ReadPastEnd)
    ));
}

#[test]
fn sample_articles_flow_into_the_parser() {
    let mut scanner = DslScanner::open(sample_path()).expect("open sample");
    let lines: Vec<String> = scanner
        .lines(true)
        .map(|line| line.expect("line ok").text)
        .collect();

    assert_eq!(headword::expand_optional_parts(&lines[3]), vec!["dog", "dogs"]);

    let body = ArticleDom::parse(lines[1].trim_start(), "My Dict", "cat");
    assert_eq!(body.render_as_text(false), "n an animal");

    let example = headword::expand_tildes(lines[2].trim_start(), &lines[0]);
    let example = ArticleDom::parse(&example, "My Dict", "cat");
    assert_eq!(example.render_as_text(false), "cat food");
}

#[test]
fn utf16le_with_bom_counts_two_bytes_per_character() {
    let dir = TempDir::new().expect("temp dir");
    let header = "#NAME \"Wide\"\r\n#INDEX_LANGUAGE \"German\"\r\n";
    let content = format!("{}Haus\r\n\t[trn]house[/trn]\r\n", header);
    let path = write_fixture(&dir, "wide.dsl", &utf16(&content, false, true));

    let mut scanner = DslScanner::open(&path).expect("open utf-16le");
    assert_eq!(scanner.encoding(), DslEncoding::Utf16Le);
    assert_eq!(scanner.dictionary_name(), "Wide");
    assert_eq!(scanner.header().lang_from_id(), language::code_to_id("de"));
    assert_eq!(scanner.distance_to_bytes(3), 6);

    let lines = read_all(&mut scanner);
    assert_eq!(scanner.line_feed(), LineFeed::CrLf);
    assert_eq!(lines[0].0, "Haus", "CR must be stripped");
    assert_eq!(lines[1].0, "\t[trn]house[/trn]");

    let header_units = header.encode_utf16().count();
    assert_eq!(lines[0].1, 2 + scanner.distance_to_bytes(header_units) as u64);
    assert_eq!(
        lines[1].1 - lines[0].1,
        scanner.distance_to_bytes("Haus".chars().count()) as u64
            + LineFeed::CrLf.byte_len(scanner.encoding()) as u64
    );
}

#[test]
fn utf16be_is_detected_without_bom() {
    let dir = TempDir::new().expect("temp dir");
    let content = "#NAME \"Big\"\nWort\n\tword\n";
    let path = write_fixture(&dir, "big.dsl", &utf16(content, true, false));

    let mut scanner = DslScanner::open(&path).expect("open utf-16be");
    assert_eq!(scanner.encoding(), DslEncoding::Utf16Be);
    assert_eq!(scanner.dictionary_name(), "Big");

    let lines = read_all(&mut scanner);
    assert_eq!(lines, vec![("Wort".to_string(), 24), ("\tword".to_string(), 34)]);
}

#[test]
fn declared_code_page_selects_single_byte_decoding() {
    let dir = TempDir::new().expect("temp dir");
    let bytes = b"#NAME \"\xD0\xF3\xF1\xF1\xEA\xE8\xE9\"\n#SOURCE_CODE_PAGE \"Cyrillic\"\n\xEA\xEE\xF2\n\t\xF2\xE5\xF1\xF2\n";
    let path = write_fixture(&dir, "cyrillic.dsl", bytes);

    let mut scanner = DslScanner::open(&path).expect("open cyrillic");
    assert!(matches!(scanner.encoding(), DslEncoding::SingleByte(dsl_reader::CodePage::Cyrillic)));
    assert_eq!(scanner.dictionary_name(), "Русский");

    let lines = read_all(&mut scanner);
    assert_eq!(lines[0].0, "кот");
    assert_eq!(lines[1].0, "\tтест");
    assert_eq!(scanner.distance_to_bytes(3), 3);
}

#[test]
fn unknown_code_page_is_fatal() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(&dir, "klingon.dsl", b"#NAME \"X\"\n#SOURCE_CODE_PAGE \"Klingon\"\nword\n");

    match DslScanner::open(&path) {
        Err(DslError::UnknownCodePage(name)) => assert_eq!(name, "Klingon"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("unknown code page must abort opening"),
    }
}

#[test]
fn code_page_in_unicode_file_is_ignored() {
    let dir = TempDir::new().expect("temp dir");
    let content = "#SOURCE_CODE_PAGE \"Klingon\"\nword\n";
    let path = write_fixture(&dir, "bom.dsl", &utf16(content, false, true));

    let mut scanner = DslScanner::open(&path).expect("code page is ignored when a BOM is present");
    assert_eq!(scanner.encoding(), DslEncoding::Utf16Le);
    assert_eq!(read_all(&mut scanner)[0].0, "word");
}

#[test]
fn invalid_bytes_are_a_per_line_error_distinct_from_end_of_stream() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(&dir, "broken.dsl", b"#NAME \"X\"\ngood\n\xFF\xFEbad\nafter\n");

    let mut scanner = DslScanner::open(&path).expect("open");
    assert_eq!(scanner.read_next_line(false).expect("read").expect("line").text, "good");
    match scanner.read_next_line(false) {
        Err(DslError::Decoding { line, encoding }) => {
            assert_eq!(line, 3);
            assert_eq!(encoding, "UTF-8");
        }
        other => panic!("expected a decoding error, got {:?}", other),
    }
    assert_eq!(
        scanner.read_next_line(false).expect("read").expect("line").text,
        "after",
        "reading continues after a decoding error"
    );
    assert!(scanner.read_next_line(false).expect("read").is_none());
}

#[test]
fn compressed_files_report_offsets_in_decompressed_stream() {
    let dir = TempDir::new().expect("temp dir");
    let content = fs::read(sample_path()).expect("read sample");
    let path = dir.path().join("sample.dsl.dz");
    let mut encoder = GzEncoder::new(fs::File::create(&path).expect("create"), Compression::default());
    encoder.write_all(&content).expect("compress");
    encoder.finish().expect("finish gzip");

    let mut compressed = DslScanner::open(&path).expect("open compressed");
    let mut plain = DslScanner::open(sample_path()).expect("open plain");
    assert_eq!(compressed.dictionary_name(), "My Dict");
    assert_eq!(read_all(&mut compressed), read_all(&mut plain));
}

#[test]
fn open_time_failures_are_typed() {
    let dir = TempDir::new().expect("temp dir");

    let missing = dir.path().join("missing.dsl");
    assert!(matches!(DslScanner::open(&missing), Err(DslError::CantOpen { .. })));

    let empty = write_fixture(&dir, "empty.dsl", b"");
    assert!(matches!(DslScanner::open(&empty), Err(DslError::Malformed(_))));

    let header_only = write_fixture(&dir, "header.dsl", b"#NAME \"X\"\n");
    assert!(matches!(DslScanner::open(&header_only), Err(DslError::Malformed(_))));

    let broken_bom = write_fixture(&dir, "bom.dsl", b"\xEF\xBB#NAME \"X\"\nword\n");
    assert!(matches!(DslScanner::open(&broken_bom), Err(DslError::Malformed(_))));
}

#[test]
fn malformed_header_directive_is_skipped() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(
        &dir,
        "directive.dsl",
        b"#NAME My Dict\n#SOME_FUTURE_THING \"x\"\n#INDEX_LANGUAGE \"English\"\nword\n",
    );

    let mut scanner = DslScanner::open(&path).expect("malformed header lines are recoverable");
    assert_eq!(scanner.dictionary_name(), "");
    assert_eq!(scanner.lang_from(), "English");
    assert_eq!(read_all(&mut scanner)[0].0, "word");
}

#[test]
fn headword_only_reads_decode_first_token_of_body_lines() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(&dir, "heads.dsl", b"#NAME \"X\"\ncat food\n\tfirst second third\nnext\n");

    let mut scanner = DslScanner::open(&path).expect("open");
    let head = scanner.read_next_line(true).expect("read").expect("line");
    assert_eq!(head.text, "cat food");
    let body = scanner.read_next_line(true).expect("read").expect("line");
    assert_eq!(body.text, "\tfirst");
    let next = scanner.read_next_line(true).expect("read").expect("line");
    assert_eq!(next.text, "next", "stream advances past the whole body line");
    assert_eq!(next.offset, body.offset + "\tfirst second third\n".len() as u64);
}

#[test]
fn long_and_unterminated_lines_are_read_whole() {
    let dir = TempDir::new().expect("temp dir");
    let long = "a".repeat(200_000);
    let content = format!("#NAME \"X\"\n{}\n\tlast", long);
    let path = write_fixture(&dir, "long.dsl", content.as_bytes());

    let mut scanner = DslScanner::open(&path).expect("open");
    let lines = read_all(&mut scanner);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0.len(), long.len());
    assert_eq!(lines[1], ("\tlast".to_string(), 10 + long.len() as u64 + 1));
}

#[test]
fn user_encoding_overrides_detection() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(&dir, "nohead.dsl", b"\xEA\xEE\xF2\n\t\xF2\xE5\xF1\xF2\n");

    let mut detected = DslScanner::open(&path).expect("open");
    assert!(matches!(detected.read_next_line(false), Err(DslError::Decoding { line: 1, .. })));

    let mut overridden = DslScanner::open_with_encoding(&path, Some("cyrillic")).expect("open with override");
    let lines = read_all(&mut overridden);
    assert_eq!(lines[0].0, "кот");
    assert_eq!(lines[1].0, "\tтест");
}

#[test]
fn scanner_can_be_moved_to_another_thread() {
    let scanner = DslScanner::open(sample_path()).expect("open sample");
    let handle = std::thread::spawn(move || {
        let mut scanner = scanner;
        read_all(&mut scanner).len()
    });
    assert_eq!(handle.join().expect("thread"), 6);
}

#[test]
fn decoding_error_inside_comment_keeps_comment_open() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(
        &dir,
        "comment.dsl",
        b"#NAME \"X\"\nword\n\ta {{x\n\t\xFF\xFE bad\n\ty}} b\nnext\n",
    );

    let mut scanner = DslScanner::open(&path).expect("open");
    assert_eq!(
        scanner.read_next_line_without_comments(false).expect("read").expect("line").text,
        "word"
    );
    assert!(matches!(
        scanner.read_next_line_without_comments(false),
        Err(DslError::Decoding { line: 4, .. })
    ));

    let resumed = scanner.read_next_line_without_comments(false).expect("read").expect("line");
    assert_eq!(resumed.text, "\ta  b", "comment tail must not leak into the article text");
    assert_eq!(resumed.offset, "#NAME \"X\"\nword\n".len() as u64);

    assert_eq!(
        scanner.read_next_line_without_comments(false).expect("read").expect("line").text,
        "next"
    );
    assert!(scanner.read_next_line_without_comments(false).expect("read").is_none());
}

#[test]
fn comment_open_at_end_of_stream_returns_collected_text() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_fixture(&dir, "open.dsl", b"#NAME \"X\"\nword\n\tkept {{never\n\tclosed");

    let mut scanner = DslScanner::open(&path).expect("open");
    let lines: Vec<String> = scanner.lines(true).map(|line| line.expect("line ok").text).collect();
    assert_eq!(lines, vec!["word", "\tkept "]);
    assert!(matches!(
        scanner.read_next_line_without_comments(false),
        Err(DslError::ReadPastEnd)
    ));
}
