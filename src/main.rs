use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dsl_reader::{ArticleDom, DslError, DslScanner, headword};

/// Dump the header and articles of a DSL dictionary source.
#[derive(Debug, Parser)]
#[command(name = "dsl-dump", version)]
struct Args {
    /// Path to a .dsl or .dsl.dz file
    path: PathBuf,

    /// Encoding override (utf-8, utf-16le, utf-16be, latin, cyrillic, easterneuropean)
    #[arg(long)]
    encoding: Option<String>,

    /// Remove {{...}} comments before parsing
    #[arg(long)]
    strip_comments: bool,

    /// Print headwords only, skipping article bodies
    #[arg(long)]
    headwords_only: bool,

    /// Stop after this many articles
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    println!("Reading DSL file: {}", args.path.display());
    println!("{}", "=".repeat(60));

    match dump(&args) {
        Ok(articles) => {
            println!("\n{}", "=".repeat(60));
            println!("SUCCESS! {} article(s) read.", articles);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nERROR: Failed to read DSL file");
            eprintln!("  {}", e);
            ExitCode::FAILURE
        }
    }
}

fn dump(args: &Args) -> dsl_reader::Result<usize> {
    let mut scanner = DslScanner::open_with_encoding(&args.path, args.encoding.as_deref())?;

    let header = scanner.header().clone();
    println!("\nDictionary Information:");
    println!("  Name: {}", header.dictionary_name);
    println!("  From: {} (id {})", header.lang_from, header.lang_from_id());
    println!("  To: {} (id {})", header.lang_to, header.lang_to_id());
    println!("  Encoding: {}", scanner.encoding().name());
    if let Some(sounds) = &header.sound_dictionary {
        println!("  Sound dictionary: {}", sounds);
    }

    let mut articles = 0;
    let mut current_headword = String::new();

    loop {
        let line = if args.strip_comments {
            scanner.read_next_line_without_comments(args.headwords_only)
        } else {
            scanner.read_next_line(args.headwords_only)
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e @ DslError::Decoding { .. }) => {
                eprintln!("  skipping line: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if line.text.trim().is_empty() {
            continue;
        }

        if line.text.starts_with([' ', '\t']) {
            if !args.headwords_only {
                let dom = ArticleDom::parse(line.text.trim_start(), &header.dictionary_name, &current_headword);
                println!("    {}", dom.render_as_text(false));
            }
            continue;
        }

        if args.limit.is_some_and(|limit| articles >= limit) {
            break;
        }
        articles += 1;

        let stripped = headword::process_unsorted_parts(&line.text, true);
        let variants: Vec<String> = headword::expand_optional_parts(&stripped)
            .iter()
            .map(|variant| headword::unescape_dsl(&headword::normalize_headword(variant)))
            .collect();
        current_headword = variants.first().cloned().unwrap_or_default();
        println!("\n[{:#x}] {}", line.offset, variants.join(" | "));
    }

    Ok(articles)
}
