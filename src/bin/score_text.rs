use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use doc_resonance_lib::models::DocumentType;
use doc_resonance_lib::services::config_store::ConfigStore;
use doc_resonance_lib::services::structure::{ranked_segments, DocumentAnalyzer};
use serde::Serialize;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

const DEFAULT_TOP: usize = 10;

fn parse_document_type(args: &[String]) -> Result<Option<DocumentType>> {
    parse_arg_value(args, "--type")
        .map(|t| {
            t.parse::<DocumentType>()
                .with_context(|| format!("invalid --type value: {}", t))
        })
        .transpose()
}

fn parse_top(args: &[String]) -> Result<usize> {
    match parse_arg_value(args, "--top") {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid --top value: {}", raw)),
        None => Ok(DEFAULT_TOP),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1].starts_with("--") {
        eprintln!(
            "Usage:\n  score_text <path.txt> [--type <document_type>] [--config <dir>] [--top <n>] [--out <json_path>]\n\nNotes:\n  - Form feeds split pages, blank lines split paragraphs.\n  - Without --type the document type is detected from the layout.\n  - DOCRES_DISABLE_FILE_LOG=1 keeps logs on the console only."
        );
        return Ok(());
    }

    doc_resonance_lib::init_logging();

    let path = args[1].clone();
    let document_type = parse_document_type(&args)?;
    let top_n = parse_top(&args)?;
    let out_path = parse_arg_value(&args, "--out");

    let config_dir = match parse_arg_value(&args, "--config") {
        Some(dir) => PathBuf::from(dir),
        None => ConfigStore::default_config_dir()
            .ok_or_else(|| anyhow!("no config directory available; pass --config <dir>"))?,
    };
    let mut config = ConfigStore::new(config_dir).load()?;
    config.apply_env_overrides();

    let text = std::fs::read_to_string(&path).with_context(|| format!("read file failed: {}", path))?;

    let analyzer = Arc::new(DocumentAnalyzer::new(config)?);
    let report = analyzer
        .analyze_batch(vec![text.clone()], document_type)
        .await
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("analysis produced no report"))??;

    println!("File: {}", path);
    println!("Input: {} chars ({} bytes)", text.chars().count(), text.len());
    println!(
        "Document type: {}{}",
        report.document_type,
        if document_type.is_some() { " (given)" } else { " (detected)" }
    );
    println!("Segments: {}", report.segments.len());
    println!(
        "Validation: {} ({} errors, {} warnings)",
        if report.validation.valid { "ok" } else { "FAILED" },
        report.validation.errors.len(),
        report.validation.warnings.len()
    );
    for e in &report.validation.errors {
        println!("  error: {}", e);
    }
    for w in &report.validation.warnings {
        println!("  warning: {}", w);
    }
    println!(
        "Scores: avg={:.3} max={:.3} avg_resonance={:.3} headers={}",
        report.statistics.avg_structural_score,
        report.statistics.max_structural_score,
        report.statistics.avg_resonance,
        report.statistics.header_count
    );
    println!();

    let ranked = ranked_segments(&report, top_n);
    println!("Top {} segments:", ranked.len());
    for (rank, s) in ranked.iter().enumerate() {
        println!(
            "[R{:02}] score={:.3} resonance={:.3} {:<17} pos=[{},{}]  {}",
            rank + 1,
            s.structural_score(),
            s.resonance_intensity,
            s.block_type.as_str(),
            s.position,
            s.end_position,
            preview(&s.content, 100)
        );
    }
    if report.segments.len() > ranked.len() {
        println!("... ({} more segments)", report.segments.len() - ranked.len());
    }

    if let Some(out_path) = out_path {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output<'a> {
            file: &'a str,
            input_chars: usize,
            report: &'a doc_resonance_lib::models::AnalysisReport,
        }

        let out = Output {
            file: &path,
            input_chars: text.chars().count(),
            report: &report,
        };

        let json = serde_json::to_string_pretty(&out)?;
        std::fs::write(&out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
