//! Classify subcommand - run the parse pipeline over fetched documents on disk

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Args;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use newsline_core::{
    ItemOutput, Progress, RotationPolicy, SegmentSink, StatusRecord, WorkItem, cleanup_tmp_files,
    keys,
};
use newsline_parse::{DocumentKind, ParsePipeline};

use super::{metadata_from, parse_meta, table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Fetched documents (paths or glob patterns)
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// URL the document was fetched from (single input only; default: file:// URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Content type reported by the server
    #[arg(long)]
    pub content_type: Option<String>,

    /// Metadata carried by the item (repeatable)
    #[arg(short, long = "meta", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,

    /// Write status records as JSON lines into this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Expand glob patterns, keeping first-seen order and dropping duplicates
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = FxHashSet::default();
    let mut paths = Vec::new();
    for input in inputs {
        if has_glob_chars(input) {
            let matches: Vec<PathBuf> = glob::glob(input)
                .with_context(|| format!("Invalid glob pattern: {input}"))?
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                log::warn!("No files match {input}");
            }
            for path in matches {
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        } else {
            let path = PathBuf::from(input);
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }
    Ok(paths)
}

fn file_url(path: &Path) -> Result<String> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    url::Url::from_file_path(&abs)
        .map(String::from)
        .map_err(|()| anyhow::anyhow!("Cannot express {} as a URL", abs.display()))
}

struct Classified {
    path: PathBuf,
    kind: DocumentKind,
    records: Vec<StatusRecord>,
}

fn classify_file(
    pipeline: &ParsePipeline,
    path: &Path,
    url: Option<&str>,
    args: &ClassifyArgs,
) -> Result<Classified> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let url = match url {
        Some(url) => url.to_string(),
        None => file_url(path)?,
    };

    let mut metadata = metadata_from(&args.meta);
    if let Some(ct) = &args.content_type {
        metadata.set_value(keys::CONTENT_TYPE, ct.as_str());
    }

    let output = pipeline.process(WorkItem::new(url, content, metadata));
    let kind = DocumentKind::of(&output);
    let records = match output {
        ItemOutput::PassThrough(_) => Vec::new(),
        terminal => terminal.into_records(),
    };
    Ok(Classified {
        path: path.to_path_buf(),
        kind,
        records,
    })
}

pub fn run(args: ClassifyArgs, config: &Config, progress: &Progress) -> Result<()> {
    let start = Instant::now();
    let paths = expand_inputs(&args.inputs)?;
    if paths.is_empty() {
        bail!("No input files");
    }
    if args.url.is_some() && paths.len() > 1 {
        bail!("--url applies to a single input, got {}", paths.len());
    }

    let pipeline = ParsePipeline::from_config(
        &config.sitemap,
        &config.feed,
        &config.outlinks,
        &config.filters,
    )
    .context("Invalid pipeline configuration")?;

    let workers = args.workers.unwrap_or(config.workers.default).max(1);
    log::info!("Classifying {} documents with {} workers", paths.len(), workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to create thread pool")?;

    let pb = progress.items_bar("classify", paths.len() as u64);
    let failed = AtomicUsize::new(0);
    let url = args.url.as_deref();

    let results: Vec<Classified> = pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| {
                let result = classify_file(&pipeline, path, url, &args);
                pb.inc(1);
                match result {
                    Ok(classified) => {
                        log::debug!("{}: {}", classified.path.display(), classified.kind);
                        Some(classified)
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        log::error!("{e:#}");
                        None
                    }
                }
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut by_kind: BTreeMap<DocumentKind, (usize, usize)> = BTreeMap::new();
    for c in &results {
        let entry = by_kind.entry(c.kind).or_default();
        entry.0 += 1;
        entry.1 += c.records.len().saturating_sub(1);
    }

    if let Some(dir) = &args.output_dir {
        write_records(dir, config, &results)?;
    }

    let mut summary = table(&["Kind", "Documents", "Discovered links"]);
    for (kind, (docs, links)) in &by_kind {
        summary.add_row(vec![kind.to_string(), docs.to_string(), links.to_string()]);
    }
    let failed = failed.load(Ordering::Relaxed);
    if failed > 0 {
        summary.add_row(vec!["unreadable".to_string(), failed.to_string(), "-".to_string()]);
    }
    eprintln!("\n{summary}");
    log::info!("Time: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Status records go through one sink in input order
fn write_records(dir: &Path, config: &Config, results: &[Classified]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    cleanup_tmp_files(dir)?;

    let policy = RotationPolicy::from_config(&config.rotation);
    let mut sink = SegmentSink::new(dir, "status", policy)
        .with_context(|| format!("Failed to open output in {}", dir.display()))?;
    for c in results {
        sink.write_all(&c.records)
            .with_context(|| format!("Failed to write records of {}", c.path.display()))?;
    }
    let segments = sink.finish()?;
    for segment in &segments {
        log::debug!("Segment {}", segment.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsline_core::Status;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://news.example.org/a.xml</loc></sitemap>
  <sitemap><loc>https://news.example.org/b.xml</loc></sitemap>
</sitemapindex>"#;

    fn args(inputs: Vec<String>) -> ClassifyArgs {
        ClassifyArgs {
            inputs,
            url: None,
            content_type: None,
            meta: Vec::new(),
            output_dir: None,
            workers: Some(1),
        }
    }

    #[test]
    fn globs_expand_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.xml", "b.xml", "c.txt"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let pattern = dir.path().join("*.xml").display().to_string();
        let explicit = dir.path().join("a.xml").display().to_string();

        let paths = expand_inputs(&[pattern, explicit]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.extension().is_some_and(|e| e == "xml")));
    }

    #[test]
    fn index_file_resolves_children() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.xml");
        std::fs::write(&path, INDEX).unwrap();

        let mut config = Config::default();
        config.sitemap.sniff_content = true;
        let pipeline = ParsePipeline::from_config(
            &config.sitemap,
            &config.feed,
            &config.outlinks,
            &config.filters,
        )
        .unwrap();

        let a = args(vec![path.display().to_string()]);
        let c = classify_file(&pipeline, &path, Some("https://news.example.org/index.xml"), &a)
            .unwrap();
        assert_eq!(c.kind, DocumentKind::SitemapIndex);
        assert_eq!(c.records.len(), 3);
        assert_eq!(c.records[0].status, Status::Discovered);
        assert_eq!(c.records[2].url, "https://news.example.org/index.xml");
    }

    #[test]
    fn run_writes_status_segments() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("index.xml");
        std::fs::write(&input, INDEX).unwrap();
        let out = dir.path().join("out");

        let mut a = args(vec![input.display().to_string()]);
        a.url = Some("https://news.example.org/index.xml".into());
        a.meta = vec![("isSitemapIndex".into(), "true".into())];
        a.output_dir = Some(out.clone());

        run(a, &Config::default(), &Progress::new()).unwrap();

        let segment = out.join("status-00000.jsonl");
        let lines = std::fs::read_to_string(segment).unwrap();
        assert_eq!(lines.lines().count(), 3);
    }

    #[test]
    fn url_requires_single_input() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.xml", "b.xml"] {
            std::fs::write(dir.path().join(name), INDEX).unwrap();
        }
        let mut a = args(vec![dir.path().join("*.xml").display().to_string()]);
        a.url = Some("https://news.example.org/index.xml".into());
        assert!(run(a, &Config::default(), &Progress::new()).is_err());
    }
}
