use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use comment_lda::{
    CorpusOutcome, CorpusReport, DirectoryProvider, DirectorySink, JiebaTokenizer, Orchestrator,
    RegexTokenizer, RunConfig, StopwordSet, Tokenizer,
};

#[derive(Parser, Debug)]
#[command(version, about = "Train LDA topic models over comment corpora", long_about = None)]
struct Args {
    #[clap(short, long, help = "JSON run configuration; flags below override it")]
    config: Option<PathBuf>,
    #[clap(short, long, help = "Directory holding one <prefix>*.txt file per corpus")]
    input_dir: Option<PathBuf>,
    #[clap(short, long, help = "Directory receiving one result folder per corpus")]
    output_dir: Option<PathBuf>,
    #[clap(short, long, help = "Stopword file, one word per line")]
    stopwords: Option<PathBuf>,
    #[clap(long, help = "Only corpus files whose name starts with this are processed")]
    prefix: Option<String>,
    #[clap(short = 'k', long)]
    topics: Option<usize>,
    #[clap(short = 'n', long)]
    iterations: Option<usize>,
    #[clap(long)]
    alpha: Option<f64>,
    #[clap(long)]
    beta: Option<f64>,
    #[clap(long, help = "Keywords listed per topic")]
    top_n: Option<usize>,
    #[clap(long)]
    seed: Option<u64>,
    #[clap(short, long, help = "Corpora trained in parallel (default: available cores)")]
    threads: Option<usize>,
    #[clap(long, help = "Run exactly --iterations sweeps regardless of corpus size")]
    fixed_iterations: bool,
    #[clap(long, help = "Rows are already space-separated words; skip jieba segmentation")]
    presegmented: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(path) = self.stopwords {
            config.stopwords = path;
        }
        if let Some(prefix) = self.prefix {
            config.corpus_prefix = prefix;
        }
        if let Some(k) = self.topics {
            config.num_topics = k;
        }
        if let Some(n) = self.iterations {
            config.iterations = n;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.beta = beta;
        }
        if let Some(n) = self.top_n {
            config.top_n = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.fixed_iterations {
            config.adaptive_iterations = false;
        }
        if self.presegmented {
            config.presegmented = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let config = Args::parse().into_config()?;
    println!("Input: {}", config.input_dir.display());

    let stopwords = StopwordSet::load(&config.stopwords)
        .with_context(|| format!("reading stopwords from {}", config.stopwords.display()))?;
    let provider = DirectoryProvider::new(&config.input_dir, config.corpus_prefix.as_str());
    let tokenizer: Box<dyn Tokenizer> = if config.presegmented {
        Box::new(RegexTokenizer::new())
    } else {
        Box::new(JiebaTokenizer::new())
    };
    let sink = DirectorySink::new(&config.output_dir);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("Interrupted, stopping after the current sweep...");
        flag.store(true, Ordering::Relaxed);
    }) {
        log::warn!("cannot install interrupt handler: {}", e);
    }

    let reports = Orchestrator::new(&config, &provider, &*tokenizer, &stopwords, &sink, &cancel)
        .run()
        .context("running corpora")?;

    if reports.is_empty() {
        eprintln!(
            "No corpora matching {}*.txt in {}",
            config.corpus_prefix,
            config.input_dir.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    print_reports(&reports);
    println!("All corpora processed. Results in {}", config.output_dir.display());
    Ok(ExitCode::SUCCESS)
}

fn print_reports(reports: &[CorpusReport]) {
    println!(
        "{:<24} {:<10} {:>8} {:>8} {:>8} {:>9}",
        "corpus", "status", "docs", "words", "sweeps", "entropy"
    );
    for report in reports {
        match &report.outcome {
            CorpusOutcome::Completed(summary) => println!(
                "{:<24} {:<10} {:>8} {:>8} {:>8} {:>9.3}",
                report.corpus,
                "done",
                summary.docs_count,
                summary.words_count,
                summary.iterations,
                summary.final_entropy
            ),
            CorpusOutcome::Skipped(reason) => {
                println!("{:<24} {:<10} {}", report.corpus, "skipped", reason)
            }
            CorpusOutcome::Failed(error) => {
                println!("{:<24} {:<10} {}", report.corpus, "failed", error)
            }
            CorpusOutcome::Cancelled => println!("{:<24} {:<10}", report.corpus, "cancelled"),
        }
    }
}
