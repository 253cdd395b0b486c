//! Invest: INVEST evaluator CLI for Agile user stories

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use invest::analyzer::{Evaluation, EvaluationRequest, StoryEvaluator};
use invest::config::{
    build_ignore_set, default_config_json, is_ignored, load_config, Config, CONFIG_FILENAME,
};
use invest::gate::{ChallengeGate, RateLimiter};
use invest::reporter::{ConsoleReporter, JsonReporter};
use invest::suggestions::{is_ai_available, offer_apply, AiAdvisor, StoryPromptGenerator};
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

/// Invest: INVEST quality evaluator for Agile user stories
#[derive(Parser, Debug)]
#[command(name = "invest")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Story file, directory of story files, or "-" for stdin
    #[arg(required_unless_present = "story")]
    path: Option<PathBuf>,

    /// Evaluate this story text directly
    #[arg(long, short, conflicts_with = "path")]
    story: Option<String>,

    /// Output format as JSON
    #[arg(long, short)]
    json: bool,

    /// Minimum overall percentage; a batch compares its average (exit 1 if below)
    #[arg(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,

    /// Quiet mode (one line per story)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output (structural signals, debug logging)
    #[arg(long, short)]
    verbose: bool,

    /// Request AI critique and an improved story (needs the `ai` feature and an API key)
    #[arg(long)]
    ai: bool,

    /// With --ai on a single file: offer to replace it with the improved story
    #[arg(long, requires = "ai")]
    apply: bool,

    /// Print the AI improvement prompt instead of calling the API
    #[arg(long)]
    prompt: bool,

    /// Path to config file (default: search .investrc.json in current dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluate files in parallel (default for directories with many files)
    #[arg(long)]
    parallel: bool,

    /// Number of parallel threads (default: number of CPU cores)
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run MCP server for Claude/Cursor (stdio JSON-RPC)
    Mcp {
        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create .investrc.json with sensible defaults
    Init {
        /// Minimum overall percentage (e.g. 60)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Evaluate the built-in sample stories
    Demo,

    /// Evaluate stories typed one per line on stdin
    Repl {
        /// Ask an arithmetic question before each evaluation
        #[arg(long)]
        challenge: bool,

        /// Request AI commentary for each story
        #[arg(long)]
        ai: bool,

        /// Identity used for rate limiting
        #[arg(long, value_name = "NAME")]
        identity: Option<String>,

        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

const DEMO_STORIES: [(&str, &str); 4] = [
    (
        "Good User Story",
        "As a customer, I want to view my order history so that I can track my purchases",
    ),
    ("Poor User Story", "Add login feature"),
    (
        "Complex Story",
        "As a product manager, I want to see comprehensive analytics dashboard with real-time data visualization, user behavior tracking, conversion metrics, A/B testing results, and automated reporting so that I can make data-driven decisions and optimize our product strategy",
    ),
    (
        "Story with Acceptance Criteria",
        "As a user, I want to reset my password so that I can regain access to my account. Given I am on the login page, when I click 'Forgot Password', then I should receive an email with reset instructions.",
    ),
];

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "invest=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(cmd) = args.command {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        return match cmd {
            Commands::Mcp { config } => {
                let config = load_config(&cwd, config.as_deref())?;
                invest::mcp::run_mcp_server(&config).map(|_| ExitCode::SUCCESS)
            }
            Commands::Init { threshold, dir } => run_init(threshold, dir.as_deref()),
            Commands::Demo => run_demo(),
            Commands::Repl {
                challenge,
                ai,
                identity,
                config,
            } => {
                let config = load_config(&cwd, config.as_deref())?.merge_with_cli(None, ai);
                let challenge = challenge || config.challenge_enabled();
                run_repl(&config, challenge, identity.as_deref())
            }
        };
    }

    let stdin_input = args.path.as_deref() == Some(Path::new("-"));
    let work_dir = match (&args.path, stdin_input) {
        (Some(path), false) if path.is_file() => {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        }
        (Some(path), false) => path.clone(),
        _ => std::env::current_dir().context("Failed to get current directory")?,
    };

    // CLI flags override config file
    let config =
        load_config(&work_dir, args.config.as_deref())?.merge_with_cli(args.threshold, args.ai);
    let ai_config = config.ai();

    let mut evaluator = StoryEvaluator::new();
    if ai_config.enabled && !args.prompt {
        if !is_ai_available() && !args.quiet {
            eprintln!(
                "{}: AI feature not enabled. Rebuild with: cargo build --features ai",
                "Note".blue()
            );
        }
        evaluator = evaluator.with_advisor(AiAdvisor::from_config(&ai_config));
    }

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let (evaluations, had_errors, source_files) = if let Some(ref text) = args.story {
        let evaluation = evaluate_text(&evaluator, text, "story")?;
        (vec![evaluation], false, Vec::new())
    } else if stdin_input {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read story from stdin")?;
        let evaluation = evaluate_text(&evaluator, &text, "stdin")?;
        (vec![evaluation], false, Vec::new())
    } else {
        let path = args
            .path
            .clone()
            .context("A story path, \"-\" or --story is required")?;
        let ignore_set = if config.ignore.is_empty() {
            None
        } else {
            Some(build_ignore_set(&config.ignore)?)
        };
        let story_files =
            collect_story_files(&path, ignore_set.as_ref(), &config.get_story_patterns())?;
        if story_files.is_empty() {
            eprintln!("{}: No story files found", "Warning".yellow());
            return Ok(ExitCode::from(2));
        }

        let use_parallel = args.parallel || story_files.len() > 10;
        let (evaluations, had_errors) =
            evaluate_files(&evaluator, &story_files, use_parallel, args.quiet);
        (evaluations, had_errors, story_files)
    };

    if evaluations.is_empty() {
        eprintln!("{}: All stories failed to evaluate", "Error".red());
        return Ok(ExitCode::from(2));
    }

    let stats = StoryEvaluator::aggregate_stats(&evaluations);

    if args.json {
        let reporter = JsonReporter::new().pretty();
        if evaluations.len() == 1 {
            println!("{}", reporter.report(&evaluations[0]));
        } else {
            println!("{}", reporter.report_with_summary(&evaluations, &stats));
        }
    } else if args.quiet {
        let reporter = ConsoleReporter::new();
        for evaluation in &evaluations {
            reporter.report_quiet(evaluation);
        }
    } else {
        let mut reporter = ConsoleReporter::new();
        if args.verbose {
            reporter = reporter.verbose();
        }
        if evaluations.len() == 1 {
            reporter.report(&evaluations[0]);
        } else {
            reporter.report_many(&evaluations, &stats);
        }
    }

    if args.prompt {
        if evaluations.len() > 1 {
            eprintln!("{}: --prompt only works with a single story", "Warning".yellow());
        } else {
            let evaluation = &evaluations[0];
            let prompt = StoryPromptGenerator::new()
                .improvement_prompt(&evaluation.story, Some(&evaluation.report));
            println!("\n{}", "═".repeat(60));
            println!("{}", "AI Improvement Prompt:".bold());
            println!("{}", "═".repeat(60));
            println!("{}", prompt);
        }
    }

    if args.apply {
        apply_improvement(&evaluations, &source_files, args.quiet)?;
    }

    // Check threshold (config or CLI)
    if let Some(threshold) = config.threshold {
        let percentage = if evaluations.len() == 1 {
            evaluations[0].report.overall_percentage
        } else {
            stats.average_percentage
        };

        if percentage < f64::from(threshold) {
            if !args.quiet && !args.json {
                eprintln!(
                    "\n{}: Score {:.1}% is below threshold {}%",
                    "Failed".red().bold(),
                    percentage,
                    threshold
                );
            }
            return Ok(ExitCode::from(1));
        }
    }

    if had_errors {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn evaluate_text(
    evaluator: &StoryEvaluator,
    text: &str,
    label: &str,
) -> Result<Evaluation> {
    let request = EvaluationRequest::new(text).label(label);
    Ok(evaluator.evaluate(&request)?)
}

fn run_init(threshold: Option<u8>, dir: Option<&Path>) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let threshold_value = threshold.unwrap_or(60);
    std::fs::write(&config_path, default_config_json(threshold_value))
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {} with threshold={}",
        "Done".green().bold(),
        config_path.display(),
        threshold_value
    );
    Ok(ExitCode::SUCCESS)
}

fn run_demo() -> Result<ExitCode> {
    let evaluator = StoryEvaluator::new();
    let reporter = ConsoleReporter::new();

    println!("{}", "Agile Story Evaluator - Demo".bold());
    println!("{}", "═".repeat(60));
    println!("Rule-based INVEST evaluation of four sample stories (no API key required).");
    println!("Add --ai to a normal run for AI-powered feedback.");

    for (i, (title, story)) in DEMO_STORIES.iter().enumerate() {
        println!("\n{}. {}", i + 1, title.bold());
        println!("{}", "─".repeat(40));
        println!("Story: '{}'", story);
        let evaluation = evaluator.evaluate(&EvaluationRequest::new(*story).label(*title))?;
        reporter.report(&evaluation);
        println!("{}", "═".repeat(60));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_repl(config: &Config, challenge: bool, identity: Option<&str>) -> Result<ExitCode> {
    let ai_config = config.ai();
    let mut evaluator =
        StoryEvaluator::new().with_rate_limiter(RateLimiter::new(&config.rate_limit()));
    if ai_config.enabled {
        evaluator = evaluator.with_advisor(AiAdvisor::from_config(&ai_config));
    }
    let mut gate = challenge.then(ChallengeGate::new);
    let reporter = ConsoleReporter::new();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = std::io::stdout();

    eprintln!(
        "{}: Enter one story per line (Ctrl+D to quit)",
        "Info".blue()
    );
    loop {
        if let Some(gate) = &gate {
            print!("{} ", gate.question().cyan());
        } else {
            print!("{} ", "story>".cyan());
        }
        stdout.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;

        if let Some(gate) = gate.as_mut() {
            if !gate.attempt(&line) {
                tracing::info!("challenge failed");
                println!("{}", invest::analyzer::Rejection::ChallengeFailed.to_string().red());
                continue;
            }
            print!("{} ", "story>".cyan());
            stdout.flush()?;
            let Some(story) = lines.next() else { break };
            evaluate_repl_line(&evaluator, &reporter, &story?, identity);
        } else {
            evaluate_repl_line(&evaluator, &reporter, &line, identity);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn evaluate_repl_line(
    evaluator: &StoryEvaluator,
    reporter: &ConsoleReporter,
    story: &str,
    identity: Option<&str>,
) {
    let mut request = EvaluationRequest::new(story);
    request.identity = identity.map(str::to_string);
    match evaluator.evaluate(&request) {
        Ok(evaluation) => reporter.report(&evaluation),
        Err(rejection) => println!("{}", rejection.to_string().yellow()),
    }
}

/// Offer to write the AI rewrite back to the single evaluated file
fn apply_improvement(evaluations: &[Evaluation], files: &[PathBuf], quiet: bool) -> Result<()> {
    if evaluations.len() != 1 || files.len() != 1 {
        eprintln!("{}: --apply only works with a single story file", "Warning".yellow());
        return Ok(());
    }
    let improved = evaluations[0].ai.as_ref().and_then(|ai| ai.parsed.as_ref());
    match improved {
        Some(improved) => {
            let mut suggested = improved.story.clone();
            if !improved.acceptance_criteria.is_empty() {
                suggested.push_str("\n\nAcceptance Criteria:\n");
                suggested.push_str(&improved.acceptance_criteria);
            }
            offer_apply(&files[0], &evaluations[0].story, &suggested)
                .with_context(|| format!("Failed to apply to {}", files[0].display()))?;
        }
        None if !quiet => {
            eprintln!(
                "{}: No improved story available to apply (check the AI output above)",
                "Info".blue()
            );
        }
        None => {}
    }
    Ok(())
}

/// Evaluate files sequentially or in parallel, reporting per-file failures
fn evaluate_files(
    evaluator: &StoryEvaluator,
    files: &[PathBuf],
    parallel: bool,
    quiet: bool,
) -> (Vec<Evaluation>, bool) {
    let outcomes = if parallel {
        evaluator.evaluate_parallel(files, None)
    } else {
        let refs: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        evaluator.evaluate_many(&refs, None)
    };

    let mut had_errors = false;
    let mut evaluations = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(evaluation) => evaluations.push(evaluation),
            Err(e) => {
                had_errors = true;
                if !quiet {
                    eprintln!("{}: {:#}", "Error".red(), e);
                }
            }
        }
    }

    (evaluations, had_errors)
}

fn collect_story_files(
    path: &Path,
    ignore_set: Option<&globset::GlobSet>,
    story_patterns: &[&str],
) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if let Some(set) = ignore_set {
            if is_ignored(path, set) {
                return Ok(vec![]);
            }
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let file_path = entry.path();
        if entry.file_type().is_file() && is_story_file(file_path, story_patterns) {
            if let Some(set) = ignore_set {
                if is_ignored(file_path, set) {
                    continue;
                }
            }
            files.push(file_path.to_path_buf());
        }
    }

    // Sort for consistent output
    files.sort();

    Ok(files)
}

fn is_story_file(path: &Path, story_patterns: &[&str]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if path
        .components()
        .any(|c| c.as_os_str() == ".git" || c.as_os_str() == "target")
    {
        return false;
    }

    story_patterns.iter().any(|p| name.ends_with(p))
}
