use std::io::{BufRead, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docqa::{
    cli::{AskArgs, ChatArgs, Cli, Command, FallbackAction, IndexArgs,
        ModelAction, ResetArgs, StrategyAction},
    config_db::{ConfigDb, KEY_DEFAULT_STRATEGY, KEY_GENERATIVE_MODEL},
    data_dir::DataDir,
    error::{Error, Result},
    generate::{GeminiGenerator, Generator, DEFAULT_MODEL},
    normalize::{NormalizeOptions, StopSectionPolicy},
    session::{Session, Strategy},
    synthesize::default_fallback,
    vector_index::VectorIndex,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCQA_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config_db = ConfigDb::open(&data_dir.config_db())?;

    match cli.command {
        Command::Index(args) => {
            cmd_index(&config_db, &data_dir, &args)?;
        }
        Command::Ask(args) => {
            cmd_ask(&config_db, &data_dir, &args)?;
        }
        Command::Chat(args) => {
            cmd_chat(&config_db, &data_dir, &args)?;
        }
        Command::Status(args) => {
            cmd_status(&config_db, &data_dir, args.json)?;
        }
        Command::Reset(args) => {
            cmd_reset(&config_db, &data_dir, &args)?;
        }
        Command::Fallback { action } => match action {
            FallbackAction::Show { json } => {
                fallback_show(&config_db, json)?;
            }
            FallbackAction::Set { points } => {
                config_db.set_fallback_points(&points)?;
                println!("Set {} fallback point(s)", points.len());
            }
            FallbackAction::Clear => {
                if config_db.clear_fallback_points()? {
                    println!("Cleared fallback points (using defaults)");
                } else {
                    println!("No fallback points were configured");
                }
            }
        },
        Command::Model { action } => match action {
            ModelAction::Show { json } => {
                model_show(&config_db, json)?;
            }
            ModelAction::Set { model } => {
                config_db.set_setting(KEY_GENERATIVE_MODEL, &model)?;
                println!("Set generative model to '{model}'");
            }
            ModelAction::Clear => {
                if config_db.remove_setting(KEY_GENERATIVE_MODEL)? {
                    println!("Cleared model setting (using {DEFAULT_MODEL})");
                } else {
                    println!("No model was configured");
                }
            }
        },
        Command::Strategy { action } => match action {
            StrategyAction::Show => {
                let stored = config_db.get_setting(KEY_DEFAULT_STRATEGY)?;
                let strategy = Strategy::resolve(None, stored.as_deref())?;
                println!("{}", strategy.name());
            }
            StrategyAction::Set { strategy } => {
                config_db
                    .set_setting(KEY_DEFAULT_STRATEGY, strategy.name())?;
                println!("Set default strategy to '{}'", strategy.name());
            }
            StrategyAction::Clear => {
                if config_db.remove_setting(KEY_DEFAULT_STRATEGY)? {
                    println!("Cleared default strategy (using lexical)");
                } else {
                    println!("No default strategy was configured");
                }
            }
        },
        Command::Completions(args) => {
            args.generate();
        }
    }

    Ok(())
}

fn stop_policy(keep_after_stop: bool) -> NormalizeOptions {
    NormalizeOptions {
        stop_policy: if keep_after_stop {
            StopSectionPolicy::DropMarkerOnly
        } else {
            StopSectionPolicy::TruncateRemainder
        },
    }
}

fn open_session(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    name: &str,
) -> Result<Session> {
    let mut session = Session::new(data_dir.index_db(name)?, name);
    if let Some(points) = config_db.fallback_points()? {
        session.set_fallback(points);
    }
    Ok(session)
}

fn cmd_index(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    args: &IndexArgs,
) -> Result<()> {
    let mut session = open_session(config_db, data_dir, &args.name)?;
    session.chunk_size = args.chunk_size;
    session.overlap = args.overlap;
    session.set_normalize_options(stop_policy(args.keep_after_stop));

    let report = session.ingest(&args.files)?;
    config_db.set_index_docs(&args.name, &report.ingested)?;

    for skipped in &report.skipped {
        eprintln!("Skipped: {skipped}");
    }
    println!(
        "Indexed {} document(s) into '{}' ({} lines, {} chunks)",
        report.ingested.len(),
        args.name,
        report.line_count,
        report.chunk_count,
    );
    Ok(())
}

fn build_generator(
    config_db: &ConfigDb,
    model_override: Option<&str>,
) -> Result<GeminiGenerator> {
    let model = match model_override {
        Some(m) => m.to_string(),
        None => config_db.get_setting_or(KEY_GENERATIVE_MODEL, DEFAULT_MODEL)?,
    };
    GeminiGenerator::from_env(Some(&model))
}

fn cmd_ask(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    args: &AskArgs,
) -> Result<()> {
    let strategy = resolve_strategy(config_db, args.strategy)?;

    let mut session = open_session(config_db, data_dir, &args.name)?;
    session.top_k = args.top_k;
    session.window = args.window;
    session.max_chunks = args.max_chunks;
    session.set_normalize_options(stop_policy(args.keep_after_stop));

    if !args.file.is_empty() {
        let report = session.ingest(&args.file)?;
        for skipped in &report.skipped {
            eprintln!("Skipped: {skipped}");
        }
    } else if strategy != Strategy::Semantic {
        return Err(Error::Config(format!(
            "the {} strategy reads documents directly; pass them with --file",
            strategy.name()
        )));
    }

    let generator = if args.generative {
        Some(build_generator(config_db, args.model.as_deref())?)
    } else {
        None
    };
    let generator_ref = generator.as_ref().map(|g| g as &dyn Generator);

    let answer = session.ask(&args.question, strategy, generator_ref)?;

    if args.json {
        let payload = serde_json::json!({
            "question": args.question,
            "strategy": strategy.name(),
            "answer": answer.render(),
        });
        println!("{payload}");
    } else {
        println!("{}", answer.render());
    }
    Ok(())
}

fn cmd_chat(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    args: &ChatArgs,
) -> Result<()> {
    let strategy = resolve_strategy(config_db, args.strategy)?;

    let mut session = open_session(config_db, data_dir, &args.name)?;

    if !args.file.is_empty() {
        let report = session.ingest(&args.file)?;
        println!(
            "Loaded {} document(s), {} lines",
            report.ingested.len(),
            report.line_count
        );
        for skipped in &report.skipped {
            eprintln!("Skipped: {skipped}");
        }
    }

    let generator = if args.generative {
        Some(build_generator(config_db, None)?)
    } else {
        None
    };
    let generator_ref = generator.as_ref().map(|g| g as &dyn Generator);

    println!("Ask a question, or /history, /clear, /quit");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();

        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.reset()?;
                println!("Session cleared.");
            }
            "/history" => {
                if session.transcript().is_empty() {
                    println!("No questions asked yet.");
                }
                for entry in session.transcript() {
                    println!("Q: {}", entry.question);
                    println!("A: {}\n", entry.answer);
                }
            }
            _ => {
                // One bad question never ends the chat.
                match session.ask(question, strategy, generator_ref) {
                    Ok(answer) => println!("{}\n", answer.render()),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }

    Ok(())
}

fn cmd_status(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    json: bool,
) -> Result<()> {
    let embedder = docqa::HashEmbedder::default();
    let names = data_dir.list_indexes()?;

    let mut indexes = Vec::new();
    for name in &names {
        let path = data_dir.index_db(name)?;
        let chunks = match VectorIndex::load(&path, name, &embedder) {
            Ok(index) => Some(index.len()?),
            Err(_) => None,
        };
        let docs = config_db.get_index_docs(name)?;
        indexes.push((name.clone(), chunks, docs));
    }

    let model =
        config_db.get_setting_or(KEY_GENERATIVE_MODEL, DEFAULT_MODEL)?;
    let stored_strategy = config_db.get_setting(KEY_DEFAULT_STRATEGY)?;
    let default_strategy =
        Strategy::resolve(None, stored_strategy.as_deref())?;
    let fallback_count = config_db
        .fallback_points()?
        .map(|p| p.len())
        .unwrap_or_else(|| default_fallback().len());

    if json {
        let payload = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "model": model,
            "default_strategy": default_strategy.name(),
            "fallback_points": fallback_count,
            "indexes": indexes
                .iter()
                .map(|(name, chunks, docs)| serde_json::json!({
                    "name": name,
                    "chunks": chunks,
                    "documents": docs,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{payload}");
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Generative model: {model}");
        println!("Default strategy: {}", default_strategy.name());
        println!("Fallback points: {fallback_count}");
        println!("Indexes: {}", indexes.len());
        for (name, chunks, docs) in &indexes {
            match chunks {
                Some(n) => println!("  {name}: {n} chunks, {} document(s)",
                    docs.len()),
                None => println!("  {name}: unreadable"),
            }
        }
    }
    Ok(())
}

fn cmd_reset(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    args: &ResetArgs,
) -> Result<()> {
    let names = match &args.name {
        Some(name) => {
            if !data_dir.index_db(name)?.exists() {
                return Err(Error::IndexNotFound {
                    name: name.clone(),
                });
            }
            vec![name.clone()]
        }
        None => data_dir.list_indexes()?,
    };

    if names.is_empty() {
        println!("No indexes to remove.");
        return Ok(());
    }

    for name in &names {
        std::fs::remove_file(data_dir.index_db(name)?)?;
        config_db.remove_index_docs(name)?;
        println!("Removed index '{name}'");
    }
    Ok(())
}

fn fallback_show(config_db: &ConfigDb, json: bool) -> Result<()> {
    let (points, configured) = match config_db.fallback_points()? {
        Some(points) => (points, true),
        None => (default_fallback(), false),
    };

    if json {
        let payload = serde_json::json!({
            "configured": configured,
            "points": points,
        });
        println!("{payload}");
    } else {
        if !configured {
            println!("Using built-in defaults:");
        }
        for (i, point) in points.iter().enumerate() {
            println!("{}. {point}", i + 1);
        }
    }
    Ok(())
}

fn resolve_strategy(
    config_db: &ConfigDb,
    explicit: Option<Strategy>,
) -> Result<Strategy> {
    let stored = config_db.get_setting(KEY_DEFAULT_STRATEGY)?;
    Strategy::resolve(explicit, stored.as_deref())
}

fn model_show(config_db: &ConfigDb, json: bool) -> Result<()> {
    let configured = config_db.get_setting(KEY_GENERATIVE_MODEL)?;
    let model = configured
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    if json {
        let payload = serde_json::json!({
            "model": model,
            "configured": configured.is_some(),
        });
        println!("{payload}");
    } else if configured.is_some() {
        println!("{model}");
    } else {
        println!("{model} (built-in default)");
    }
    Ok(())
}
