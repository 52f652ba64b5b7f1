mod logging;
mod play;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use guoxue_core::{utils, Config, Library, ReferenceEntry, ReferenceKind};

#[derive(Parser)]
#[command(name = "guoxue")]
#[command(about = "Chinese idiom chain game, idiom lookup and reference search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the bundled datasets
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chain game (default)
    Play,
    /// Show one idiom in detail
    Lookup { word: String },
    /// Positional suggestions for a partial idiom
    Suggest {
        #[arg(default_value = "")]
        input: String,
        /// Character the idiom must start with
        #[arg(long)]
        lead: Option<char>,
    },
    /// Random idioms
    Random {
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Idioms whose leading characters match the query
    Idioms { query: String },
    /// Search the dictionary, compound words or xiehouyu
    Search {
        /// word, ci or xiehouyu
        #[arg(value_parser = parse_kind)]
        kind: ReferenceKind,
        query: String,
    },
    /// Force-reload every dataset
    Refresh,
    /// Inspect or clear the dataset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached blobs and their sizes
    List,
    /// Delete every cached blob
    Clear,
}

fn parse_kind(s: &str) -> std::result::Result<ReferenceKind, String> {
    s.parse().map_err(|e: guoxue_core::Error| e.to_string())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_toml(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

fn print_entry(entry: &ReferenceEntry) {
    match entry {
        ReferenceEntry::Word(w) => {
            let old = w.oldword.as_deref().filter(|o| *o != w.word);
            match old {
                Some(old) => println!("{} ({})  [{}]", w.word, old, w.pinyin),
                None => println!("{}  [{}]", w.word, w.pinyin),
            }
            println!("  部首: {}  笔画: {}", w.radicals, w.strokes);
            println!("  {}", w.explanation);
        }
        ReferenceEntry::Ci(c) => println!("{}: {}", c.ci, c.explanation),
        ReferenceEntry::Xiehouyu(x) => println!("{} —— {}", x.riddle, x.answer),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let mut library = Library::from_config(&config)?;

    match cli.command.unwrap_or(Commands::Play) {
        Commands::Play => {
            library.initialize()?;
            play::run(&library)?;
        }
        Commands::Lookup { word } => {
            let word = utils::normalize(&word);
            match library.idioms().lookup_exact(&word)? {
                Some(idiom) => play::print_idiom("", &idiom),
                None => bail!("未在辞海中查到此成语: {}", word),
            }
        }
        Commands::Suggest { input, lead } => {
            for word in library.suggest(&utils::normalize(&input), lead) {
                println!("{}", word);
            }
        }
        Commands::Random { count } => {
            let words = match count {
                Some(n) => library.idioms().sample_random(n),
                None => library.random_idioms(),
            };
            for word in words {
                println!("{}", word);
            }
        }
        Commands::Idioms { query } => {
            let found = library.search_idioms(&utils::normalize(&query));
            if found.is_empty() {
                println!("(no idioms found)");
            }
            for idiom in &found {
                play::print_idiom("", idiom);
            }
        }
        Commands::Search { kind, query } => {
            let hits = library.search(kind, &utils::normalize(&query))?;
            if hits.is_empty() {
                println!("(no {} entries found)", kind);
            }
            for entry in &hits {
                print_entry(entry);
            }
        }
        Commands::Refresh => {
            library.refresh_all()?;
            println!("✓ Reloaded idioms ({} rows)", library.idioms().len()?);
            for kind in ReferenceKind::ALL {
                println!("✓ Reloaded {} ({} entries)", kind, library.reference().len(kind));
            }
        }
        Commands::Cache { action } => {
            let Some(cache) = library.cache() else {
                bail!("no cache_path configured");
            };
            match action {
                CacheAction::List => {
                    println!("{}", cache.path().display());
                    for (key, size) in cache.entries()? {
                        println!("  {:<24} {:>10} bytes", key, size);
                    }
                }
                CacheAction::Clear => {
                    library.clear_cache()?;
                    println!("✓ Cleared {}", cache.path().display());
                }
            }
        }
    }
    Ok(())
}
