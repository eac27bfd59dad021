use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use reelcache::cache::CatalogStore;
use reelcache::logging;
use reelcache::{Catalog, Config, Listing, OperationState, RemoteSource, Section, TmdbClient};

#[derive(Parser, Debug)]
#[command(name = "reelcache")]
#[command(about = "Browse the TMDB movie catalog with an offline-first cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/reelcache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep the cache in memory only
  #[arg(long, global = true)]
  no_persist: bool,

  /// Mirror log output to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List movies in a catalog section
  List {
    /// now_playing, popular, top_rated or upcoming
    #[arg(short, long, default_value = "popular")]
    section: Section,

    /// Number of pages to load
    #[arg(short, long, default_value_t = 1)]
    pages: u32,
  },
  /// Show a single movie
  Detail {
    id: u64,

    /// Also show the cast
    #[arg(long)]
    credits: bool,
  },
  /// Print the effective configuration
  Config,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  if let Command::Config = args.command {
    print!("{}", serde_yaml::to_string(&config)?);
    return Ok(());
  }

  let _guard = logging::init(&config.log, args.verbose)?;

  if args.no_persist {
    run(Catalog::ephemeral(&config)?, args.command).await
  } else {
    run(Catalog::open(&config)?, args.command).await
  }
}

async fn run<S>(catalog: Catalog<S, TmdbClient>, command: Command) -> Result<()>
where
  S: CatalogStore + 'static,
{
  match command {
    Command::List { section, pages } => list(&catalog, section, pages).await,
    Command::Detail { id, credits } => detail(&catalog, id, credits).await,
    Command::Config => Ok(()),
  }
}

async fn list<S, R>(catalog: &Catalog<S, R>, section: Section, pages: u32) -> Result<()>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  // Poster URLs are best effort
  catalog.configuration().refresh().await;

  let listing = catalog.listing();
  listing.start(section);

  let mut state = wait_for_settled(&listing).await;
  for _ in 1..pages {
    if !state.is_loaded() || !listing.on_prefetch_trigger() {
      break;
    }
    state = wait_for_settled(&listing).await;
  }

  for (index, movie) in listing.items().iter().enumerate() {
    let poster = movie
      .poster_path
      .as_deref()
      .map(|path| catalog.configuration().poster_url(path))
      .unwrap_or_default();
    println!(
      "{:>4}  {:<10} {:<50} {:>4.1}  {}",
      index + 1,
      movie.id,
      movie.title,
      movie.vote_average,
      poster
    );
  }

  match state.error() {
    Some(error) => Err(eyre!("{}", error)),
    None => Ok(()),
  }
}

async fn wait_for_settled<S, R>(listing: &Listing<S, R>) -> OperationState
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  let mut rx = listing.subscribe_state();
  loop {
    let state = *rx.borrow_and_update();
    if state != OperationState::Idle && !state.is_loading() {
      return state;
    }
    if rx.changed().await.is_err() {
      return listing.state();
    }
  }
}

async fn detail<S, R>(catalog: &Catalog<S, R>, id: u64, with_credits: bool) -> Result<()>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  let detail = catalog.detail(id).await?;
  let movie = &detail.movie;

  println!("{} ({})", movie.title, movie.id);
  if let Some(tagline) = detail.tagline.as_deref().filter(|t| !t.is_empty()) {
    println!("{}", tagline);
  }
  if let Some(date) = movie.release_date.as_deref() {
    println!("Released: {}", date);
  }
  if let Some(runtime) = detail.runtime {
    println!("Runtime:  {} min", runtime);
  }
  if !detail.genres.is_empty() {
    let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    println!("Genres:   {}", genres.join(", "));
  }
  println!("Rating:   {:.1}", movie.vote_average);
  if let Some(path) = movie.backdrop_path.as_deref() {
    catalog.configuration().refresh().await;
    println!("Backdrop: {}", catalog.configuration().backdrop_url(path));
  }
  if !movie.overview.is_empty() {
    println!();
    println!("{}", movie.overview);
  }

  if with_credits {
    let credits = catalog.credits(id).await?;
    println!();
    for member in &credits.cast {
      println!("  {:<30} {}", member.name, member.character);
    }
  }

  Ok(())
}
