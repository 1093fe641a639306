use std::path::PathBuf;

use anyhow::{Context, Result};
use animelog::chart::{ChartId, ChartPreference, ChartSize, LegendPosition, build_chart};
use animelog::config::AppConfig;
use animelog::filter::{Calendar, TimeFilter};
use animelog::loader::{DataSet, DirSource, DocumentCache, DocumentSource, HttpSource, Loader};
use animelog::models::{CatalogEntry, SongKind};
use animelog::prefs::Preferences;
use animelog::stats::ranking::RankedKey;
use animelog::stats::{DashboardOptions, DashboardStats, SubsetMetrics, Tally, compute_dashboard};
use animelog::store::SqliteStore;
use animelog::table::{CatalogQuery, SortColumn, SortOrder};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "animelog", version, about = "Personal anime-watching dashboard")]
struct Cli {
    /// Path to the SQLite cache database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Time range for filtered statistics.
#[derive(Args, Clone, Default)]
struct RangeArgs {
    /// Restrict to one calendar year
    #[arg(long, conflicts_with_all = ["from", "to"])]
    year: Option<i32>,

    /// Start of a custom range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// End of a custom range (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<String>,
}

impl RangeArgs {
    fn filter(&self) -> TimeFilter {
        match (self.year, &self.from, &self.to) {
            (Some(year), _, _) => TimeFilter::Year(year),
            (None, None, None) => TimeFilter::All,
            (None, from, to) => TimeFilter::from_mode("custom", from.as_deref(), to.as_deref()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TopKind {
    Studios,
    Genres,
    Themes,
    Types,
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    Small,
    Medium,
    Large,
}

#[derive(Clone, Copy, ValueEnum)]
enum LegendArg {
    Top,
    Bottom,
    Left,
    Right,
    Hidden,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch documents from the configured source into the local cache
    Sync {
        /// Drop the cache and refetch everything
        #[arg(long)]
        force: bool,
    },

    /// Show per-year, all-time and filtered statistics
    Stats {
        #[command(flatten)]
        range: RangeArgs,

        /// Print the full statistics object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current and longest watching streaks
    Streak,

    /// Rank studios, genres, themes or types by average rating
    Top {
        #[arg(value_enum)]
        kind: TopKind,

        /// Number of results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// List catalog entries
    List {
        /// Filter by name (substring match)
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by status (e.g. Finished, Airing, Pending)
        #[arg(long)]
        status: Option<String>,

        /// Sort column: name, rating, episodes, type, start, minutes
        #[arg(long, default_value = "name")]
        sort: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Show watch history grouped by day
    History {
        /// Show minutes per month instead
        #[arg(long, conflicts_with = "title")]
        monthly: bool,

        /// Show sessions for one title
        #[arg(long)]
        title: Option<String>,

        /// Number of days to show
        #[arg(short = 'n', long, default_value = "14")]
        limit: usize,
    },

    /// Show the plan-to-watch queue
    Plan,

    /// Show favorite songs
    Favorites {
        /// Only songs marked with frisson
        #[arg(long)]
        frisson: bool,
    },

    /// Show category scores and the composite rating of a title
    Rating { name: String },

    /// Show per-episode ratings and their trend for a title
    Episodes { name: String },

    /// Print chart input as JSON (all charts in layout order when no id is given)
    Chart {
        id: Option<String>,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// View or change dashboard preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Add a catalog entry
    Add {
        name: String,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        episodes: Option<u32>,
        /// Minutes per episode
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        studio: Option<String>,
        #[arg(long)]
        genres: Option<String>,
        #[arg(long)]
        themes: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Start date (defaults to now)
        #[arg(long)]
        start: Option<String>,
    },

    /// Merge JSON fields into a catalog entry, e.g. '{"rating": 9}'
    Update { name: String, json: String },

    /// Delete a catalog entry
    Delete { name: String },

    /// Log a watching session dated now
    Log {
        name: String,
        /// Episode descriptor, e.g. "Ep 4-6" or "(2x) Ep 1"
        episode: String,
        /// Elapsed time, e.g. "72 min" or "1:12"
        time: String,
    },

    /// Write every cached document to one JSON file
    Export { file: PathBuf },

    /// Replace the cache with a previously exported file
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Show the chart layout order
    Order,
    /// Move a chart to a position in the layout (0 = first)
    Move { id: String, position: usize },
    /// Restore the default chart order
    ResetOrder,
    /// Show one chart's display settings
    Show { id: String },
    /// Change one chart's display settings
    Set {
        id: String,
        #[arg(long, value_enum)]
        size: Option<SizeArg>,
        #[arg(long)]
        palette: Option<String>,
        #[arg(long, value_enum)]
        legend: Option<LegendArg>,
        #[arg(long)]
        grid: Option<bool>,
        #[arg(long)]
        y_min: Option<f64>,
        #[arg(long)]
        y_max: Option<f64>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Restore one chart's default settings
    Reset { id: String },
    /// Show, set or clear (with "") the saved catalog status filter
    Status { value: Option<String> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(animelog::config::default_db_path);
    log::info!("Cache database: {}", db_path.display());

    let mut store = SqliteStore::open(&db_path).context("Failed to open cache database")?;
    let cal = Calendar::local();

    match cli.command {
        Commands::Sync { force } => {
            let Some(source) = open_source(&config) else {
                anyhow::bail!("No data source. Set data_dir or base_url in {}", config_hint());
            };
            let report = Loader::new(&mut store, source)
                .sync(force)
                .context("Sync failed")?;
            println!(
                "Sync complete: {} fetched, {} from cache, {} failed{}",
                report.fetched,
                report.cached,
                report.failed.len(),
                if report.invalidated { " (cache refreshed)" } else { "" }
            );
            if !report.failed.is_empty() {
                println!("Unavailable: {}", report.failed.join(", "));
            }
        }

        Commands::Stats { range, json } => {
            let data = load_data(&mut store, &config)?;
            let Some(stats) = dashboard(&data, &config, range.filter(), &cal) else {
                println!("No catalog entries. Run `animelog sync` first.");
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats, &data);
            }
        }

        Commands::Streak => {
            let data = load_data(&mut store, &config)?;
            let s = animelog::stats::streak::streaks_from_history(
                &data.history,
                &cal,
                config.streak_min_minutes,
            );
            println!("Watching streak (days with {} min or more)", config.streak_min_minutes);
            println!("  Current: {:>4} days  {}", s.current_length, day_span(s.current_start, s.current_end));
            println!("  Longest: {:>4} days  {}", s.longest_length, day_span(s.longest_start, s.longest_end));
        }

        Commands::Top { kind, limit, range } => {
            let data = load_data(&mut store, &config)?;
            let Some(stats) = dashboard(&data, &config, range.filter(), &cal) else {
                println!("No catalog entries.");
                return Ok(());
            };
            let (label, ranked) = match kind {
                TopKind::Studios => ("Studio", &stats.rankings.top_studios),
                TopKind::Genres => ("Genre", &stats.rankings.top_genres),
                TopKind::Themes => ("Theme", &stats.rankings.top_themes),
                TopKind::Types => ("Type", &stats.rankings.rating_by_type),
            };
            if ranked.is_empty() {
                println!("Not enough rated entries to rank ({}).", stats.filter);
                return Ok(());
            }
            println!("Top by average rating ({}):", stats.filter);
            println!();
            print_ranked(label, &ranked[..ranked.len().min(limit)]);
        }

        Commands::List { search, status, sort, desc, range } => {
            let data = load_data(&mut store, &config)?;
            let prefs = Preferences::new(&mut store);
            let status = match status {
                Some(s) => Some(s),
                None => prefs.status_filter().context("Failed to read preferences")?,
            };
            let sort: SortColumn = sort.parse().map_err(anyhow::Error::msg)?;
            let query = CatalogQuery {
                search,
                status,
                filter: range.filter(),
                sort,
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
            };
            let rows = animelog::table::catalog_rows(&data.anime, &query, &cal);
            if rows.is_empty() {
                println!("No matching entries.");
                return Ok(());
            }
            print_catalog(&rows);
            println!();
            println!("{} of {} entries", rows.len(), data.anime.len());
        }

        Commands::History { monthly, title, limit } => {
            let data = load_data(&mut store, &config)?;
            if let Some(title) = title {
                let Some(entry) = animelog::table::find_entry(&data.anime, &title) else {
                    println!("No catalog entry matching \"{}\".", title);
                    return Ok(());
                };
                let h = animelog::table::title_history(&data.history, entry);
                println!("History for \"{}\":", entry.name);
                println!();
                for s in &h.entries {
                    println!(
                        "  {:<12} {:<30} {:>8}",
                        s.watched_at(&cal).map(|d| cal.day_of(&d).to_string()).unwrap_or_else(|| "-".into()),
                        truncate(&s.episode, 30),
                        s.time
                    );
                }
                println!();
                println!(
                    "{} sessions, {} episodes, {:.1} hours",
                    h.entries.len(),
                    h.total_episodes,
                    h.total_minutes / 60.0
                );
            } else if monthly {
                let months =
                    animelog::stats::timeseries::monthly_minutes(&data.history, &TimeFilter::All, &cal);
                println!("{:<8} {:>8} {:>7}", "Month", "Minutes", "Hours");
                println!("{}", "-".repeat(25));
                for (month, minutes) in &months {
                    println!("{:<8} {:>8.0} {:>7.1}", month, minutes, minutes / 60.0);
                }
            } else {
                let days = animelog::table::history_by_day(&data.history, &cal);
                if days.is_empty() {
                    println!("No dated history.");
                    return Ok(());
                }
                for day in days.iter().take(limit) {
                    println!(
                        "{}  ({} episodes, {:.0} min)",
                        day.day.format("%a %Y-%m-%d"),
                        day.total_episodes,
                        day.total_minutes
                    );
                    for s in &day.entries {
                        println!("    {:<35} {:<20} {:>8}", truncate(&s.name, 35), truncate(&s.episode, 20), s.time);
                    }
                }
            }
        }

        Commands::Plan => {
            let data = load_data(&mut store, &config)?;
            let rows = animelog::table::plan_rows(&data.plan);
            if rows.is_empty() {
                println!("Plan-to-watch queue is empty.");
                return Ok(());
            }
            println!("{:>4}  {:<40} {:>4}  {}", "Pri", "Title", "Eps", "Status");
            println!("{}", "-".repeat(62));
            for p in rows {
                println!(
                    "{:>4}  {:<40} {:>4}  {}",
                    p.priority.map(|v| format!("{v}")).unwrap_or_else(|| "-".into()),
                    truncate(&p.name, 40),
                    p.episodes.map(|v| v.to_string()).unwrap_or_else(|| "?".into()),
                    p.status.map(|s| format!("{s:?}")).unwrap_or_default()
                );
            }
        }

        Commands::Favorites { frisson } => {
            let data = load_data(&mut store, &config)?;
            let summary = animelog::stats::favorites::summarize_favorites(&data.favorites);
            let rows = animelog::table::favorite_rows(&data.favorites, frisson, None);
            if rows.is_empty() {
                println!("No favorite songs.");
                return Ok(());
            }
            println!(
                "{:<9} {:<30} {:<25} {:>5}  {}",
                "Kind", "Title", "Anime", "Score", "Frisson"
            );
            println!("{}", "-".repeat(80));
            for s in rows {
                println!(
                    "{:<9} {:<30} {:<25} {:>5}  {}",
                    s.kind.label(),
                    truncate(&s.title, 30),
                    truncate(&s.anime, 25),
                    fmt_opt(s.final_score()),
                    if s.frisson { "yes" } else { "" }
                );
            }
            println!();
            println!(
                "{} songs ({} openings, {} endings), {} with frisson, average {}",
                summary.count,
                summary.by_kind.get(SongKind::Opening.label()),
                summary.by_kind.get(SongKind::Ending.label()),
                summary.frisson_count,
                fmt_opt(summary.average_score)
            );
        }

        Commands::Rating { name } => {
            let data = load_data(&mut store, &config)?;
            let target = animelog::table::find_entry(&data.anime, &name)
                .map(|e| e.name.clone())
                .unwrap_or(name);
            let Some(rating) = data
                .category_ratings
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(&target))
            else {
                println!("No category ratings for \"{}\".", target);
                return Ok(());
            };
            println!("Category ratings for \"{}\":", rating.name);
            println!();
            println!("{:<20} {:>6} {:>7}", "Category", "Score", "Weight");
            println!("{}", "-".repeat(35));
            for (category, score) in &rating.categories {
                println!(
                    "{:<20} {:>6.1} {:>7.1}",
                    category,
                    score,
                    animelog::stats::rating::category_weight(category)
                );
            }
            println!();
            println!(
                "Composite: {}",
                fmt_opt(animelog::stats::rating::composite_rating(&rating.categories))
            );
            if let Some(note) = data.note_for(&rating.name) {
                println!("Note: {}", note.text);
            }
        }

        Commands::Episodes { name } => {
            let data = load_data(&mut store, &config)?;
            let target = animelog::table::find_entry(&data.anime, &name)
                .map(|e| e.name.clone())
                .unwrap_or(name);
            let Some(ratings) = data
                .episode_ratings
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(&target))
            else {
                println!("No episode ratings for \"{}\".", target);
                return Ok(());
            };
            let t = animelog::stats::trend::episode_trend(ratings);
            println!("Episode ratings for \"{}\" (average {}):", t.name, fmt_opt(t.average));
            println!();
            println!("{:>4} {:>6} {:>6}", "Ep", "Score", "Trend");
            println!("{}", "-".repeat(18));
            for (i, (ep, score)) in t.points.iter().enumerate() {
                println!(
                    "{:>4} {:>6.1} {:>6}",
                    ep,
                    score,
                    fmt_opt(t.trend.get(i).copied())
                );
            }
        }

        Commands::Chart { id, range } => {
            let data = load_data(&mut store, &config)?;
            let Some(stats) = dashboard(&data, &config, range.filter(), &cal) else {
                println!("No catalog entries.");
                return Ok(());
            };
            let prefs = Preferences::new(&mut store);
            let ids = match id {
                Some(id) => vec![id.parse::<ChartId>().map_err(anyhow::Error::msg)?],
                None => prefs.chart_order().context("Failed to read chart order")?,
            };
            let mut charts = Vec::with_capacity(ids.len());
            for id in ids {
                let pref = prefs.chart_pref(id).context("Failed to read chart settings")?;
                charts.push(build_chart(id, &stats, &pref));
            }
            if charts.len() == 1 {
                println!("{}", serde_json::to_string_pretty(&charts[0])?);
            } else {
                println!("{}", serde_json::to_string_pretty(&charts)?);
            }
        }

        Commands::Prefs { action } => run_prefs(Preferences::new(&mut store), action)?,

        Commands::Add {
            name,
            kind,
            episodes,
            duration,
            rating,
            studio,
            genres,
            themes,
            status,
            start,
        } => {
            let mut fields = Map::new();
            fields.insert("name".into(), Value::from(name));
            let optional = [
                ("type", kind.map(Value::from)),
                ("episodes", episodes.map(Value::from)),
                ("episodeDuration", duration.map(Value::from)),
                ("rating", rating.map(Value::from)),
                ("studio", studio.map(Value::from)),
                ("genres", genres.map(Value::from)),
                ("themes", themes.map(Value::from)),
                ("status", status.map(Value::from)),
                ("startDate", start.map(Value::from)),
            ];
            for (key, value) in optional {
                if let Some(v) = value {
                    fields.insert(key.into(), v);
                }
            }
            let entry: CatalogEntry =
                serde_json::from_value(Value::Object(fields)).context("Invalid entry")?;
            let added = DocumentCache::new(&mut store)
                .add_entry(entry, Utc::now())
                .context("Add failed")?;
            println!("Added \"{}\" (#{})", added.name, added.index.unwrap_or_default());
        }

        Commands::Update { name, json } => {
            let patch: Value = serde_json::from_str(&json).context("Update must be a JSON object")?;
            let updated = DocumentCache::new(&mut store)
                .update_entry(&name, &patch)
                .context("Update failed")?;
            println!("Updated \"{}\"", updated.name);
        }

        Commands::Delete { name } => {
            DocumentCache::new(&mut store)
                .delete_entry(&name)
                .context("Delete failed")?;
            println!("Deleted \"{}\"", name);
        }

        Commands::Log { name, episode, time } => {
            let entry = DocumentCache::new(&mut store)
                .log_history(&name, &episode, &time, Utc::now())
                .context("Log failed")?;
            println!(
                "Logged {} of \"{}\" ({}, {} episodes)",
                entry.time,
                entry.name,
                entry.episode,
                entry.episode_count()
            );
        }

        Commands::Export { file } => {
            let exported = DocumentCache::new(&mut store).export().context("Export failed")?;
            std::fs::write(&file, serde_json::to_string_pretty(&exported)?)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!(
                "Exported {} documents to {}",
                exported.as_object().map(|o| o.len()).unwrap_or(0),
                file.display()
            );
        }

        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: Value = serde_json::from_str(&raw).context("Import file is not JSON")?;
            let n = DocumentCache::new(&mut store).import(&value).context("Import failed")?;
            println!("Imported {} documents from {}", n, file.display());
        }
    }

    Ok(())
}

fn run_prefs(mut prefs: Preferences<&mut SqliteStore>, action: PrefsAction) -> Result<()> {
    let parse_id = |id: &str| id.parse::<ChartId>().map_err(anyhow::Error::msg);
    match action {
        PrefsAction::Order => {
            for (i, id) in prefs.chart_order()?.iter().enumerate() {
                println!("{:>2}  {}", i, id);
            }
        }
        PrefsAction::Move { id, position } => {
            let order = prefs.move_chart(parse_id(&id)?, position)?;
            let names: Vec<&str> = order.iter().map(ChartId::as_str).collect();
            println!("Chart order: {}", names.join(", "));
        }
        PrefsAction::ResetOrder => {
            prefs.reset_chart_order()?;
            println!("Chart order reset");
        }
        PrefsAction::Show { id } => {
            let pref = prefs.chart_pref(parse_id(&id)?)?;
            println!("{}", serde_json::to_string_pretty(&pref)?);
        }
        PrefsAction::Set {
            id,
            size,
            palette,
            legend,
            grid,
            y_min,
            y_max,
            title,
        } => {
            let id = parse_id(&id)?;
            let mut pref: ChartPreference = prefs.chart_pref(id)?;
            if let Some(size) = size {
                pref.size = match size {
                    SizeArg::Small => ChartSize::Small,
                    SizeArg::Medium => ChartSize::Medium,
                    SizeArg::Large => ChartSize::Large,
                };
            }
            if let Some(legend) = legend {
                pref.legend = match legend {
                    LegendArg::Top => LegendPosition::Top,
                    LegendArg::Bottom => LegendPosition::Bottom,
                    LegendArg::Left => LegendPosition::Left,
                    LegendArg::Right => LegendPosition::Right,
                    LegendArg::Hidden => LegendPosition::Hidden,
                };
            }
            if let Some(palette) = palette {
                pref.palette = palette;
            }
            if let Some(grid) = grid {
                pref.show_grid = grid;
            }
            if y_min.is_some() {
                pref.y_min = y_min;
            }
            if y_max.is_some() {
                pref.y_max = y_max;
            }
            if let Some(title) = title {
                pref.title = Some(title).filter(|t| !t.is_empty());
            }
            prefs.set_chart_pref(id, &pref)?;
            println!("{}", serde_json::to_string_pretty(&pref)?);
        }
        PrefsAction::Reset { id } => {
            let id = parse_id(&id)?;
            prefs.reset_chart_pref(id)?;
            println!("Settings for {} reset", id);
        }
        PrefsAction::Status { value } => match value {
            Some(v) => {
                prefs.set_status_filter(Some(&v))?;
                match prefs.status_filter()? {
                    Some(s) => println!("Status filter: {}", s),
                    None => println!("Status filter cleared"),
                }
            }
            None => match prefs.status_filter()? {
                Some(s) => println!("Status filter: {}", s),
                None => println!("No status filter"),
            },
        },
    }
    Ok(())
}

/// The configured document source: a static host wins over a directory.
fn open_source(config: &AppConfig) -> Option<Box<dyn DocumentSource>> {
    if let Some(url) = &config.base_url {
        Some(Box::new(HttpSource::new(url, config.http_timeout_secs)))
    } else {
        config
            .data_dir
            .as_ref()
            .map(|dir| Box::new(DirSource::new(dir)) as Box<dyn DocumentSource>)
    }
}

fn config_hint() -> String {
    AppConfig::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "the config file".into())
}

/// Sync against the configured source when there is one, otherwise read
/// whatever is cached.
fn load_data(store: &mut SqliteStore, config: &AppConfig) -> Result<DataSet> {
    match open_source(config) {
        Some(source) => Loader::new(store, source)
            .with_progress(false)
            .load(false)
            .context("Failed to load documents"),
        None => DocumentCache::new(store)
            .dataset()
            .context("Failed to read cached documents"),
    }
}

fn dashboard(
    data: &DataSet,
    config: &AppConfig,
    filter: TimeFilter,
    cal: &Calendar<Local>,
) -> Option<DashboardStats> {
    let opts = DashboardOptions {
        filter,
        streak_min_minutes: config.streak_min_minutes,
    };
    compute_dashboard(&data.anime, &data.history, &opts, cal)
}

/// Print per-year and summary tables. Cells with a stats override show the
/// override instead of the computed value.
fn print_stats(stats: &DashboardStats, data: &DataSet) {
    let o = &data.overrides;
    println!(
        "{:<8} {:>7} {:>9} {:>8} {:>9} {:>7}",
        "Year", "Titles", "Episodes", "Hours", "Rewatches", "Avg ep"
    );
    println!("{}", "-".repeat(53));

    let row = |label: &str, m: &SubsetMetrics| {
        println!(
            "{:<8} {:>7} {:>9} {:>8} {:>9} {:>7}",
            label,
            o.display_or(label, "Titles", m.count),
            o.display_or(label, "Episodes", m.total_episodes),
            o.display_or(label, "Hours", format!("{:.1}", m.total_hours())),
            o.display_or(label, "Rewatches", m.rewatch_count),
            o.display_or(label, "Avg ep", format!("{:.1}", m.avg_episode_duration)),
        );
    };
    for (year, m) in &stats.per_year {
        row(&year.to_string(), m);
    }
    println!("{}", "-".repeat(53));
    row("All", &stats.all_time);
    println!();

    let f = &stats.filtered;
    println!("Filter: {}", stats.filter);
    println!(
        "  {} titles, {} episodes, {:.1} hours, average rating {}",
        f.count,
        f.total_episodes,
        f.total_hours(),
        fmt_opt(stats.average_rating)
    );
    println!(
        "  Streak: {} days current, {} days longest",
        stats.streak.current_length, stats.streak.longest_length
    );
    println!();

    print_tally("Type", &stats.distributions.by_type, 10);
    print_tally("Status", &stats.distributions.by_status, 10);
    print_tally("Dub", &stats.distributions.by_dub, 5);
    print_tally("Season", &stats.distributions.by_season, 4);
    print_tally("Genre", &stats.distributions.by_genre, 10);
    print_tally("Studio", &stats.distributions.by_studio, 10);

    if let Some(commentary) = &o.commentary {
        println!("{}", commentary);
    }
}

fn print_tally(label: &str, tally: &Tally, limit: usize) {
    if tally.is_empty() {
        return;
    }
    println!("{}:", label);
    for (key, count) in tally.by_count().into_iter().take(limit) {
        println!("  {:<30} {}", truncate(&key, 30), count);
    }
    println!();
}

fn print_ranked(label: &str, ranked: &[RankedKey]) {
    println!("{:<30} {:>7} {:>6}", label, "Average", "Count");
    println!("{}", "-".repeat(45));
    for r in ranked {
        println!("{:<30} {:>7.2} {:>6}", truncate(&r.key, 30), r.average, r.count);
    }
}

fn print_catalog(rows: &[&CatalogEntry]) {
    println!(
        "{:<35} {:<10} {:>4} {:>6} {:>10} {:>7}  {}",
        "Title", "Type", "Eps", "Rating", "Started", "Minutes", "Status"
    );
    println!("{}", "-".repeat(95));
    for e in rows {
        println!(
            "{:<35} {:<10} {:>4} {:>6} {:>10} {:>7.0}  {}",
            truncate(&e.name, 35),
            e.type_label(),
            e.episodes.map(|n| n.to_string()).unwrap_or_else(|| "?".into()),
            fmt_opt(e.rating),
            e.start_date
                .as_deref()
                .and_then(animelog::parse::parse_day)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            e.watched_minutes(),
            e.status.as_deref().unwrap_or(""),
        );
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}

fn day_span(start: Option<chrono::NaiveDate>, end: Option<chrono::NaiveDate>) -> String {
    match (start, end) {
        (Some(s), Some(e)) if s == e => s.to_string(),
        (Some(s), Some(e)) => format!("{s} to {e}"),
        _ => String::new(),
    }
}

/// Shorten to `width` characters, marking the cut with "...".
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}
