use anyhow::{anyhow, Context, Result};
use catalog::{CatalogIndex, Category, InMemoryMovieStore, MovieId, PersonId};
use clap::{Parser, Subcommand};
use colored::Colorize;
use reconcile::{CeremonyAwardEntry, RoleEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use service::{
    AssignmentView, CastAssignmentView, CatalogService, CeremonyAwardView, CreditView,
    TracingNotifier,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// castlist - crew, cast and award reconciliation for a movie catalog
#[derive(Parser)]
#[command(name = "castlist")]
#[command(about = "Bring a movie's crew, cast and awards in line with a desired list", long_about = None)]
struct Cli {
    /// Path to the catalog snapshot
    #[arg(short, long, default_value = "data/catalog.json")]
    data: PathBuf,

    /// Run the command but don't write the snapshot back
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a movie's crew, cast and awards
    Show {
        #[arg(long)]
        movie_id: MovieId,
    },

    /// Replace one crew category with the entries of a JSON file
    Crew {
        #[arg(long)]
        movie_id: MovieId,

        /// Crew category, e.g. director or sound-editor
        #[arg(long)]
        category: String,

        /// JSON array of {id, personId, role}
        #[arg(long)]
        file: PathBuf,
    },

    /// Replace the cast with the entries of a JSON file
    Cast {
        #[arg(long)]
        movie_id: MovieId,

        /// JSON array of {id, personId, role, rank}
        #[arg(long)]
        file: PathBuf,
    },

    /// Reconcile the awards of one ceremony from a JSON descriptor
    Awards {
        #[arg(long)]
        movie_id: MovieId,

        /// JSON object {id, ceremony: {id, name}, awards: [...]}
        #[arg(long)]
        file: PathBuf,
    },

    /// Remove a person from a crew category, or from the cast
    Remove {
        #[arg(long)]
        movie_id: MovieId,

        /// Crew category, or "cast"
        #[arg(long)]
        section: String,

        #[arg(long)]
        person_id: PersonId,
    },

    /// Remove everyone from a crew category, or the whole cast
    Clear {
        #[arg(long)]
        movie_id: MovieId,

        /// Crew category, or "cast"
        #[arg(long)]
        section: String,
    },

    /// List every credit of a person
    Credits {
        #[arg(long)]
        person_id: PersonId,
    },

    /// Delete a movie together with its crew, cast and awards
    DeleteMovie {
        #[arg(long)]
        movie_id: MovieId,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        !matches!(self, Commands::Show { .. } | Commands::Credits { .. })
    }
}

/// The roster a `remove`/`clear` command targets
enum Target {
    Crew(Category),
    Cast,
}

fn parse_target(section: &str) -> Result<Target> {
    if section.trim().eq_ignore_ascii_case("cast") {
        return Ok(Target::Cast);
    }
    Ok(Target::Crew(section.parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let index = CatalogIndex::load_from_file(&cli.data)
        .with_context(|| format!("Failed to load catalog from {}", cli.data.display()))?;
    if !cli.json {
        println!("{} Loaded catalog in {:?}", "✓".green(), start.elapsed());
    }

    let store = InMemoryMovieStore::new(index);
    let service = CatalogService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(TracingNotifier),
    );

    let mutates = cli.command.mutates();
    let json = cli.json;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Show { movie_id } => handle_show(&service, &store, movie_id, json).await?,
        Commands::Crew {
            movie_id,
            category,
            file,
        } => {
            let category: Category = category.parse()?;
            let desired: Vec<RoleEntry> = read_json(&file)?;
            let views = service
                .reconcile_role_assignments(movie_id, category, &desired)
                .await
                .with_context(|| format!("Failed to update {} of movie {}", category, movie_id))?;
            emit(json, &views, || print_crew(category, &views))?;
        }
        Commands::Cast { movie_id, file } => {
            let desired: Vec<RoleEntry> = read_json(&file)?;
            let views = service
                .reconcile_cast_assignments(movie_id, &desired)
                .await
                .with_context(|| format!("Failed to update cast of movie {}", movie_id))?;
            emit(json, &views, || print_cast(&views))?;
        }
        Commands::Awards { movie_id, file } => {
            let descriptor: CeremonyAwardEntry = read_json(&file)?;
            let people = service.resolve_people(&descriptor.awardee_ids()).await?;
            let view = service
                .reconcile_ceremony_awards(movie_id, &descriptor, &people)
                .await
                .with_context(|| format!("Failed to update awards of movie {}", movie_id))?;
            emit(json, &view, || print_ceremony_award(&view))?;
        }
        Commands::Remove {
            movie_id,
            section,
            person_id,
        } => match parse_target(&section)? {
            Target::Crew(category) => {
                let views = service.remove_assignment(movie_id, category, person_id).await?;
                emit(json, &views, || print_crew(category, &views))?;
            }
            Target::Cast => {
                let views = service.remove_cast_member(movie_id, person_id).await?;
                emit(json, &views, || print_cast(&views))?;
            }
        },
        Commands::Clear { movie_id, section } => {
            let removed = match parse_target(&section)? {
                Target::Crew(category) => service.clear_assignments(movie_id, category).await?,
                Target::Cast => service.clear_cast(movie_id).await?,
            };
            emit(json, &removed, || {
                if removed {
                    println!("{} Cleared {} of movie {}", "✓".green(), section, movie_id);
                } else {
                    println!("Nothing to clear in {} of movie {}", section, movie_id);
                }
            })?;
        }
        Commands::Credits { person_id } => {
            let credits = service.credits_for_person(person_id).await?;
            emit(json, &credits, || print_credits(person_id, &credits))?;
        }
        Commands::DeleteMovie { movie_id } => {
            let deleted = service.delete_movie(movie_id).await?;
            if !deleted {
                return Err(anyhow!("Movie {} not found", movie_id));
            }
            emit(json, &deleted, || {
                println!("{} Deleted movie {}", "✓".green(), movie_id)
            })?;
        }
    }

    if mutates && !cli.dry_run {
        store
            .snapshot()
            .await
            .save_to_file(&cli.data)
            .with_context(|| format!("Failed to save catalog to {}", cli.data.display()))?;
        info!("Saved catalog to {}", cli.data.display());
    }

    Ok(())
}

/// Handle the 'show' command
async fn handle_show(
    service: &CatalogService,
    store: &InMemoryMovieStore,
    movie_id: MovieId,
    json: bool,
) -> Result<()> {
    let snapshot = store.snapshot().await;
    let movie = snapshot
        .get_movie(movie_id)
        .ok_or_else(|| anyhow!("Movie {} not found", movie_id))?;

    let mut crew = Vec::new();
    for category in Category::ALL {
        let views = service.role_assignments(movie_id, category).await?;
        if !views.is_empty() {
            crew.push((category, views));
        }
    }
    let cast = service.cast_assignments(movie_id).await?;
    let awards = service.ceremony_awards(movie_id).await?;

    if json {
        let crew_json: Vec<&AssignmentView> = crew.iter().flat_map(|(_, views)| views).collect();
        let value = serde_json::json!({
            "movie": movie,
            "crew": crew_json,
            "cast": cast,
            "awards": awards,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match movie.year {
        Some(year) => println!("{}", format!("{} ({})", movie.title, year).bold().blue()),
        None => println!("{}", movie.title.bold().blue()),
    }
    for (category, views) in &crew {
        print_crew(*category, views);
    }
    if !cast.is_empty() {
        print_cast(&cast);
    }
    for view in &awards {
        print_ceremony_award(view);
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Print `value` as JSON, or run `pretty` for the human-readable form
fn emit<T: Serialize>(json: bool, value: &T, pretty: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        pretty();
    }
    Ok(())
}

fn person_label(name: Option<&str>, id: PersonId) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("person {}", id),
    }
}

fn print_crew(category: Category, views: &[AssignmentView]) {
    println!("{}", format!("{}:", category).bold());
    if views.is_empty() {
        println!("  (none)");
    }
    for view in views {
        println!(
            "  {}{} as {} [#{}]",
            "• ".green(),
            person_label(view.person.name.as_deref(), view.person.id),
            view.role,
            view.id.unwrap_or_default()
        );
    }
}

fn print_cast(views: &[CastAssignmentView]) {
    println!("{}", "cast:".bold());
    if views.is_empty() {
        println!("  (none)");
    }
    for view in views {
        println!(
            "  {}. {} as {} [#{}]",
            view.rank.to_string().green(),
            person_label(view.person.name.as_deref(), view.person.id),
            view.role,
            view.id.unwrap_or_default()
        );
    }
}

fn print_ceremony_award(view: &CeremonyAwardView) {
    println!("{}", format!("{}:", view.ceremony.name).bold());
    for award in &view.awards {
        let awardees = award
            .awardees
            .iter()
            .map(|p| person_label(p.name.as_deref(), p.id))
            .collect::<Vec<_>>()
            .join(", ");
        let year = award.year.map(|y| format!(" {}", y)).unwrap_or_default();
        println!("  {}{}{} - {}", "• ".cyan(), award.name, year, awardees);
    }
}

fn print_credits(person_id: PersonId, credits: &[CreditView]) {
    println!("{}", format!("Credits of person {}:", person_id).bold().blue());
    if credits.is_empty() {
        println!("  (none)");
    }
    for credit in credits {
        let rank = credit.rank.map(|r| format!(" (#{})", r)).unwrap_or_default();
        println!(
            "  {}{} - {}: {}{}",
            "• ".green(),
            credit.movie_title,
            credit.section,
            credit.label,
            rank
        );
    }
}
