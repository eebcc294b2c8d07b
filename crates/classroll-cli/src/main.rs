use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, Duration, Utc};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use dotenvy::dotenv;
use uuid::Uuid;

use classroll::modules::coordinator::Coordinator;
use classroll_cli::seeder::{self, SeedConfig};
use classroll_config::{DatabaseConfig, SchedulingConfig};
use classroll_core::SystemClock;
use classroll_db::{MIGRATOR, PgPool, PgStore, init_db_pool};
use classroll_models::{Actor, ClassId, Role, UserId};

#[derive(Parser)]
#[command(name = "classroll-cli")]
#[command(about = "Classroll CLI - Administrative tools for Classroll", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Seed the database with fake users, courses, sections and enrollments
    Seed {
        /// Number of students to create
        #[arg(short = 's', long, default_value = "200")]
        students: usize,

        /// Number of teachers to create
        #[arg(short = 't', long, default_value = "12")]
        teachers: usize,

        /// Number of courses to create
        #[arg(short = 'c', long, default_value = "20")]
        courses: usize,

        /// Number of sections per course
        #[arg(long, default_value = "2")]
        sections: usize,

        /// Enrollment attempts per student
        #[arg(long, default_value = "4")]
        enrollments: usize,
    },
    /// Recount seat-holding enrollments and repair drifted counters
    Reconcile {
        /// Only check this class section
        #[arg(long)]
        class_id: Option<Uuid>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Clear all seeded data
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroll=warn,classroll_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db_config = DatabaseConfig::from_env();
    if db_config.url.is_empty() {
        anyhow::bail!("DATABASE_URL must be set");
    }
    let pool = init_db_pool(&db_config)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Migrate => handle_migrate(&pool).await,
        Commands::Seed {
            students,
            teachers,
            courses,
            sections,
            enrollments,
        } => {
            let coordinator = coordinator(&pool, &db_config);
            let next_month = Utc::now().date_naive() + Duration::days(30);
            let term_start = next_month
                .with_day(1)
                .unwrap_or(next_month);

            let config = SeedConfig {
                students,
                teachers,
                courses,
                sections_per_course: sections,
                enrollments_per_student: enrollments,
                term_start,
            };
            handle_seed(&pool, &coordinator, config).await
        }
        Commands::Reconcile { class_id, yes } => {
            let coordinator = coordinator(&pool, &db_config);
            handle_reconcile(&coordinator, class_id.map(ClassId::from), yes).await
        }
        Commands::ClearSeed { yes } => handle_clear_seed(&pool, yes).await,
    }
}

fn coordinator(pool: &PgPool, db_config: &DatabaseConfig) -> Coordinator {
    Coordinator::new(
        Arc::new(PgStore::new(pool.clone(), db_config.lock_timeout)),
        Arc::new(SystemClock),
        SchedulingConfig::from_env(),
    )
}

/// The CLI runs with operator rights; it is not a directory user.
fn operator() -> Actor {
    Actor::new(UserId::from(Uuid::nil()), Role::Manager)
}

fn confirm(prompt: &str, skip: bool) -> anyhow::Result<bool> {
    if skip {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

async fn handle_migrate(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await.context("Migration failed")?;
    println!("✅ Migrations applied");
    Ok(())
}

async fn handle_seed(
    pool: &PgPool,
    coordinator: &Coordinator,
    config: SeedConfig,
) -> anyhow::Result<()> {
    println!("\n🌱 Seeding term starting {}\n", config.term_start);

    let summary = seeder::seed_all(pool, coordinator, config).await?;

    println!("\n   Users:        {}", summary.users);
    println!("   Courses:      {}", summary.courses);
    println!(
        "   Sections:     {} ({} without teacher)",
        summary.sections, summary.sections_without_teacher
    );
    println!(
        "   Enrollments:  {} ({} rejected)",
        summary.enrollments, summary.rejected_enrollments
    );
    Ok(())
}

async fn handle_reconcile(
    coordinator: &Coordinator,
    class_id: Option<ClassId>,
    yes: bool,
) -> anyhow::Result<()> {
    let scope = match class_id {
        Some(id) => format!("class {id}"),
        None => "every class".to_string(),
    };
    if !confirm(&format!("Reconcile enrollment counters for {scope}?"), yes)? {
        println!("Aborted");
        return Ok(());
    }

    let report = coordinator.reconcile(&operator(), class_id).await?;

    println!("\n✅ Checked {} classes", report.classes_checked);
    for correction in &report.corrections {
        println!(
            "   ✓ {}: {} -> {}",
            correction.class_id, correction.recorded, correction.actual
        );
    }
    for class_id in &report.over_capacity {
        println!("   ⚠ {}: seat holders exceed capacity, left untouched", class_id);
    }
    if report.corrections.is_empty() && report.over_capacity.is_empty() {
        println!("   All counters in sync");
    }
    Ok(())
}

async fn handle_clear_seed(pool: &PgPool, yes: bool) -> anyhow::Result<()> {
    if !confirm("Delete all seeded courses, sections, enrollments and users?", yes)? {
        println!("Aborted");
        return Ok(());
    }

    let users = seeder::clear_seed(pool).await?;
    println!("✅ Cleared seed data ({} users removed)", users);
    Ok(())
}
