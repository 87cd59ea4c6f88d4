use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use onboarding_scheduler::config::AppConfig;
use onboarding_scheduler::display::print_schedule;
use onboarding_scheduler::form::{export_filename, schedule_to_csv_bytes, validate_request, GenerateRequest};
use onboarding_scheduler::parser::{load_pinned, load_template};
use onboarding_scheduler::schedule::{generate_schedule, Contact, PlacementContext};
use onboarding_scheduler::logging;
use onboarding_scheduler::web::{start_server, AppState};

#[derive(Parser)]
#[command(name = "onboarding-scheduler", about = "Builds day-by-day onboarding calendars for new hires")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a schedule from a template file
    Generate {
        /// Onboarding template (.xlsx with one sheet per role, or .csv with a Role column)
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        role: String,
        /// First working day, YYYY-MM-DD
        #[arg(long)]
        hire_date: NaiveDate,
        #[arg(long)]
        newcomer_name: String,
        #[arg(long)]
        newcomer_email: String,
        #[arg(long)]
        manager1_name: String,
        #[arg(long)]
        manager1_email: String,
        #[arg(long, default_value = "")]
        manager2_name: String,
        #[arg(long, default_value = "")]
        manager2_email: String,
        /// CSV of manager-pinned appointments
        #[arg(long)]
        pinned: Option<PathBuf>,
        /// Where to write the CSV export (defaults to <Newcomer_Name>_schedule.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the roles a template defines
    Roles {
        #[arg(long)]
        template: PathBuf,
    },
    /// Run the web interface
    Web {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Commands::Web { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let state = AppState::new(config.calendar()?, config.max_search_days);
            println!("Access the site at http://localhost:{}", config.port);
            start_server(&config, state).await?;
        }
        Commands::Roles { template } => {
            for role in load_template(&template)?.roles() {
                println!("{}", role);
            }
        }
        Commands::Generate {
            template,
            role,
            hire_date,
            newcomer_name,
            newcomer_email,
            manager1_name,
            manager1_email,
            manager2_name,
            manager2_email,
            pinned,
            output,
        } => {
            let appointments = load_template(&template)?.for_role(&role)?;
            let pinned = match pinned {
                Some(path) => load_pinned(path)?,
                None => Vec::new(),
            };
            let request = GenerateRequest {
                role,
                hire_date,
                newcomer: Contact::new(newcomer_name, newcomer_email),
                manager1: Contact::new(manager1_name, manager1_email),
                manager2: Contact::non_blank(&manager2_name, &manager2_email),
                appointments,
                pinned,
            };

            let parties = validate_request(&request)?;
            let calendar = config.calendar()?;
            let ctx = PlacementContext::new(&calendar, request.hire_date, &parties)
                .with_max_search_days(config.max_search_days);
            let entries = generate_schedule(&ctx, &request.ordered_appointments(), &request.pinned)?;

            print_schedule(&format!("{} - {}", parties.newcomer.name, request.role), &entries)?;

            let output = output.unwrap_or_else(|| PathBuf::from(export_filename(&parties.newcomer.name)));
            std::fs::write(&output, schedule_to_csv_bytes(&entries)?)?;
            info!(path = %output.display(), "schedule written");
            println!("\nSchedule saved to {}", output.display());
        }
    }

    Ok(())
}
