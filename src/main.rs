mod catalog;
mod cli;
mod db;
mod deposit;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod months;
mod reports;
mod resolver;
mod selection;
mod settings;
mod students;
mod transport;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FeesCommands, ReportCommands, StudentsCommands, TransportCommands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bursar=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            school_id,
            school_name,
            session_start,
            session,
        } => cli::init::run(data_dir, school_id, school_name, session_start, session),
        Commands::Status => cli::status::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Students { command } => match command {
            StudentsCommands::Add {
                student_id,
                name,
                class_name,
                section,
                admission_no,
                roll_no,
                session,
            } => cli::students::add(cli::students::AddArgs {
                student_id,
                name,
                class_name,
                section,
                admission_no,
                roll_no,
                session,
            }),
            StudentsCommands::List { class_name, session } => {
                cli::students::list(class_name.as_deref(), session.as_deref())
            }
        },
        Commands::Transport { command } => match command {
            TransportCommands::AddVehicle {
                vehicle_no,
                route,
                price,
            } => cli::transport::add_vehicle(&vehicle_no, &route, price),
            TransportCommands::Assign {
                vehicle_no,
                student_ids,
                session,
            } => cli::transport::assign(&vehicle_no, &student_ids, session.as_deref()),
            TransportCommands::Unassign { student_id, session } => {
                cli::transport::unassign(&student_id, session.as_deref())
            }
            TransportCommands::List { session } => cli::transport::list(session.as_deref()),
        },
        Commands::Fees { command } => match command {
            FeesCommands::Add {
                fee_type,
                class_name,
                month,
                amount,
                dynamic,
                session,
            } => cli::fees::add(&fee_type, &class_name, &month, amount, dynamic, session.as_deref()),
            FeesCommands::Import { file } => cli::fees::import(&file),
            FeesCommands::List { class_name, session } => {
                cli::fees::list(class_name.as_deref(), session.as_deref())
            }
            FeesCommands::Show {
                student_id,
                month,
                session,
                today,
            } => cli::fees::show(&student_id, &month, session.as_deref(), today.as_deref()),
        },
        Commands::Dues { student_id, session } => cli::dues::run(&student_id, session.as_deref()),
        Commands::Deposit {
            student_id,
            months,
            session,
            today,
            dry_run,
        } => cli::deposit::run(&student_id, &months, session.as_deref(), today.as_deref(), dry_run),
        Commands::Receipt {
            receipt_no,
            output,
            format,
        } => cli::receipt::run(&receipt_no, output.as_deref(), format.as_deref()),
        Commands::Report { command } => match command {
            ReportCommands::Dues {
                class_name,
                session,
                today,
            } => cli::report::dues(&class_name, session.as_deref(), today.as_deref()),
            ReportCommands::Collection { session } => cli::report::collection(session.as_deref()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
