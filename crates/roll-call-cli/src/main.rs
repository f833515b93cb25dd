mod commands;
mod logging;
mod progress;

use std::fs::{self, File};
use std::io::{self, Write};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, StudentArgs};
use console::Term;
use dotenv::dotenv;
use progress::CliReporter;
use roll_call_core::backup::backup_to_json;
use roll_call_core::biometric::MockScanner;
use roll_call_core::reporting::{write_report_csv, RecordFilter, Standing};
use roll_call_core::storage::models::parse_time_of_day;
use roll_call_core::{
    AdminSession, AppConfig, AttendanceEngine, AttendanceStatus, Database, NewStudent,
    ScanOutcome, WindowStatus,
};
use tracing::{error, info};

/// Noise applied to a presented finger so repeated scans are not bit-identical.
const PRESENTED_NOISE_BITS: usize = 5;

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match roll_call_core::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Commands::PrintConfig = command {
        println!("Configuration: {:?}", config);
        return;
    }

    if let Err(err) = run(command, args.admin_password, &config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(command: Commands, admin_password: Option<String>, config: &AppConfig) -> Result<()> {
    let engine = AttendanceEngine::open(config.clone())
        .with_context(|| format!("opening {}", config.database_path))?;
    let password = Password(admin_password);

    match command {
        Commands::LoginCheck => {
            password.session(&engine)?;
            println!("{}", "Admin password accepted".green());
        }
        Commands::Enroll { student_id } => {
            password.session(&engine)?;
            run_enroll(&engine, config, &student_id)?
        }
        Commands::AddStudent(args) => {
            let session = password.session(&engine)?;
            let profile = engine.add_student(&session, new_student(args))?;
            println!("{} {} added", "✓".green(), profile.name);
        }
        Commands::UpdateStudent(args) => {
            let session = password.session(&engine)?;
            let profile = engine.update_student(&session, new_student(args))?;
            println!("{} {} updated", "✓".green(), profile.name);
        }
        Commands::RemoveStudent { student_id, yes } => {
            let session = password.session(&engine)?;
            if !yes
                && !prompt_confirm(
                    &format!("Delete student {} and their fingerprint?", student_id),
                    Some(false),
                )?
            {
                return Ok(());
            }
            if engine.remove_student(&session, &student_id)? {
                println!("{} {} removed", "✓".green(), student_id);
            } else {
                println!("No student with id {}", student_id);
            }
        }
        Commands::Students { search } => print_students(&engine, search.as_deref())?,
        Commands::Scan { as_student } => run_scan(&engine, config, &password, as_student)?,
        Commands::Status => print_status(&engine)?,
        Commands::Dashboard => print_dashboard(&engine)?,
        Commands::Weekly => print_weekly(&engine)?,
        Commands::Report {
            month,
            class_name,
            csv,
        } => {
            let report = engine.monthly_report(month, class_name.as_deref())?;
            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                let rows = write_report_csv(&report, file)?;
                info!("Wrote {} report rows to {}", rows, path.display());
            } else {
                print_report(&report);
            }
        }
        Commands::Student { student_id } => match engine.student_summary(&student_id)? {
            Some(summary) => println!(
                "{}: present {} of {} days ({}%)",
                student_id, summary.present_days, summary.total_days, summary.percentage
            ),
            None => println!("No student with id {}", student_id),
        },
        Commands::Records {
            date,
            class_name,
            csv,
        } => {
            let filter = RecordFilter { date, class_name };
            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                let rows = engine.export_records_csv(&filter, file)?;
                info!("Exported {} records to {}", rows, path.display());
            } else {
                print_records(&engine, &filter)?;
            }
        }
        Commands::SetWindow { start, end } => {
            let session = password.session(&engine)?;
            let start = parse_time_of_day(&start)
                .ok_or_else(|| anyhow!("start time '{}' is not HH:MM", start))?;
            let end = parse_time_of_day(&end)
                .ok_or_else(|| anyhow!("end time '{}' is not HH:MM", end))?;
            engine.set_window(&session, start, end)?;
            print_status(&engine)?;
        }
        Commands::SetThreshold { minutes } => {
            let session = password.session(&engine)?;
            engine.set_late_threshold(&session, minutes)?;
            print_status(&engine)?;
        }
        Commands::Start => {
            let session = password.session(&engine)?;
            engine.set_active(&session, true)?;
            print_status(&engine)?;
        }
        Commands::Stop => {
            let session = password.session(&engine)?;
            engine.set_active(&session, false)?;
            print_status(&engine)?;
        }
        Commands::ChangePassword => {
            let session = password.session(&engine)?;
            let new_password = prompt_secret("New admin password: ")?;
            let confirmation = prompt_secret("Repeat new password: ")?;
            if new_password != confirmation {
                bail!("passwords do not match");
            }
            engine.change_password(&session, &new_password)?;
            println!("{}", "Password changed".green());
        }
        Commands::Backup { output } => {
            let document = engine.backup()?;
            let path = output.unwrap_or_else(|| {
                format!(
                    "attendance_backup_{}.json",
                    document.backup_date.format("%Y-%m-%d")
                )
                .into()
            });
            fs::write(&path, backup_to_json(&document)?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "{} Backed up {} students and {} records to {}",
                "✓".green(),
                document.students.len(),
                document.attendance.len(),
                path.display()
            );
        }
        Commands::Restore { input, yes } => {
            let session = password.session(&engine)?;
            let json = fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            if !yes
                && !prompt_confirm(
                    "Are you sure you want to restore data? This will overwrite current data.",
                    Some(false),
                )?
            {
                return Ok(());
            }
            let plan = engine.restore(&session, &json)?;
            println!(
                "{} Restored {} students, {} fingerprints and {} records",
                "✓".green(),
                plan.students.len(),
                plan.fingerprints.len(),
                plan.attendance.len()
            );
        }
        Commands::ResetRecords { yes } => {
            let session = password.session(&engine)?;
            if yes || prompt_confirm("Delete ALL attendance records?", Some(false))? {
                let cleared = engine.reset_records(&session)?;
                println!("{} records deleted", cleared);
            }
        }
        Commands::ClearAll { yes } => {
            let session = password.session(&engine)?;
            if yes
                || prompt_confirm(
                    "Are you sure you want to clear all data? This cannot be undone!",
                    Some(false),
                )?
            {
                engine.clear_all(&session)?;
                println!("All data cleared");
            }
        }
        Commands::PrintConfig => println!("Configuration: {:?}", config),
    }

    Ok(())
}

/// Admin password from the command line, or prompted for on first use.
struct Password(Option<String>);

impl Password {
    fn session(&self, engine: &AttendanceEngine<Database>) -> Result<AdminSession> {
        let password = match &self.0 {
            Some(password) => password.clone(),
            None => prompt_secret("Admin password: ")?,
        };
        let session = engine.login(&password)?;
        if !session.is_verified() {
            bail!("incorrect admin password");
        }
        Ok(session)
    }
}

fn new_student(args: StudentArgs) -> NewStudent {
    NewStudent {
        id: args.student_id,
        name: args.name,
        class_name: args.class_name,
        roll_no: args.roll,
        course: args.course,
        email: args.email,
    }
}

fn run_enroll(
    engine: &AttendanceEngine<Database>,
    config: &AppConfig,
    student_id: &str,
) -> Result<()> {
    let mut scanner = MockScanner::new().with_delay(config.capture_delay());
    let reporter = CliReporter::new();
    let template = engine.enroll(student_id, &mut scanner, &reporter)?;
    if !engine.students()?.contains_key(student_id.trim()) {
        println!(
            "Next: roll-call add-student {} --name <NAME> --class <CLASS> --roll <ROLL>",
            student_id.trim()
        );
    }
    info!(
        "Template for {} built from {} readings",
        student_id.trim(),
        template.source_readings.len()
    );
    Ok(())
}

fn run_scan(
    engine: &AttendanceEngine<Database>,
    config: &AppConfig,
    password: &Password,
    as_student: Option<String>,
) -> Result<()> {
    let session = password.session(engine)?;
    let mut scanner = MockScanner::new().with_delay(config.capture_delay());
    if let Some(student_id) = as_student {
        let template = engine
            .template(&student_id)?
            .ok_or_else(|| anyhow!("no fingerprint enrolled for {}", student_id))?;
        scanner = scanner.presenting(template.base_pattern, PRESENTED_NOISE_BITS);
    }

    let reporter = CliReporter::new();
    match engine.scan(&session, &mut scanner, &reporter)? {
        ScanOutcome::Marked(record) => {
            let status = match record.status {
                AttendanceStatus::OnTime => record.status.label().green(),
                AttendanceStatus::Late => record.status.label().yellow(),
            };
            println!(
                "{} {} ({}) checked in at {} - {}",
                "✓".green(),
                record.student_name.bold(),
                record.class_name,
                record.check_in_at.format("%H:%M:%S"),
                status
            );
        }
        ScanOutcome::Rejected(rejection) => {
            println!("{} {}", "✗".red(), rejection.to_string().red());
        }
    }
    Ok(())
}

fn print_students(engine: &AttendanceEngine<Database>, search: Option<&str>) -> Result<()> {
    let students = match search {
        Some(term) => engine.search_students(term)?,
        None => engine.students()?.into_iter().collect(),
    };
    if students.is_empty() {
        println!("No students found");
        return Ok(());
    }
    println!(
        "{:<12} {:<24} {:<10} {:<8} {}",
        "ID".bold(),
        "Name".bold(),
        "Class".bold(),
        "Roll".bold(),
        "Joined".bold()
    );
    for (student_id, student) in &students {
        println!(
            "{:<12} {:<24} {:<10} {:<8} {}",
            student_id,
            student.name,
            student.class_name,
            student.roll_no,
            student.joined_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn print_status(engine: &AttendanceEngine<Database>) -> Result<()> {
    let settings = engine.settings()?;
    let status = engine.window_status()?;
    let label = match status {
        WindowStatus::InProgress => status.to_string().green(),
        WindowStatus::NotStarted => status.to_string().yellow(),
        WindowStatus::Closed | WindowStatus::Inactive => status.to_string().red(),
    };
    println!(
        "Window {}-{}, late after {} minutes: {}",
        settings.window_start.format("%H:%M"),
        settings.window_end.format("%H:%M"),
        settings.late_threshold_minutes,
        label
    );
    Ok(())
}

fn print_dashboard(engine: &AttendanceEngine<Database>) -> Result<()> {
    let counters = engine.dashboard_snapshot()?;
    println!("Students:   {}", counters.total_students.to_string().cyan());
    println!("Present:    {}", counters.present_today.to_string().green());
    println!("  On time:  {}", counters.on_time_today);
    println!("  Late:     {}", counters.late_today.to_string().yellow());
    println!("Absent:     {}", counters.absent_today.to_string().red());
    Ok(())
}

fn print_weekly(engine: &AttendanceEngine<Database>) -> Result<()> {
    for day in engine.weekly_series()? {
        let bar = "█".repeat((day.percentage / 5) as usize);
        println!(
            "{} {:>4}% {:>3} {}",
            day.date.format("%a %Y-%m-%d"),
            day.percentage,
            day.count,
            bar.cyan()
        );
    }
    Ok(())
}

fn print_report(report: &roll_call_core::reporting::MonthlyReport) {
    println!(
        "{}-{:02}{}",
        report.year,
        report.month,
        report
            .class_filter
            .as_deref()
            .map(|class| format!(" ({})", class))
            .unwrap_or_default()
    );
    for row in &report.rows {
        let standing = match row.standing {
            Standing::Good => row.standing.to_string().green(),
            Standing::Low => row.standing.to_string().red(),
        };
        println!(
            "{:<12} {:<24} {:<10} {:>3}/{:<3} {:>4}% {}",
            row.student_id,
            row.name,
            row.class_name,
            row.present_days,
            row.total_days,
            row.percentage,
            standing
        );
    }
    println!(
        "{} students, {} present days, {} on average",
        report.summary.total_students,
        report.summary.total_present_days,
        report.summary.average_present_days
    );
}

fn print_records(engine: &AttendanceEngine<Database>, filter: &RecordFilter) -> Result<()> {
    let records = engine.records(filter)?;
    if records.is_empty() {
        println!("No attendance records");
        return Ok(());
    }
    for record in &records {
        let status = match record.status {
            AttendanceStatus::OnTime => record.status.label().green(),
            AttendanceStatus::Late => record.status.label().yellow(),
        };
        println!(
            "{} {:<12} {:<24} {:<10} {}",
            record.check_in_at.format("%Y-%m-%d %H:%M"),
            record.student_id,
            record.student_name,
            record.class_name,
            status
        );
    }
    Ok(())
}

fn prompt_secret(prompt: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(prompt)?;
    Ok(term.read_secure_line()?)
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
