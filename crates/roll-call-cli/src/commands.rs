use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "roll-call")]
#[command(about = "Fingerprint attendance with a simulated scanner", long_about = None)]
pub struct Cli {
    /// Admin password for privileged commands (prompted for when omitted)
    #[arg(
        long,
        global = true,
        env = "ROLL_CALL_ADMIN_PASSWORD",
        hide_env_values = true
    )]
    pub admin_password: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct StudentArgs {
    /// Student id, also the key of the enrolled fingerprint
    pub student_id: String,
    #[arg(long)]
    pub name: String,
    #[arg(long = "class")]
    pub class_name: String,
    #[arg(long)]
    pub roll: String,
    #[arg(long)]
    pub course: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the admin password
    LoginCheck,
    /// Capture three readings and register a fingerprint template
    Enroll { student_id: String },
    /// Add a student whose fingerprint is already enrolled
    AddStudent(StudentArgs),
    /// Replace a student's details
    UpdateStudent(StudentArgs),
    /// Delete a student and their fingerprint (attendance history is kept)
    RemoveStudent {
        student_id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// List students, optionally filtered by a search term
    Students {
        #[arg(long)]
        search: Option<String>,
    },
    /// Scan a finger and mark attendance
    Scan {
        /// Present the enrolled finger of this student instead of a random one
        #[arg(long = "as", value_name = "STUDENT_ID")]
        as_student: Option<String>,
    },
    /// Show the attendance window and its current state
    Status,
    /// Show today's attendance counters
    Dashboard,
    /// Show attendance for the last seven days
    Weekly,
    /// Monthly attendance report for the current year
    Report {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long = "class")]
        class_name: Option<String>,
        /// Write the report as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Attendance summary for one student
    Student { student_id: String },
    /// List attendance records
    Records {
        /// Only records of this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "class")]
        class_name: Option<String>,
        /// Write the records as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Set the daily attendance window (HH:MM HH:MM)
    SetWindow { start: String, end: String },
    /// Set the late threshold in minutes after the window opens
    SetThreshold { minutes: u32 },
    /// Start accepting check-ins
    Start,
    /// Stop accepting check-ins
    Stop,
    /// Change the admin password
    ChangePassword,
    /// Write a JSON backup of all data
    Backup {
        /// Output file (defaults to attendance_backup_<date>.json)
        output: Option<PathBuf>,
    },
    /// Overwrite all data from a JSON backup
    Restore {
        input: PathBuf,
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every attendance record
    ResetRecords {
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete all data, settings included
    ClearAll {
        #[arg(short, long)]
        yes: bool,
    },
    /// Print configuration values
    PrintConfig,
}
