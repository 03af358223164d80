use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clinic_core::{
    config::doctor_emails_from_env_value,
    constants::{DEFAULT_DATA_DIR, DEFAULT_SLOT_CATALOGUE},
    Appointment, AppointmentService, CoreConfig, DocumentStore, ProjectionStatus,
    StaticDirectory,
};

type Service = AppointmentService<DocumentStore>;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic appointment queue administration CLI")]
struct Cli {
    /// Document store directory
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// YAML file listing doctors and users
    #[arg(long, env = "CLINIC_DIRECTORY_FILE")]
    directory: Option<PathBuf>,
    /// Extra doctor emails (comma-separated)
    #[arg(long, env = "CLINIC_DOCTORS")]
    doctors: Option<String>,
    /// Appointments per slot
    #[arg(long, env = "CLINIC_SLOT_CAPACITY", default_value_t = 4)]
    capacity: u32,
    /// Consultation length in minutes, for time estimates
    #[arg(long, env = "CLINIC_MINUTES_PER_PATIENT", default_value_t = 15)]
    minutes_per_patient: u32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List slots with spare capacity
    Slots {
        doctor_email: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
    /// Show occupancy of one slot
    Check {
        doctor_email: String,
        date: String,
        /// Slot label, e.g. 09:00-10:00
        time: String,
    },
    /// Show a doctor's queue
    Queue { doctor_email: String },
    /// Show a doctor's pending requests, oldest first
    Requests { doctor_email: String },
    /// Approve a pending request
    Approve { appointment_id: String },
    /// Reject a pending request
    Reject {
        appointment_id: String,
        /// Reason shown to the patient
        #[arg(long)]
        reason: Option<String>,
    },
    /// Mark an approved appointment completed
    Complete { appointment_id: String },
    /// Cancel an appointment and renumber its slot
    Cancel { appointment_id: String },
    /// Move an appointment to another slot
    Reschedule {
        appointment_id: String,
        date: String,
        time: String,
    },
    /// Renumber a slot's approved appointments in booking order
    Resequence {
        doctor_email: String,
        date: String,
        time: String,
    },
    /// Re-run the patient-record update for a completed appointment
    Repair { appointment_id: String },
    /// Show a patient's record
    Patient { email: String },
}

fn build_service(cli: &Cli) -> Result<Service, Box<dyn std::error::Error>> {
    let directory = match &cli.directory {
        Some(path) => StaticDirectory::load(path)?,
        None => StaticDirectory::new(),
    };
    let mut doctors = doctor_emails_from_env_value(cli.doctors.clone())?;
    doctors.extend(directory.doctor_emails());

    let cfg = CoreConfig::new(
        cli.capacity,
        DEFAULT_SLOT_CATALOGUE.iter().map(|s| s.to_string()).collect(),
        doctors,
        cli.minutes_per_patient,
    )?;
    let store = DocumentStore::open(&cli.data_dir)?;
    let directory = Arc::new(directory);

    Ok(AppointmentService::new(
        Arc::new(cfg),
        Arc::new(store),
        directory.clone(),
        directory,
    ))
}

fn print_appointment(service: &Service, a: &Appointment) {
    let serial = a
        .serial_number
        .map(|n| format!("#{n}"))
        .unwrap_or_else(|| "-".into());
    let eta = service
        .estimated_time(a)
        .map(|t| format!(" ~{t}"))
        .unwrap_or_default();
    println!(
        "{} {} {} {:>3}{} {} ({}) {}",
        a.id, a.appointment_date, a.appointment_time, serial, eta, a.patient_name, a.patient_id,
        a.status
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        println!("Use 'clinic --help' for commands");
        return Ok(());
    };
    let service = build_service(&cli)?;

    match command {
        Commands::Slots { doctor_email, date } => {
            let slots = service.available_slots(doctor_email, date, None).await?;
            if slots.is_empty() {
                println!("No free slots.");
            }
            for slot in slots {
                println!("{slot}");
            }
        }
        Commands::Check {
            doctor_email,
            date,
            time,
        } => {
            let s = service.check_slot(doctor_email, date, time, None).await?;
            println!(
                "{time}: {}/{} occupied, {}",
                s.occupied,
                s.capacity,
                if s.available { "available" } else { "full" }
            );
        }
        Commands::Queue { doctor_email } => {
            for a in service.doctor_queue(doctor_email).await? {
                print_appointment(&service, &a);
            }
        }
        Commands::Requests { doctor_email } => {
            for a in service.pending_requests(doctor_email).await? {
                print_appointment(&service, &a);
            }
        }
        Commands::Approve { appointment_id } => {
            let a = service.approve(appointment_id).await?;
            print_appointment(&service, &a);
        }
        Commands::Reject {
            appointment_id,
            reason,
        } => {
            let a = service.reject(appointment_id, reason.clone()).await?;
            print_appointment(&service, &a);
        }
        Commands::Complete { appointment_id } => {
            let outcome = service.complete(appointment_id).await?;
            print_appointment(&service, &outcome.appointment);
            match &outcome.projection {
                ProjectionStatus::Failed(msg) => {
                    eprintln!("Patient record not updated: {msg}");
                    eprintln!("Run 'clinic repair {appointment_id}' to retry.");
                }
                status => println!("Patient record: {}", status.as_str()),
            }
        }
        Commands::Cancel { appointment_id } => {
            let change = service.cancel(appointment_id).await?;
            print_appointment(&service, &change.appointment);
            for a in &change.resequenced {
                print_appointment(&service, a);
            }
        }
        Commands::Reschedule {
            appointment_id,
            date,
            time,
        } => {
            let change = service
                .reschedule(appointment_id, Some(date), Some(time), None)
                .await?;
            print_appointment(&service, &change.appointment);
            for a in &change.resequenced {
                print_appointment(&service, a);
            }
        }
        Commands::Resequence {
            doctor_email,
            date,
            time,
        } => {
            for a in service.resequence_slot(doctor_email, date, time).await? {
                print_appointment(&service, &a);
            }
        }
        Commands::Repair { appointment_id } => {
            let outcome = service.repair_projection(appointment_id).await?;
            println!(
                "Patient record for {}: {}",
                outcome.appointment.patient_email,
                outcome.projection.as_str()
            );
        }
        Commands::Patient { email } => {
            let record = service.patient_record(email).await?;
            println!(
                "{} ({}) <{}>: {} visits",
                record.patient_name, record.patient_id, record.patient_email, record.visits
            );
            for visit in &record.appointments {
                println!(
                    "  {} {} {} with {}",
                    visit.date, visit.time, visit.status, visit.doctor_name
                );
            }
            for p in &record.prescriptions {
                println!(
                    "  {} {}: {} {} ({})",
                    p.appointment_date, p.diagnosis, p.medications, p.dosage, p.instructions
                );
            }
        }
    }

    Ok(())
}
