use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use clap::{Parser, Subcommand};
use clinic_booking::{
    db,
    models::slot::{format_date, format_time, parse_date, parse_time},
    repositories::{SlotRepository, SqliteSlotRepository, SqliteUserRepository},
    services::{
        user_service::{CreateUserRequest, UpdatePasswordRequest, UserService},
        AppointmentService, BookingValidator, Clock, SystemClock,
    },
};

const DEFAULT_SLOT_TIMES: &str = "09:00,10:00,11:00,12:00,15:00,16:00,17:00";

#[derive(Parser)]
#[command(name = "clinic-cli")]
#[command(about = "Administration tool for the clinic booking site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Bookable slot management
    Slots {
        #[command(subcommand)]
        command: SlotCommands,
    },
    /// Clinic-side appointment actions
    Appointments {
        #[command(subcommand)]
        command: AppointmentCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List all users
    List {
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Delete a user and their appointments
    Delete {
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password for a user
    SetPassword {
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum SlotCommands {
    /// Open the given times on a run of consecutive days
    Seed {
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        from: Option<String>,

        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Comma-separated HH:MM list
        #[arg(long, default_value = DEFAULT_SLOT_TIMES)]
        times: String,

        /// Skip Saturdays and Sundays
        #[arg(long)]
        weekdays_only: bool,
    },

    /// Show the slots of one day
    List {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Make a slot bookable
    Open {
        #[arg(long)]
        date: String,

        #[arg(long)]
        time: String,
    },

    /// Withdraw a slot; existing appointments are kept
    Close {
        #[arg(long)]
        date: String,

        #[arg(long)]
        time: String,
    },
}

#[derive(Subcommand)]
enum AppointmentCommands {
    /// Mark a confirmed appointment as completed
    Complete {
        #[arg(long)]
        id: i64,
    },
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<(String, String)> {
    match password {
        Some(pw) => Ok((pw.clone(), pw)),
        None => {
            let password = get_password("Password")?;
            let confirm = get_password("Confirm password")?;
            Ok((password, confirm))
        }
    }
}

fn parse_times(list: &str) -> anyhow::Result<Vec<NaiveTime>> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| parse_time(t).with_context(|| format!("invalid time '{t}', expected HH:MM")))
        .collect()
}

fn parse_day(value: Option<String>, clock: &dyn Clock) -> anyhow::Result<NaiveDate> {
    match value {
        Some(value) => parse_date(&value)
            .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD")),
        None => Ok(clock.today()),
    }
}

fn parse_slot(date: &str, time: &str) -> anyhow::Result<(NaiveDate, NaiveTime)> {
    let date = parse_date(date).with_context(|| format!("invalid date '{date}'"))?;
    let time = parse_time(time).with_context(|| format!("invalid time '{time}'"))?;
    Ok((date, time))
}

async fn run_user_command(user_service: &UserService, command: UserCommands) -> anyhow::Result<()> {
    match command {
        UserCommands::Create {
            name,
            email,
            phone,
            password,
        } => {
            let (password, password_confirm) = password_or_prompt(password)?;
            let user = user_service
                .create_user(CreateUserRequest {
                    name,
                    email,
                    phone,
                    password,
                    password_confirm: Some(password_confirm),
                })
                .await?;

            println!("User created");
            println!("  ID:    {}", user.id);
            println!("  Name:  {}", user.name);
            println!("  Email: {}", user.email);
        }
        UserCommands::List { limit, offset } => {
            let users = user_service.list_users(Some(limit), Some(offset)).await?;
            if users.is_empty() {
                println!("No users found");
                return Ok(());
            }

            println!("{:<6} {:<28} {:<32} {:<16}", "ID", "Name", "Email", "Phone");
            println!("{}", "-".repeat(84));
            for user in users {
                println!(
                    "{:<6} {:<28} {:<32} {:<16}",
                    user.id,
                    user.name,
                    user.email,
                    user.phone_or_empty()
                );
            }
        }
        UserCommands::Delete { email } => {
            let user = user_service
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            user_service.delete_user(user.id).await?;
            println!("Deleted user {} ({})", user.id, user.email);
        }
        UserCommands::SetPassword { email, password } => {
            let user = user_service
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {email}"))?;
            let (new_password, confirm) = password_or_prompt(password)?;
            user_service
                .update_password(UpdatePasswordRequest {
                    user_id: user.id,
                    current_password: None,
                    new_password,
                    new_password_confirm: Some(confirm),
                })
                .await?;
            println!("Password updated for {}", user.email);
        }
    }
    Ok(())
}

async fn run_slot_command(
    slots: &dyn SlotRepository,
    clock: &dyn Clock,
    command: SlotCommands,
) -> anyhow::Result<()> {
    match command {
        SlotCommands::Seed {
            from,
            days,
            times,
            weekdays_only,
        } => {
            if days == 0 {
                bail!("--days must be at least 1");
            }
            let first = parse_day(from, clock)?;
            let times = parse_times(&times)?;
            if times.is_empty() {
                bail!("--times must name at least one time");
            }

            let mut opened = 0;
            for offset in 0..i64::from(days) {
                let date = first + Duration::days(offset);
                if weekdays_only && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                    continue;
                }
                for time in &times {
                    slots.upsert_slot(date, *time, true).await?;
                    opened += 1;
                }
            }
            println!("Opened {opened} slots starting {}", format_date(first));
        }
        SlotCommands::List { date } => {
            let date = parse_day(date, clock)?;
            let day = slots.list_for_date(date).await?;
            if day.is_empty() {
                println!("No slots on {}", format_date(date));
                return Ok(());
            }
            for slot in day {
                let state = if slot.is_available { "open" } else { "closed" };
                println!("{} {}  {}", slot.date_label(), slot.time_label(), state);
            }
        }
        SlotCommands::Open { date, time } => {
            let (date, time) = parse_slot(&date, &time)?;
            slots.upsert_slot(date, time, true).await?;
            println!("Opened {} {}", format_date(date), format_time(time));
        }
        SlotCommands::Close { date, time } => {
            let (date, time) = parse_slot(&date, &time)?;
            slots
                .set_availability(date, time, false)
                .await
                .with_context(|| format!("no slot at {} {}", format_date(date), format_time(time)))?;
            println!("Closed {} {}", format_date(date), format_time(time));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let pool = db::create_pool().await?;
    db::migrate(&pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let user_service = UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())));
    let slot_repository = SqliteSlotRepository::new(pool.clone());
    let appointment_service = AppointmentService::new(pool, BookingValidator::new(clock.clone()));

    let cli = Cli::parse();

    match cli.command {
        Commands::User { command } => run_user_command(&user_service, command).await?,
        Commands::Slots { command } => {
            run_slot_command(&slot_repository, clock.as_ref(), command).await?
        }
        Commands::Appointments { command } => match command {
            AppointmentCommands::Complete { id } => {
                appointment_service.complete(id).await?;
                println!("Appointment #{id:04} marked as completed");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_subcommands_parse() {
        for args in [
            vec!["clinic-cli", "user", "create", "--name", "Ana", "--email", "ana@example.com"],
            vec!["clinic-cli", "user", "list"],
            vec!["clinic-cli", "user", "delete", "--email", "ana@example.com"],
            vec!["clinic-cli", "user", "set-password", "--email", "ana@example.com"],
        ] {
            let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
            assert!(matches!(cli.command, Commands::User { .. }), "{args:?}");
        }

        let cli = Cli::try_parse_from(["clinic-cli", "user", "delete", "-e", "ana@example.com"])
            .unwrap();
        match cli.command {
            Commands::User {
                command: UserCommands::Delete { email },
            } => assert_eq!(email, "ana@example.com"),
            _ => panic!("expected user delete"),
        }
    }

    #[test]
    fn test_slot_and_appointment_subcommands_parse() {
        let cli = Cli::try_parse_from(["clinic-cli", "slots", "seed", "--days", "3", "--weekdays-only"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Slots {
                command: SlotCommands::Seed { days: 3, weekdays_only: true, .. }
            }
        ));

        let cli = Cli::try_parse_from(["clinic-cli", "appointments", "complete", "--id", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Appointments {
                command: AppointmentCommands::Complete { id: 7 }
            }
        ));
    }
}
