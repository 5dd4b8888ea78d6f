//! Line-oriented command shell driving [`FleetApp`].
//!
//! Each input line is one command, split like a POSIX shell would split it
//! and parsed by clap. Record commands take named options; values containing
//! spaces go in quotes, e.g.
//! `add-booking --start 2024-06-01 --end 2024-06-03 --client "Ivan Petrov"`.
//! Passing `--id <id>` to an `add-*` command edits that record instead of
//! creating one. `help` and `<command> --help` print clap's generated help.

use crate::{
    app::FleetApp,
    backend::Backend,
    core::{auth::AuthForm, mirror::Mirror},
    entities::{Booking, Record, Transaction, Vehicle},
    errors::{Error, Result},
    presentation::views::{VehicleCard, format_amount},
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

const PROMPT: &str = "fleetdesk> ";

/// One line of shell input. Multicall: the first word is the command.
#[derive(Debug, Parser)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in
    Login {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },
    /// Create an account and sign in
    Signup {
        /// Account email
        email: String,
        /// Password, at least 6 characters
        password: String,
    },
    /// Sign out and clear local data
    Logout,
    /// Show the signed-in user's fleet
    Show,
    /// Add a vehicle, or edit one with --id
    AddVehicle(VehicleArgs),
    /// Delete a vehicle
    DeleteVehicle {
        /// Vehicle id
        id: String,
    },
    /// Add a booking, or edit one with --id
    AddBooking(BookingArgs),
    /// Delete a booking
    DeleteBooking {
        /// Booking id
        id: String,
    },
    /// Add a transaction, or edit one with --id
    AddTransaction(TransactionArgs),
    /// Delete a transaction
    DeleteTransaction {
        /// Transaction id
        id: String,
    },
    /// Set the starting balance
    SetBalance {
        /// New starting balance
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Options of `add-vehicle`.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct VehicleArgs {
    /// Vehicle to edit; omit to add a new one
    #[arg(long)]
    pub id: Option<String>,
    /// Manufacturer, required for new vehicles
    #[arg(long)]
    pub make: Option<String>,
    /// Model name, required for new vehicles
    #[arg(long)]
    pub model: Option<String>,
    /// Licence plate
    #[arg(long)]
    pub plate: Option<String>,
    /// Model year
    #[arg(long)]
    pub year: Option<i32>,
    /// Odometer reading
    #[arg(long, value_parser = non_negative)]
    pub mileage: Option<f64>,
    /// Base daily rate
    #[arg(long = "price", value_parser = non_negative)]
    pub price1: Option<f64>,
}

/// Options of `add-booking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct BookingArgs {
    /// Booking to edit; omit to add a new one
    #[arg(long)]
    pub id: Option<String>,
    /// First day (YYYY-MM-DD), required for new bookings
    #[arg(long = "start")]
    pub start_date: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD), required for new bookings
    #[arg(long = "end")]
    pub end_date: Option<NaiveDate>,
    /// Booked vehicle id
    #[arg(long = "car")]
    pub car_id: Option<String>,
    /// Client name
    #[arg(long = "client")]
    pub client_name: Option<String>,
}

/// Options of `add-transaction`.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct TransactionArgs {
    /// Transaction to edit; omit to add a new one
    #[arg(long)]
    pub id: Option<String>,
    /// Day the money moved (YYYY-MM-DD), today when omitted
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Category, required for new transactions
    #[arg(long)]
    pub category: Option<String>,
    /// Finer classification
    #[arg(long)]
    pub subcategory: Option<String>,
    /// Signed amount, required for new transactions
    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<f64>,
    /// Related vehicle id
    #[arg(long = "car")]
    pub car_id: Option<String>,
}

impl Command {
    /// Parses one input line; blank lines give `None`.
    ///
    /// Usage mistakes and help requests both come back as [`Error::Usage`]
    /// carrying the text clap rendered for them.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words = shlex::split(line)
            .ok_or_else(|| Error::validation("command", "Unterminated quote"))?;
        if words.is_empty() {
            return Ok(None);
        }
        Ok(Some(ShellLine::try_parse_from(words)?.command))
    }

    /// The command word, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Signup { .. } => "signup",
            Self::Logout => "logout",
            Self::Show => "show",
            Self::AddVehicle(_) => "add-vehicle",
            Self::DeleteVehicle { .. } => "delete-vehicle",
            Self::AddBooking(_) => "add-booking",
            Self::DeleteBooking { .. } => "delete-booking",
            Self::AddTransaction(_) => "add-transaction",
            Self::DeleteTransaction { .. } => "delete-transaction",
            Self::SetBalance { .. } => "set-balance",
            Self::Quit => "quit",
        }
    }
}

fn non_negative(raw: &str) -> std::result::Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Ok(_) => Err("must be zero or more".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Runs `command` against `app` and returns the text to print.
///
/// Failures have already been written to the page (auth error or notice)
/// when this returns `Err`.
pub async fn execute<B: Backend>(app: &mut FleetApp<B>, command: Command) -> Result<String> {
    debug!("Executing {}", command.name());
    match command {
        Command::Login { email, password } => {
            app.login(&AuthForm::new(email, password)).await?;
            Ok(format!("Signed in as {}", app.page().user_email))
        }
        Command::Signup { email, password } => {
            app.signup(&AuthForm::new(email, password)).await?;
            Ok(format!("Signed up as {}", app.page().user_email))
        }
        Command::Logout => {
            app.logout().await?;
            Ok("Signed out".to_string())
        }
        Command::Show => Ok(summary(app)),
        Command::AddVehicle(args) => {
            let mut vehicle = editable(app.store().vehicles(), args.id.as_deref())?
                .unwrap_or_default();
            args.apply(&mut vehicle);
            if vehicle.make.trim().is_empty() || vehicle.model.trim().is_empty() {
                return Err(Error::validation("make", "--make and --model are required"));
            }
            let saved = app.save(vehicle).await?;
            Ok(format!("Saved vehicle {}", saved.id.unwrap_or_default()))
        }
        Command::AddBooking(args) => {
            let mut booking = match editable(app.store().bookings(), args.id.as_deref())? {
                Some(booking) => booking,
                None => match (args.start_date, args.end_date) {
                    (Some(start), Some(end)) => Booking::new(start, end),
                    _ => {
                        return Err(Error::validation(
                            "start",
                            "--start and --end are required for a new booking",
                        ));
                    }
                },
            };
            args.apply(&mut booking);
            if booking.end_date < booking.start_date {
                return Err(Error::validation("end", "Booking ends before it starts"));
            }
            let saved = app.save(booking).await?;
            Ok(format!("Saved booking {}", saved.id.unwrap_or_default()))
        }
        Command::AddTransaction(args) => {
            let mut transaction =
                match editable(app.store().transactions(), args.id.as_deref())? {
                    Some(transaction) => transaction,
                    None => match (&args.category, args.amount) {
                        (Some(category), Some(amount)) => Transaction::new(
                            args.date.unwrap_or_else(|| Local::now().date_naive()),
                            category.clone(),
                            amount,
                        ),
                        _ => {
                            return Err(Error::validation(
                                "category",
                                "--category and --amount are required for a new transaction",
                            ));
                        }
                    },
                };
            args.apply(&mut transaction);
            let saved = app.save(transaction).await?;
            Ok(format!("Saved transaction {}", saved.id.unwrap_or_default()))
        }
        Command::DeleteVehicle { id } => Ok(deleted(app.delete::<Vehicle>(&id).await?, &id)),
        Command::DeleteBooking { id } => Ok(deleted(app.delete::<Booking>(&id).await?, &id)),
        Command::DeleteTransaction { id } => {
            Ok(deleted(app.delete::<Transaction>(&id).await?, &id))
        }
        Command::SetBalance { amount } => {
            app.update_settings(|settings| settings.starting_balance = amount)
                .await?;
            let sep = &app.config().display.thousands_separator;
            Ok(format!("Starting balance set to {}", format_amount(amount, sep)))
        }
        Command::Quit => Ok(String::new()),
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run<B: Backend>(app: &mut FleetApp<B>) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    run_with(app, input, &mut output).await
}

/// Reads commands from `input` and writes responses to `output`.
pub async fn run_with<B, R, W>(app: &mut FleetApp<B>, input: R, output: &mut W) -> Result<()>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Shell started");
    let mut lines = input.lines();
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let mut response = String::new();
        match Command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                let auth_form = matches!(command, Command::Login { .. } | Command::Signup { .. });
                match execute(app, command).await {
                    Ok(text) => response.push_str(&text),
                    // Store failures are already queued as notices
                    Err(e) if app.page().notices.is_empty() => {
                        let message = app
                            .page()
                            .auth_error
                            .clone()
                            .filter(|_| auth_form)
                            .unwrap_or_else(|| e.user_message("Command failed"));
                        let _ = write!(response, "Error: {message}");
                    }
                    Err(_) => {}
                }
            }
            // clap's own rendering, for help requests as well as mistakes
            Err(Error::Usage(e)) => response.push_str(e.to_string().trim_end()),
            Err(e) => {
                let _ = write!(response, "Error: {}", e.user_message("Invalid command"));
            }
        }

        for notice in app.page_mut().take_notices() {
            if !response.is_empty() && !response.ends_with('\n') {
                response.push('\n');
            }
            response.push_str(&notice);
        }
        if !response.is_empty() && !response.ends_with('\n') {
            response.push('\n');
        }
        response.push_str(PROMPT);
        output.write_all(response.as_bytes()).await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await?;
    info!("Shell finished");
    Ok(())
}

impl VehicleArgs {
    fn apply(self, vehicle: &mut Vehicle) {
        if let Some(make) = self.make {
            vehicle.make = make;
        }
        if let Some(model) = self.model {
            vehicle.model = model;
        }
        if let Some(plate) = self.plate {
            vehicle.plate = plate;
        }
        if self.year.is_some() {
            vehicle.year = self.year;
        }
        if self.mileage.is_some() {
            vehicle.mileage = self.mileage;
        }
        if self.price1.is_some() {
            vehicle.price1 = self.price1;
        }
    }
}

impl BookingArgs {
    fn apply(self, booking: &mut Booking) {
        if let Some(start) = self.start_date {
            booking.start_date = start;
        }
        if let Some(end) = self.end_date {
            booking.end_date = end;
        }
        if self.car_id.is_some() {
            booking.car_id = self.car_id;
        }
        if self.client_name.is_some() {
            booking.client_name = self.client_name;
        }
    }
}

impl TransactionArgs {
    fn apply(self, transaction: &mut Transaction) {
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(category) = self.category {
            transaction.category = category;
        }
        if self.subcategory.is_some() {
            transaction.subcategory = self.subcategory;
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if self.car_id.is_some() {
            transaction.car_id = self.car_id;
        }
    }
}

/// The mirrored record to edit, or `None` when creating.
fn editable<T: Record>(mirror: &Mirror<T>, id: Option<&str>) -> Result<Option<T>> {
    let Some(id) = id else {
        return Ok(None);
    };
    mirror
        .get(id)
        .cloned()
        .map(Some)
        .ok_or_else(|| Error::validation("id", format!("No {} row with id {id}", T::TABLE)))
}

fn deleted<T: Record>(removed: Option<T>, id: &str) -> String {
    match removed {
        Some(_) => format!("Deleted {} row {id}", T::TABLE),
        None => format!("Delete sent for {} row {id} (not loaded locally)", T::TABLE),
    }
}

fn summary<B: Backend>(app: &FleetApp<B>) -> String {
    let store = app.store();
    let Some(identity) = store.identity() else {
        return "Not signed in. Use `login` or `signup`.".to_string();
    };
    let display = &app.config().display;
    let sep = display.thousands_separator.as_str();

    let mut out = String::new();
    let _ = writeln!(out, "Signed in as {}", identity.email_or_empty());

    let _ = writeln!(out, "Vehicles ({}):", store.vehicles().len());
    if store.vehicles().is_empty() {
        let _ = writeln!(out, "  No vehicles yet");
    }
    for vehicle in store.vehicles().iter() {
        let card = VehicleCard::new(vehicle, display);
        let _ = writeln!(
            out,
            "  [{}] {} {} {} | {} | {}",
            vehicle.id.as_deref().unwrap_or("?"),
            card.title,
            card.plate,
            card.year,
            card.mileage,
            card.rate
        );
    }

    let _ = writeln!(out, "Bookings ({}):", store.bookings().len());
    for booking in store.bookings().iter() {
        let _ = writeln!(
            out,
            "  [{}] {} .. {} car {} {}",
            booking.id.as_deref().unwrap_or("?"),
            booking.start_date,
            booking.end_date,
            booking.car_id.as_deref().unwrap_or("-"),
            booking.client_name.as_deref().unwrap_or_default()
        );
    }

    let _ = writeln!(out, "Transactions ({}):", store.transactions().len());
    for transaction in store.transactions().iter() {
        let _ = writeln!(
            out,
            "  [{}] {} {} {} {}",
            transaction.id.as_deref().unwrap_or("?"),
            transaction.date,
            transaction.category,
            transaction.subcategory.as_deref().unwrap_or_default(),
            format_amount(transaction.amount, sep)
        );
    }

    let settings = store.settings();
    let balance = settings.starting_balance
        + store.transactions().iter().map(|t| t.amount).sum::<f64>();
    let _ = writeln!(
        out,
        "Starting balance: {} {}",
        format_amount(settings.starting_balance, sep),
        display.currency
    );
    let _ = write!(
        out,
        "Current balance: {} {}",
        format_amount(balance, sep),
        display.currency
    );
    out
}
