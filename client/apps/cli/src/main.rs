//! Client CLI Entry Point
//!
//! Drives the client crates against a running API: OTP sign-in, nearby
//! lookups through the geo cache, and a full exclusive flow with the device
//! position given on the command line.
//! Uses `anyhow` for startup errors; operation failures are reported as
//! `kernel::error::AppError`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth::{ClientConfig, OtpSignInInput, OtpSignInUseCase, RequestClient};
use clap::{Parser, Subcommand};
use exclusive::{
    ActivateInput, AppSessionFlags, ExclusiveConfig, Feedback, FlowStage, HttpExclusiveApi,
    SessionMachine,
};
use kernel::error::app_error::{AppError, OptionExt, ResultExt};
use kernel::error::kind::ErrorKind;
use nearby::{GeoCache, GeoCacheConfig, IntentCaptureInput, IntentCaptureUseCase};
use platform::events::{SessionEvent, SessionEvents};
use platform::geo::Coordinate;
use platform::location::FixedLocation;
use platform::storage::{FileStore, KeyValueStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Charging-session companion client
#[derive(Parser, Debug)]
#[command(name = "cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with a one-time code and store the tokens
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },

    /// Forget stored tokens
    Logout,

    /// Merchants near a position
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Reported accuracy in meters
        #[arg(long)]
        accuracy: Option<f64>,
    },

    /// Run an exclusive from activation to completion
    Exclusive {
        #[arg(long)]
        merchant: String,
        #[arg(long)]
        charger: String,
        #[arg(long, allow_hyphen_values = true)]
        merchant_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        merchant_lng: f64,
        /// Device position
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// 1 to 5
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        comment: Option<String>,
        /// Seconds to wait for the device to be near the merchant
        #[arg(long, default_value_t = 30)]
        wait: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cli=info,auth=info,nearby=info,exclusive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Client configuration
    let base_url = env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8001".to_string());
    let mut config = if cfg!(debug_assertions) {
        ClientConfig {
            base_url,
            ..ClientConfig::development()
        }
    } else {
        ClientConfig::new(base_url)
    };
    if let Ok(secs) = env::var("REQUEST_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    // Durable storage for tokens and reservation ids
    let storage_path = env::var("STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".client-store.json"));
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&storage_path)
            .with_context(|| format!("failed to open store at {}", storage_path.display()))?,
    );

    let events = SessionEvents::default();
    let client = RequestClient::new(config, store.clone(), events.clone())
        .context("failed to build request client")?;

    tracing::info!(base_url = %client.config().base_url, "Client ready");

    // Session expiry can surface from any command
    let mut expired = events.subscribe();
    tokio::spawn(async move {
        while let Ok(SessionEvent::Expired { reason }) = expired.recv().await {
            tracing::warn!(
                reason = reason.code(),
                "Session expired, run `cli login` to sign in again"
            );
        }
    });

    let result = match cli.command {
        Commands::Login { phone, code } => login(&client, phone, code).await,
        Commands::Logout => client
            .sign_out()
            .map_app_err(ErrorKind::Internal, "Could not clear stored tokens"),
        Commands::Nearby { lat, lng, accuracy } => {
            let cache_config = if cfg!(debug_assertions) {
                GeoCacheConfig::development()
            } else {
                GeoCacheConfig::default()
            };
            nearby(&client, cache_config, lat, lng, accuracy).await
        }
        Commands::Exclusive {
            merchant,
            charger,
            merchant_lat,
            merchant_lng,
            lat,
            lng,
            rating,
            comment,
            wait,
        } => {
            let feedback =
                (rating.is_some() || comment.is_some()).then(|| Feedback { rating, comment });
            let input = ActivateInput {
                merchant_id: merchant.into(),
                charger_id: charger.into(),
                merchant_location: Coordinate::new(merchant_lat, merchant_lng),
            };
            let device = FixedLocation::new(Coordinate::new(lat, lng), None);
            run_exclusive(client, store, device, input, feedback, Duration::from_secs(wait)).await
        }
    };

    if let Err(err) = result {
        tracing::debug!(error = ?err, "Command failed");
        eprintln!("error: {}", err.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn login(client: &RequestClient, phone: String, code: String) -> Result<(), AppError> {
    OtpSignInUseCase::new(client.clone())
        .execute(OtpSignInInput { phone, code })
        .await?;
    println!("Signed in");
    Ok(())
}

async fn nearby(
    client: &RequestClient,
    cache_config: GeoCacheConfig,
    lat: f64,
    lng: f64,
    accuracy: Option<f64>,
) -> Result<(), AppError> {
    let cache = GeoCache::new(cache_config);
    let use_case = IntentCaptureUseCase::new(client.clone(), cache);

    let capture = use_case
        .execute(IntentCaptureInput {
            coordinate: Coordinate::new(lat, lng),
            accuracy_m: accuracy,
        })
        .await?;

    if let Some(charger) = &capture.charger_summary {
        println!(
            "Charger: {} ({} stalls free)",
            charger.name.as_deref().unwrap_or("unknown"),
            charger
                .available_stalls
                .map_or_else(|| "?".to_string(), |n| n.to_string()),
        );
    }
    for merchant in &capture.merchants {
        let distance = merchant
            .distance_m
            .map_or_else(String::new, |d| format!(" {d:.0} m"));
        let marker = if merchant.exclusive_available { " *exclusive*" } else { "" };
        println!("{} {}{distance}{marker}", merchant.id, merchant.name);
    }
    if capture.merchants.is_empty() {
        println!("Nothing nearby");
    }
    Ok(())
}

async fn run_exclusive(
    client: RequestClient,
    store: Arc<dyn KeyValueStore>,
    device: FixedLocation,
    input: ActivateInput,
    feedback: Option<Feedback>,
    wait: Duration,
) -> Result<(), AppError> {
    let api = Arc::new(HttpExclusiveApi::new(client));
    let mut machine = SessionMachine::new(
        api,
        device,
        store,
        Arc::new(AppSessionFlags::new()),
        ExclusiveConfig::default(),
    );

    machine.activate(input).await?;
    if let Some(reservation) = machine.reservation_id()? {
        println!("Reservation {reservation}");
    }
    println!(
        "Exclusive active, {}s remaining",
        machine.remaining_seconds().unwrap_or_default()
    );

    machine.start_walking()?;
    let arrived = match machine.proximity_updates() {
        Some(mut updates) => {
            tokio::time::timeout(wait, updates.wait_for(|signal| signal.is_near))
                .await
                .is_ok_and(|changed| changed.is_ok())
        }
        None => false,
    };
    if !arrived {
        if let Some(signal) = machine.proximity() {
            match signal.distance_meters {
                Some(d) => println!("Still {d:.0} m from the merchant"),
                None => println!("Location unavailable"),
            }
        }
        machine.abandon();
        return Err(AppError::validation("Did not reach the merchant in time")
            .with_action("Move closer and run the command again"));
    }

    machine.confirm_arrival().await?;
    let code = machine
        .state()
        .verification_code()
        .ok_or_app_err(ErrorKind::ServerError, "Missing verification code")?;
    println!("Show this code at the counter: {code}");

    if machine.dismiss_verification()? == FlowStage::Preferences {
        machine.close_preferences()?;
    }

    let status = machine.complete(feedback).await?;
    println!("Exclusive {status}");
    Ok(())
}
