use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use serde::Serialize;
use spay_core::config::{NetworkProfile, SdkConfig};
use spay_core::domain::auth_info::{PaymentRequest, PaymentTokenRequest};
use spay_core::domain::checkout::{PaymentState, PaymentTokenResponse, SessionState};
use spay_core::domain::credentials::AuthMethod;
use spay_core::domain::money::Balance;
use spay_core::domain::ports::StorageBox;
use spay_core::infrastructure::in_memory::{InMemoryStorage, StaticBiometrics};
#[cfg(feature = "storage-rocksdb")]
use spay_core::infrastructure::rocksdb::RocksDbStorage;
use spay_core::infrastructure::stub::DirectoryFixtures;
use spay_core::interfaces::console::{Autopilot, SimulatedBankApp};
use spay_core::interfaces::presenter::ChannelPresenter;
use spay_core::interfaces::sdk::PaySdk;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    sdk: SdkArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SdkArgs {
    /// Merchant API key
    #[arg(long, env = "SPAY_API_KEY", global = true, default_value = "")]
    api_key: String,

    /// JSON file with SDK settings
    #[arg(long, env = "SPAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Backend profile. Overrides the config file.
    #[arg(long, value_enum, env = "SPAY_PROFILE", global = true)]
    profile: Option<NetworkProfile>,

    /// Directory with `{name}.json` responses for the stub profile
    #[arg(long, env = "SPAY_FIXTURES", global = true)]
    fixtures: Option<PathBuf>,

    /// Delay of every stub response, in milliseconds
    #[arg(long, env = "SPAY_STUB_DELAY_MS", global = true)]
    stub_delay_ms: Option<u64>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs a checkout with a scripted payer and prints the token response
    Checkout(CheckoutArgs),
    /// Pays an order with an issued payment token
    Pay(PayArgs),
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    order_id: Option<String>,
    #[arg(long)]
    merchant_login: Option<String>,
    #[arg(long)]
    amount: Option<Decimal>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    order_number: Option<String>,
    #[arg(long, default_value = "merchant://spay")]
    redirect_uri: String,
    /// Bank app to hand off to
    #[arg(long)]
    bank: Option<String>,
    /// Payment tool to pay with instead of the pre-selected one
    #[arg(long)]
    payment_id: Option<i64>,
    /// Pay with the installment plan when offered
    #[arg(long)]
    installment: bool,
    /// Code entered when a one-time code is requested
    #[arg(long, default_value = "000000")]
    otp_code: String,
    /// Simulate a device without biometric verification
    #[arg(long)]
    no_biometrics: bool,
}

#[derive(Args)]
struct PayArgs {
    #[arg(long)]
    order_id: Option<String>,
    #[arg(long)]
    payment_token: Option<String>,
    /// Pays by token id when no token is given.
    #[arg(long)]
    payment_token_id: Option<String>,
    #[arg(long)]
    merchant_login: Option<String>,
}

#[derive(Serialize)]
struct CheckoutReport {
    state: &'static str,
    auth_method: AuthMethod,
    installment_selected: bool,
    #[serde(flatten)]
    response: PaymentTokenResponse,
}

fn open_storage(db_path: Option<PathBuf>) -> Result<StorageBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDbStorage::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok(Arc::new(InMemoryStorage::new()))
        }
        None => Ok(Arc::new(InMemoryStorage::new())),
    }
}

fn load_config(args: &SdkArgs) -> Result<SdkConfig> {
    let mut config = match &args.config {
        Some(path) => SdkConfig::from_json_file(path).into_diagnostic()?,
        None => SdkConfig::default(),
    };
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if let Some(delay) = args.stub_delay_ms {
        config.stub_delay_ms = delay;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

async fn checkout(sdk_args: SdkArgs, args: CheckoutArgs) -> Result<()> {
    let config = load_config(&sdk_args)?;
    let storage = open_storage(sdk_args.db_path)?;
    let (bank_app, mut redirects) = SimulatedBankApp::new(&args.redirect_uri);

    let mut builder = PaySdk::builder(config)
        .storage(storage)
        .biometrics(Arc::new(StaticBiometrics::new(!args.no_biometrics, true)))
        .url_opener(Arc::new(bank_app));
    if let Some(dir) = sdk_args.fixtures {
        builder = builder.fixtures(Arc::new(DirectoryFixtures::new(dir)));
    }
    let sdk = Arc::new(builder.build().into_diagnostic()?);
    sdk.setup(&sdk_args.api_key).await.into_diagnostic()?;

    let request = PaymentTokenRequest {
        redirect_uri: args.redirect_uri,
        merchant_login: args.merchant_login,
        order_id: args.order_id,
        amount: args.amount.map(Balance::new),
        currency: args.currency,
        order_number: args.order_number,
        bank: args.bank,
        ..Default::default()
    };
    let (presenter, events) = ChannelPresenter::new();
    let checkout = sdk
        .get_payment_token(request, Arc::new(presenter))
        .await
        .into_diagnostic()?;

    let forwarder = {
        let sdk = sdk.clone();
        tokio::spawn(async move {
            while let Some(url) = redirects.recv().await {
                sdk.handle_redirect_url(&url).await;
            }
        })
    };
    let autopilot = Autopilot {
        payment_id: args.payment_id,
        installment: args.installment,
        otp_code: args.otp_code,
    };
    let driver = tokio::spawn(autopilot.drive(events, checkout.handle().clone()));

    let outcome = checkout.outcome().await;
    forwarder.abort();
    if let Err(e) = driver.await {
        warn!(error = %e, "autopilot stopped unexpectedly");
    }

    print_json(&CheckoutReport {
        state: outcome.state.name(),
        auth_method: outcome.auth_method,
        installment_selected: outcome.installment_selected,
        response: outcome.token_response(),
    })?;
    match outcome.state {
        SessionState::Completed => Ok(()),
        SessionState::Failed(err) => Err(miette!("checkout failed: {err}")),
        state => Err(miette!("checkout ended as {}", state.name())),
    }
}

async fn pay(sdk_args: SdkArgs, args: PayArgs) -> Result<()> {
    let config = load_config(&sdk_args)?;
    let storage = open_storage(sdk_args.db_path)?;
    let mut builder = PaySdk::builder(config).storage(storage);
    if let Some(dir) = sdk_args.fixtures {
        builder = builder.fixtures(Arc::new(DirectoryFixtures::new(dir)));
    }
    let sdk = builder.build().into_diagnostic()?;
    sdk.setup(&sdk_args.api_key).await.into_diagnostic()?;

    let response = sdk
        .pay(&PaymentRequest {
            order_id: args.order_id,
            payment_token: args.payment_token,
            payment_token_id: args.payment_token_id,
            merchant_login: args.merchant_login,
            api_key: None,
        })
        .await;
    print_json(&response)?;
    match response.state {
        PaymentState::Success => Ok(()),
        state => Err(miette!("payment ended as {state:?}: {}", response.info)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Checkout(args) => checkout(cli.sdk, args).await,
        Command::Pay(args) => pay(cli.sdk, args).await,
    }
}
