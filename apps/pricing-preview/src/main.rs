//! # Pricing Preview
//!
//! Prices a checkout from a JSON request without creating anything.
//!
//! ## Usage
//! ```bash
//! # Price a request file
//! cargo run -p pricing-preview -- request.json
//!
//! # Read the request from stdin, with 8.25% tax on subtotal and shipping
//! cat request.json | cargo run -p pricing-preview -- --tax-bps 825 --tax-shipping
//!
//! # Custom limits
//! cargo run -p pricing-preview -- --config ./pricing.toml request.json
//! ```
//!
//! The result is printed to stdout as pretty JSON; logs go to stderr.

use std::env;
use std::io::Read;
use std::path::PathBuf;

use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use checkout_core::types::{PricingRequest, TaxRate};
use checkout_core::{calculate_pricing_with_config, FlatRateTaxProvider, PricingConfig, TaxProvider};

struct Options {
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    tax_bps: Option<u32>,
    tax_shipping: bool,
}

fn print_help() {
    println!("Checkout Pricing Preview");
    println!();
    println!("Usage: pricing-preview [OPTIONS] [REQUEST.json]");
    println!();
    println!("Reads the request from stdin when no file is given.");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Pricing config file (default: platform config dir)");
    println!("  -t, --tax-bps <BPS>   Flat tax rate in basis points (825 = 8.25%)");
    println!("      --tax-shipping    Also tax the shipping price");
    println!("  -h, --help            Show this help message");
}

/// Parses the command line. `Ok(None)` means help was printed.
fn parse_args() -> Result<Option<Options>, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options {
        config_path: None,
        input: None,
        tax_bps: None,
        tax_shipping: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let value = args.get(i + 1).ok_or("--config needs a path")?;
                options.config_path = Some(PathBuf::from(value));
                i += 1;
            }
            "--tax-bps" | "-t" => {
                let value = args.get(i + 1).ok_or("--tax-bps needs a value")?;
                options.tax_bps = Some(value.parse()?);
                i += 1;
            }
            "--tax-shipping" => options.tax_shipping = true,
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other if !other.starts_with('-') => options.input = Some(PathBuf::from(other)),
            other => return Err(format!("unknown option: {}", other).into()),
        }
        i += 1;
    }

    Ok(Some(options))
}

/// Log filter from `RUST_LOG`, defaulting to INFO with debug for the engine.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,checkout_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(input: Option<&PathBuf>) -> Result<PricingRequest, Box<dyn std::error::Error>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(options) = parse_args()? else {
        return Ok(());
    };

    init_tracing();

    let config = PricingConfig::load_or_default(options.config_path);
    let request = read_request(options.input.as_ref())?;

    let tax_provider = options.tax_bps.map(|bps| {
        let provider = FlatRateTaxProvider::new("Sales tax", TaxRate::from_bps(bps));
        if options.tax_shipping {
            provider.with_shipping()
        } else {
            provider
        }
    });

    let request_id = Uuid::new_v4();
    let span = info_span!("pricing", %request_id);

    let result = async {
        info!(
            line_items = request.line_items.len(),
            discounts = request.auto_discounts.len(),
            coupons = request.requested_coupons.len(),
            "Pricing request received"
        );
        calculate_pricing_with_config(
            &request,
            tax_provider.as_ref().map(|p| p as &dyn TaxProvider),
            &config,
        )
        .await
    }
    .instrument(span)
    .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
