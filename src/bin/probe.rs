use anyhow::Result;
use ethers::types::U256;
use gasdeck::config::Config;
use gasdeck::flows::{AccountSwitcher, FeeContext, GasFeeSelector};
use gasdeck::locale::{EnglishCatalog, Localizer, MessageKey};
use gasdeck::models::Tier;
use gasdeck::services::{HttpGasEstimator, InMemoryAccounts};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    println!("gasdeck probe");
    println!("=============");
    println!("Estimate feed: {}", config.estimate_feed_url);
    println!();

    let localizer = Arc::new(EnglishCatalog);
    let estimator = Arc::new(HttpGasEstimator::new(
        config.estimate_feed_url.clone(),
        Duration::from_secs(config.estimate_ttl_secs),
        Duration::from_secs(config.http_timeout_secs),
    )?);

    let mut context =
        FeeContext::new(U256::from(21_000u64)).with_fiat_currency(config.fiat_currency.clone());
    if let Some(ticker) = &config.ticker {
        context = context.with_ticker(ticker.clone());
    }
    let selector = GasFeeSelector::new(estimator, localizer.clone(), context);

    // Optional fiat pricing for the quotes, e.g. CONVERSION_RATE=2000.
    if let Ok(rate) = std::env::var("CONVERSION_RATE") {
        if let Ok(rate) = rate.parse::<f64>() {
            selector.set_conversion_rate(Some(rate));
        }
    }

    println!("Step 1: Fetching gas estimates...");
    match selector.refresh_estimates().await {
        Ok(snapshot) => {
            println!("   [OK] Snapshot fetched at {}", snapshot.fetched_at);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Err(e) => {
            println!("   [FAILED] {}", e);
            if let Some(text) = selector.status_text() {
                println!("   {}", text);
            }
        }
    }
    println!();

    if selector.snapshot().is_some() && !selector.is_advanced() {
        println!("Step 2: Tier quotes...");
        for tier in Tier::ALL {
            let quote = selector.quote(tier)?;
            match &quote.fiat_fee_text {
                Some(fiat) => println!(
                    "   {:<10} {:<10} {} ({})",
                    quote.label, quote.wait_text, quote.native_fee_text, fiat
                ),
                None => println!(
                    "   {:<10} {:<10} {}",
                    quote.label, quote.wait_text, quote.native_fee_text
                ),
            }
        }
        println!();

        println!("Step 3: Selecting the average tier...");
        let fee = selector.select_tier(Tier::Average)?;
        println!(
            "   [OK] Emitted gas_limit={} gas_price={} wei",
            fee.gas_limit, fee.gas_price_wei
        );
        if let Some(total) = selector.total_fee_text() {
            println!("   Transaction fee: {}", total);
        }
        println!();
    }

    println!("Step 4: Manual editor ({})...", selector.advanced_toggle_label());
    if !selector.is_advanced() {
        selector.toggle_advanced()?;
    }
    println!(
        "   {}: {}",
        localizer.text(MessageKey::GasPriceLabel),
        selector.custom_gas_price()
    );
    println!(
        "   {}: {}",
        localizer.text(MessageKey::GasLimitLabel),
        selector.custom_gas_limit()
    );
    let fee = selector.set_custom_gas_price("12.5")?;
    println!("   [OK] Price 12.5 gwei emits {} wei", fee.gas_price_wei);
    if let Err(e) = selector.set_custom_gas_limit("garbage") {
        println!("   [OK] Rejected limit \"garbage\": {}", e);
        if let Some(warning) = selector.gas_limit_warning_text() {
            println!("        {}", warning);
        }
    }
    if selector.snapshot().is_some() {
        let fee = selector.toggle_advanced()?;
        println!(
            "   [OK] Closed editor, back to tier price {} wei",
            fee.gas_price_wei
        );
    }
    println!();

    let accounts = Arc::new(InMemoryAccounts::seeded(3));
    let switcher = AccountSwitcher::new(accounts, localizer);
    println!("Step 5: {} (in-memory backend)...", switcher.title());
    switcher.load().await?;
    print_rows(&switcher);

    println!("   Switching to the last account...");
    let rows = switcher.rows();
    switcher.select_account(rows.len() - 1).await?;
    print_rows(&switcher);

    println!("   {}...", switcher.create_account_label());
    let active = switcher.create_account().await?;
    println!("   [OK] Active index is now {}", active.index);
    print_rows(&switcher);

    Ok(())
}

fn print_rows(switcher: &AccountSwitcher) {
    for row in switcher.rows() {
        let marker = if row.selected { ">" } else { " " };
        println!(
            "   {} [{}] {:<12} {}  {}",
            marker,
            row.index,
            row.name,
            row.checksummed_address(),
            row.balance_text
        );
    }
}
