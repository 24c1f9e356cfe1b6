//! Gas usage report of the deployments of a run.

use anyhow::{Context, Result};
use comfy_table::{
    ContentArrangement, Table,
    presets::{ASCII_FULL, UTF8_FULL},
};
use serde_json::Value;

use crate::{DeploymentRecord, GasReporterSettings, Secret};

const COINMARKETCAP_QUOTES_URL: &str =
    "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

const WEI_PER_GWEI: f64 = 1e9;
const WEI_PER_ETHER: f64 = 1e18;

/// Price of one `token` in `currency`, from CoinMarketCap.
pub async fn fetch_token_price(
    client: &reqwest::Client,
    api_key: &Secret,
    token: &str,
    currency: &str,
) -> Result<f64> {
    let response: Value = client
        .get(COINMARKETCAP_QUOTES_URL)
        .header("X-CMC_PRO_API_KEY", api_key.expose())
        .query(&[("symbol", token), ("convert", currency)])
        .send()
        .await
        .context("Failed to send price request")?
        .error_for_status()
        .context("Price request failed")?
        .json()
        .await
        .context("Failed to parse price response")?;

    parse_price(&response, token, currency)
}

fn parse_price(response: &Value, token: &str, currency: &str) -> Result<f64> {
    response
        .pointer(&format!("/data/{token}/quote/{currency}/price"))
        .and_then(Value::as_f64)
        .with_context(|| format!("No {token}/{currency} price in response"))
}

/// Render the report table.
///
/// `price` is the price of one token in the settings' currency; the fiat column is
/// only shown when it is known.
pub fn render(
    records: &[DeploymentRecord],
    settings: &GasReporterSettings,
    price: Option<f64>,
) -> String {
    let preset = if settings.no_colors {
        ASCII_FULL
    } else {
        UTF8_FULL
    };

    let mut table = Table::new();
    table
        .load_preset(preset)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if settings.no_colors {
        table.force_no_tty();
    }

    let mut header = vec![
        "Contract".to_string(),
        "Gas used".to_string(),
        "Gas price (gwei)".to_string(),
        format!("Cost ({})", settings.token),
    ];
    if price.is_some() {
        header.push(format!("Cost ({})", settings.currency));
    }
    table.set_header(header);

    for record in records {
        let mut row = vec![record.contract_name.clone(), record.gas_used.to_string()];

        match record.gas_price {
            Some(gas_price) => {
                let cost = record.gas_used as f64 * gas_price as f64 / WEI_PER_ETHER;
                row.push(format!("{:.2}", gas_price as f64 / WEI_PER_GWEI));
                row.push(format!("{cost:.6}"));
                if let Some(price) = price {
                    row.push(format!("{:.2}", cost * price));
                }
            }
            // Reused deployment, nothing was paid in this run.
            None => {
                row.push("-".to_string());
                row.push("-".to_string());
                if price.is_some() {
                    row.push("-".to_string());
                }
            }
        }

        table.add_row(row);
    }

    table.to_string()
}

/// Write the report to the configured output file, or stdout when none is set.
pub async fn write_report(
    records: &[DeploymentRecord],
    settings: &GasReporterSettings,
) -> Result<()> {
    let price = match &settings.coinmarketcap {
        Some(api_key) => {
            let client = crate::rpc::create_client()?;
            match fetch_token_price(&client, api_key, &settings.token, &settings.currency).await {
                Ok(price) => Some(price),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to fetch token price, reporting gas cost only"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let report = render(records, settings, price);

    match &settings.output_file {
        Some(path) => {
            std::fs::write(path, format!("{report}\n"))
                .with_context(|| format!("Failed to write gas report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Gas report written");
        }
        None => println!("{report}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VerificationStatus;
    use alloy_core::primitives::{Address, B256};

    fn settings(no_colors: bool) -> GasReporterSettings {
        GasReporterSettings {
            enabled: true,
            output_file: None,
            no_colors,
            currency: "USD".to_string(),
            coinmarketcap: None,
            token: "ETH".to_string(),
        }
    }

    fn record(gas_price: Option<u128>) -> DeploymentRecord {
        DeploymentRecord {
            contract_name: "TicTacToe".to_string(),
            constructor_args: vec![],
            deployer_address: Address::repeat_byte(0x01),
            deployed_address: Address::repeat_byte(0x02),
            transaction_confirmations: 1,
            transaction_hash: B256::repeat_byte(0x03),
            gas_used: 1_000_000,
            gas_price,
            reused: gas_price.is_none(),
            verification: VerificationStatus::Skipped,
        }
    }

    #[test]
    fn test_render_costs() {
        let report = render(&[record(Some(20_000_000_000))], &settings(true), Some(2000.0));

        assert!(report.contains("TicTacToe"));
        assert!(report.contains("20.00"));
        // 1M gas at 20 gwei.
        assert!(report.contains("0.020000"));
        assert!(report.contains("40.00"));
        assert!(report.contains("Cost (USD)"));
    }

    #[test]
    fn test_render_without_price_has_no_fiat_column() {
        let report = render(&[record(Some(1_000_000_000))], &settings(true), None);
        assert!(report.contains("Cost (ETH)"));
        assert!(!report.contains("Cost (USD)"));
    }

    #[test]
    fn test_render_reused_deployment() {
        let report = render(&[record(None)], &settings(true), None);
        assert!(report.contains("1000000"));
        assert!(report.contains(" - "));
    }

    #[test]
    fn test_no_colors_uses_ascii() {
        let report = render(&[record(Some(1))], &settings(true), None);
        assert!(report.is_ascii());

        let report = render(&[record(Some(1))], &settings(false), None);
        assert!(!report.is_ascii());
    }

    #[test]
    fn test_parse_price() {
        let response = serde_json::json!({
            "data": { "ETH": { "quote": { "USD": { "price": 1850.25 } } } }
        });
        assert_eq!(parse_price(&response, "ETH", "USD").unwrap(), 1850.25);
        assert!(parse_price(&response, "ETH", "EUR").is_err());
    }
}
