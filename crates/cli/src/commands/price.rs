use std::path::Path;

use cartprice_core::config::{AppConfig, LoadOptions};
use cartprice_core::pricing::{
    Collaborators, OrderTotalCalculator, Resolution, UnresolvableReason,
};
use cartprice_core::store::PricingFixture;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::commands::CommandResult;
use crate::logging::init_logging;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PriceStage {
    Subtotal,
    Shipping,
    Tax,
    Total,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PriceStatus {
    Ok,
    Unresolvable,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    command: &'static str,
    stage: PriceStage,
    status: PriceStatus,
    cart_id: String,
    summary: Vec<(String, String)>,
    result: Value,
}

pub fn run(fixture_path: &Path, stage: PriceStage, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("price", "config_validation", None, error.to_string(), 2)
        }
    };
    // A subscriber may already be installed when commands run in-process.
    let _ = init_logging(&config);

    let fixture = match PricingFixture::load(fixture_path) {
        Ok(fixture) => fixture,
        Err(error) => {
            let interface = error.into_interface(Uuid::new_v4().to_string());
            error!(
                event_name = "cli.price.fixture_rejected",
                correlation_id = %interface.correlation_id(),
                error = %interface,
                "pricing fixture rejected"
            );
            return CommandResult::failure(
                "price",
                "invalid_fixture",
                Some(interface.correlation_id()),
                format!("{} ({interface})", interface.user_message()),
                3,
            );
        }
    };

    let report = build_report(&config, &fixture, stage);
    info!(
        event_name = "cli.price.completed",
        cart_id = %report.cart_id,
        stage = ?stage,
        status = ?report.status,
        "price command completed"
    );

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"price\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                error.to_string().replace('"', "\\\"")
            )
        });
        return CommandResult { exit_code: 0, output };
    }

    CommandResult { exit_code: 0, output: render_human(&report) }
}

fn build_report(config: &AppConfig, fixture: &PricingFixture, stage: PriceStage) -> PriceReport {
    let calculator = OrderTotalCalculator::new(config, Collaborators::from_store(&fixture.store));
    let cart = &fixture.cart;
    let display_incl = config.pricing.display_including_tax;

    let (status, summary, result) = match stage {
        PriceStage::Subtotal => {
            let subtotal = calculator.compute_subtotal(cart);
            let summary = vec![
                money("subtotal", subtotal.before_discount(display_incl)),
                money("discount", subtotal.discount(display_incl)),
                money("subtotal_after_discount", subtotal.after_discount(display_incl)),
            ];
            (PriceStatus::Ok, summary, to_value(&subtotal))
        }
        PriceStage::Shipping => match calculator.compute_shipping_total(cart) {
            Resolution::Resolved(shipping) => {
                let summary = vec![money("shipping", shipping.amount(display_incl))];
                (PriceStatus::Ok, summary, to_value(&shipping))
            }
            Resolution::Unresolvable(reason) => unresolvable("shipping", reason),
        },
        PriceStage::Tax => {
            let tax = calculator.compute_tax_total(cart, true);
            let summary = vec![
                money("tax", tax.total),
                ("tax_rates".to_string(), tax.bucket.to_string()),
            ];
            (PriceStatus::Ok, summary, to_value(&tax))
        }
        PriceStage::Total => match calculator.compute_grand_total(cart) {
            Resolution::Resolved(order) => {
                let summary = vec![
                    money("subtotal", order.subtotal_for_display()),
                    money("shipping", order.shipping_for_display()),
                    money("payment_fee", order.payment_fee.amount(display_incl)),
                    money("tax", order.tax.total),
                    ("tax_rates".to_string(), order.tax_rates()),
                    money("order_discount", order.order_discount_amount),
                    money("gift_cards", order.applied_gift_cards.iter().map(|c| c.amount_used).sum()),
                    money("reward_points", order.redeemed_points_amount),
                    money("total", order.total),
                ];
                (PriceStatus::Ok, summary, to_value(&order))
            }
            Resolution::Unresolvable(reason) => unresolvable("total", reason),
        },
    };

    PriceReport { command: "price", stage, status, cart_id: cart.id.0.clone(), summary, result }
}

fn unresolvable(
    label: &str,
    reason: UnresolvableReason,
) -> (PriceStatus, Vec<(String, String)>, Value) {
    (
        PriceStatus::Unresolvable,
        vec![(label.to_string(), format!("unavailable: {reason}"))],
        to_value(&reason),
    )
}

fn money(label: &str, amount: Decimal) -> (String, String) {
    (label.to_string(), format!("{amount:.2}"))
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn render_human(report: &PriceReport) -> String {
    let status = match report.status {
        PriceStatus::Ok => "ok",
        PriceStatus::Unresolvable => "unresolvable",
    };
    let mut lines = vec![format!("price: cart {} ({status})", report.cart_id)];
    for (label, value) in &report.summary {
        lines.push(format!("- {label} = {value}"));
    }
    lines.join("\n")
}
