use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cartprice_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_key: &'static str,
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        lines.push(render_line(
            field.key_path,
            &field.value,
            field_source(
                field.key_path,
                Some(field.env_key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "<unset>".to_string());
    vec![
        Field {
            key_path: "pricing.rounding",
            env_key: "CARTPRICE_PRICING_ROUNDING",
            value: format!("{:?}", config.pricing.rounding),
        },
        Field {
            key_path: "pricing.midpoint",
            env_key: "CARTPRICE_PRICING_MIDPOINT",
            value: format!("{:?}", config.pricing.midpoint),
        },
        Field {
            key_path: "pricing.display_including_tax",
            env_key: "CARTPRICE_PRICING_DISPLAY_INCLUDING_TAX",
            value: config.pricing.display_including_tax.to_string(),
        },
        Field {
            key_path: "tax.shipping_is_taxable",
            env_key: "CARTPRICE_TAX_SHIPPING_IS_TAXABLE",
            value: config.tax.shipping_is_taxable.to_string(),
        },
        Field {
            key_path: "tax.shipping_tax_category",
            env_key: "CARTPRICE_TAX_SHIPPING_TAX_CATEGORY",
            value: unset(&config.tax.shipping_tax_category),
        },
        Field {
            key_path: "tax.payment_fee_is_taxable",
            env_key: "CARTPRICE_TAX_PAYMENT_FEE_IS_TAXABLE",
            value: config.tax.payment_fee_is_taxable.to_string(),
        },
        Field {
            key_path: "tax.payment_fee_tax_category",
            env_key: "CARTPRICE_TAX_PAYMENT_FEE_TAX_CATEGORY",
            value: unset(&config.tax.payment_fee_tax_category),
        },
        Field {
            key_path: "tax.auxiliary_services_taxing",
            env_key: "CARTPRICE_TAX_AUXILIARY_SERVICES_TAXING",
            value: format!("{:?}", config.tax.auxiliary_services_taxing),
        },
        Field {
            key_path: "shipping.free_shipping_over_enabled",
            env_key: "CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_ENABLED",
            value: config.shipping.free_shipping_over_enabled.to_string(),
        },
        Field {
            key_path: "shipping.free_shipping_over_value",
            env_key: "CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_VALUE",
            value: config.shipping.free_shipping_over_value.to_string(),
        },
        Field {
            key_path: "shipping.free_shipping_over_including_tax",
            env_key: "CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_INCLUDING_TAX",
            value: config.shipping.free_shipping_over_including_tax.to_string(),
        },
        Field {
            key_path: "reward_points.enabled",
            env_key: "CARTPRICE_REWARD_POINTS_ENABLED",
            value: config.reward_points.enabled.to_string(),
        },
        Field {
            key_path: "reward_points.exchange_rate",
            env_key: "CARTPRICE_REWARD_POINTS_EXCHANGE_RATE",
            value: config.reward_points.exchange_rate.to_string(),
        },
        Field {
            key_path: "reward_points.round_down",
            env_key: "CARTPRICE_REWARD_POINTS_ROUND_DOWN",
            value: config.reward_points.round_down.to_string(),
        },
        Field {
            key_path: "logging.level",
            env_key: "CARTPRICE_LOGGING_LEVEL",
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_key: "CARTPRICE_LOGGING_FORMAT",
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("cartprice.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cartprice.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
