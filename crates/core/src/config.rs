use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::rounding::{MidpointRounding, RoundingPolicy};
use crate::pricing::tax::AuxiliaryTaxingStrategy;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub tax: TaxConfig,
    pub shipping: ShippingConfig,
    pub reward_points: RewardPointsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PricingConfig {
    pub rounding: RoundingPolicy,
    pub midpoint: MidpointRounding,
    /// Present subtotal and shipping including tax.
    pub display_including_tax: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaxConfig {
    pub shipping_is_taxable: bool,
    pub shipping_tax_category: Option<String>,
    pub payment_fee_is_taxable: bool,
    pub payment_fee_tax_category: Option<String>,
    pub auxiliary_services_taxing: AuxiliaryTaxingStrategy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShippingConfig {
    pub free_shipping_over_enabled: bool,
    pub free_shipping_over_value: Decimal,
    pub free_shipping_over_including_tax: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewardPointsConfig {
    pub enabled: bool,
    /// Currency amount one point is worth.
    pub exchange_rate: Decimal,
    pub round_down: bool,
}

impl Default for RewardPointsConfig {
    fn default() -> Self {
        Self { enabled: false, exchange_rate: Decimal::ONE, round_down: false }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub rounding: Option<RoundingPolicy>,
    pub display_including_tax: Option<bool>,
    pub reward_points_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for RoundingPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "every_stage" => Ok(Self::EveryStage),
            "final_only" => Ok(Self::FinalOnly),
            other => Err(ConfigError::Validation(format!(
                "unsupported rounding policy `{other}` (expected every_stage|final_only)"
            ))),
        }
    }
}

impl std::str::FromStr for MidpointRounding {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest_even" => Ok(Self::NearestEven),
            "away_from_zero" => Ok(Self::AwayFromZero),
            other => Err(ConfigError::Validation(format!(
                "unsupported midpoint rounding `{other}` (expected nearest_even|away_from_zero)"
            ))),
        }
    }
}

impl std::str::FromStr for AuxiliaryTaxingStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "specified_category" => Ok(Self::SpecifiedCategory),
            "highest_cart_amount" => Ok(Self::HighestCartAmount),
            "highest_tax_rate" => Ok(Self::HighestTaxRate),
            other => Err(ConfigError::Validation(format!(
                "unsupported auxiliary taxing strategy `{other}` \
                 (expected specified_category|highest_cart_amount|highest_tax_rate)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("cartprice.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(rounding) = pricing.rounding {
                self.pricing.rounding = rounding;
            }
            if let Some(midpoint) = pricing.midpoint {
                self.pricing.midpoint = midpoint;
            }
            if let Some(display_including_tax) = pricing.display_including_tax {
                self.pricing.display_including_tax = display_including_tax;
            }
        }

        if let Some(tax) = patch.tax {
            if let Some(shipping_is_taxable) = tax.shipping_is_taxable {
                self.tax.shipping_is_taxable = shipping_is_taxable;
            }
            if let Some(shipping_tax_category) = tax.shipping_tax_category {
                self.tax.shipping_tax_category = Some(shipping_tax_category);
            }
            if let Some(payment_fee_is_taxable) = tax.payment_fee_is_taxable {
                self.tax.payment_fee_is_taxable = payment_fee_is_taxable;
            }
            if let Some(payment_fee_tax_category) = tax.payment_fee_tax_category {
                self.tax.payment_fee_tax_category = Some(payment_fee_tax_category);
            }
            if let Some(strategy) = tax.auxiliary_services_taxing {
                self.tax.auxiliary_services_taxing = strategy;
            }
        }

        if let Some(shipping) = patch.shipping {
            if let Some(enabled) = shipping.free_shipping_over_enabled {
                self.shipping.free_shipping_over_enabled = enabled;
            }
            if let Some(value) = shipping.free_shipping_over_value {
                self.shipping.free_shipping_over_value = value;
            }
            if let Some(including_tax) = shipping.free_shipping_over_including_tax {
                self.shipping.free_shipping_over_including_tax = including_tax;
            }
        }

        if let Some(reward_points) = patch.reward_points {
            if let Some(enabled) = reward_points.enabled {
                self.reward_points.enabled = enabled;
            }
            if let Some(exchange_rate) = reward_points.exchange_rate {
                self.reward_points.exchange_rate = exchange_rate;
            }
            if let Some(round_down) = reward_points.round_down {
                self.reward_points.round_down = round_down;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARTPRICE_PRICING_ROUNDING") {
            self.pricing.rounding = value.parse()?;
        }
        if let Some(value) = read_env("CARTPRICE_PRICING_MIDPOINT") {
            self.pricing.midpoint = value.parse()?;
        }
        if let Some(value) = read_env("CARTPRICE_PRICING_DISPLAY_INCLUDING_TAX") {
            self.pricing.display_including_tax =
                parse_bool("CARTPRICE_PRICING_DISPLAY_INCLUDING_TAX", &value)?;
        }

        if let Some(value) = read_env("CARTPRICE_TAX_SHIPPING_IS_TAXABLE") {
            self.tax.shipping_is_taxable = parse_bool("CARTPRICE_TAX_SHIPPING_IS_TAXABLE", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_TAX_SHIPPING_TAX_CATEGORY") {
            self.tax.shipping_tax_category = Some(value);
        }
        if let Some(value) = read_env("CARTPRICE_TAX_PAYMENT_FEE_IS_TAXABLE") {
            self.tax.payment_fee_is_taxable =
                parse_bool("CARTPRICE_TAX_PAYMENT_FEE_IS_TAXABLE", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_TAX_PAYMENT_FEE_TAX_CATEGORY") {
            self.tax.payment_fee_tax_category = Some(value);
        }
        if let Some(value) = read_env("CARTPRICE_TAX_AUXILIARY_SERVICES_TAXING") {
            self.tax.auxiliary_services_taxing = value.parse()?;
        }

        if let Some(value) = read_env("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_ENABLED") {
            self.shipping.free_shipping_over_enabled =
                parse_bool("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_VALUE") {
            self.shipping.free_shipping_over_value =
                parse_decimal("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_VALUE", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_INCLUDING_TAX") {
            self.shipping.free_shipping_over_including_tax =
                parse_bool("CARTPRICE_SHIPPING_FREE_SHIPPING_OVER_INCLUDING_TAX", &value)?;
        }

        if let Some(value) = read_env("CARTPRICE_REWARD_POINTS_ENABLED") {
            self.reward_points.enabled = parse_bool("CARTPRICE_REWARD_POINTS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_REWARD_POINTS_EXCHANGE_RATE") {
            self.reward_points.exchange_rate =
                parse_decimal("CARTPRICE_REWARD_POINTS_EXCHANGE_RATE", &value)?;
        }
        if let Some(value) = read_env("CARTPRICE_REWARD_POINTS_ROUND_DOWN") {
            self.reward_points.round_down =
                parse_bool("CARTPRICE_REWARD_POINTS_ROUND_DOWN", &value)?;
        }

        let log_level =
            read_env("CARTPRICE_LOGGING_LEVEL").or_else(|| read_env("CARTPRICE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARTPRICE_LOGGING_FORMAT").or_else(|| read_env("CARTPRICE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(rounding) = overrides.rounding {
            self.pricing.rounding = rounding;
        }
        if let Some(display_including_tax) = overrides.display_including_tax {
            self.pricing.display_including_tax = display_including_tax;
        }
        if let Some(enabled) = overrides.reward_points_enabled {
            self.reward_points.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tax(&self.tax)?;
        validate_shipping(&self.shipping)?;
        validate_reward_points(&self.reward_points)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cartprice.toml"), PathBuf::from("config/cartprice.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_tax(tax: &TaxConfig) -> Result<(), ConfigError> {
    let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&tax.shipping_tax_category) {
        return Err(ConfigError::Validation(
            "tax.shipping_tax_category must not be blank when set".to_string(),
        ));
    }
    if blank(&tax.payment_fee_tax_category) {
        return Err(ConfigError::Validation(
            "tax.payment_fee_tax_category must not be blank when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_shipping(shipping: &ShippingConfig) -> Result<(), ConfigError> {
    if shipping.free_shipping_over_value < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "shipping.free_shipping_over_value must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_reward_points(reward_points: &RewardPointsConfig) -> Result<(), ConfigError> {
    if reward_points.enabled && reward_points.exchange_rate <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "reward_points.exchange_rate must be greater than zero when reward points are enabled"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    tax: Option<TaxPatch>,
    shipping: Option<ShippingPatch>,
    reward_points: Option<RewardPointsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    rounding: Option<RoundingPolicy>,
    midpoint: Option<MidpointRounding>,
    display_including_tax: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxPatch {
    shipping_is_taxable: Option<bool>,
    shipping_tax_category: Option<String>,
    payment_fee_is_taxable: Option<bool>,
    payment_fee_tax_category: Option<String>,
    auxiliary_services_taxing: Option<AuxiliaryTaxingStrategy>,
}

#[derive(Debug, Default, Deserialize)]
struct ShippingPatch {
    free_shipping_over_enabled: Option<bool>,
    free_shipping_over_value: Option<Decimal>,
    free_shipping_over_including_tax: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RewardPointsPatch {
    enabled: Option<bool>,
    exchange_rate: Option<Decimal>,
    round_down: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
