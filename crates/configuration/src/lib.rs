use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod options;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use options::{StrategyConfig, StrategyOptions};
pub use settings::{
    BacktestSettings, Config, LogFormat, LoggingSettings, MeanReversionParams, MomentumParams,
    OptimizerSettings, PortfolioConstraints, RiskSettings, StatArbParams, Strategies,
};

/// Loads the application configuration from the `config.toml` file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads and validates the configuration from `path`.
///
/// Missing sections fall back to their defaults, and any value can be
/// overridden by an environment variable such as
/// `QUANTLAB__BACKTEST__TRANSACTION_COST=0.001`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("QUANTLAB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
