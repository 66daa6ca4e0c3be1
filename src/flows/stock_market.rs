//! Stock market pipeline.
//!
//! Chain: `is_api_available` → `get_stock_prices` → `store_prices` →
//! `format_prices` → `get_formatted_csv` → `load_to_dw`. Each task pulls the
//! value its upstream published: the sensor hands the chart URL to the fetch,
//! the fetch hands the quote record to storage, storage hands its directory
//! to the formatter and the CSV lookup, and the lookup hands the CSV path to
//! the warehouse load.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::PipelineSettings;
use crate::connections::{Connection, ConnectionError};
use crate::execution::{ContainerRunner, JobConfig};
use crate::market::{format, quotes, store};
use crate::pipeline::{Pipeline, PokeStatus, RunContext, Sensor, SensorTask, Task, TaskError};
use crate::warehouse::Warehouse;

/// Pipeline name.
pub const PIPELINE_NAME: &str = "stock_market";

/// Task ids, in execution order.
pub const IS_API_AVAILABLE: &str = "is_api_available";
pub const GET_STOCK_PRICES: &str = "get_stock_prices";
pub const STORE_PRICES: &str = "store_prices";
pub const FORMAT_PRICES: &str = "format_prices";
pub const GET_FORMATTED_CSV: &str = "get_formatted_csv";
pub const LOAD_TO_DW: &str = "load_to_dw";

/// Environment variable the formatting container reads its argument from.
const FORMAT_JOB_ENV: &str = "SPARK_APPLICATION_ARGS";

/// Sensor gating the chain on finance API availability.
///
/// Probes the configured endpoint until it reports available, then publishes
/// the probed URL as the chart base for the fetch task.
struct ApiAvailableSensor {
    client: Client,
    url: String,
}

#[async_trait]
impl Sensor for ApiAvailableSensor {
    fn id(&self) -> &str {
        IS_API_AVAILABLE
    }

    async fn poke(&self, _ctx: &RunContext) -> Result<PokeStatus, TaskError> {
        if quotes::probe_api(&self.client, &self.url).await? {
            Ok(PokeStatus::Done(Some(json!(self.url))))
        } else {
            Ok(PokeStatus::NotYet)
        }
    }
}

/// Fetches one year of daily prices for the configured symbol.
struct GetStockPrices {
    client: Client,
    symbol: String,
}

#[async_trait]
impl Task for GetStockPrices {
    fn id(&self) -> &str {
        GET_STOCK_PRICES
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let url = ctx.pull_str(IS_API_AVAILABLE)?;
        let prices = quotes::fetch_stock_prices(&self.client, &url, &self.symbol).await?;
        info!(symbol = %self.symbol, "fetched stock prices");
        Ok(Some(prices))
    }
}

/// Persists the raw quote payload and publishes the symbol directory.
struct StorePrices {
    storage_root: PathBuf,
    symbol: String,
}

#[async_trait]
impl Task for StorePrices {
    fn id(&self) -> &str {
        STORE_PRICES
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let prices = ctx.pull(GET_STOCK_PRICES)?;
        let dir = store::store_prices(&self.storage_root, &self.symbol, &prices)?;
        Ok(Some(json!(dir.display().to_string())))
    }
}

/// Reformats the stored prices into CSV.
///
/// Default path: launch the configured container image with the symbol
/// directory passed through a single environment variable, the same contract
/// the external formatting job expects. Without a container runtime
/// configured, the in-process reformatter produces the same output layout.
struct FormatPrices {
    settings: PipelineSettings,
}

impl FormatPrices {
    /// Container job for one symbol directory, carrying the directory through
    /// the job's single environment variable and the configured network mode.
    fn job_config(&self, path: &str) -> JobConfig {
        let config = JobConfig::new(FORMAT_PRICES, &self.settings.format_image)
            .with_env(FORMAT_JOB_ENV, path);

        match &self.settings.format_network_mode {
            Some(mode) => config.with_network_mode(mode),
            None => config,
        }
    }
}

#[async_trait]
impl Task for FormatPrices {
    fn id(&self) -> &str {
        FORMAT_PRICES
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let path = ctx.pull_str(STORE_PRICES)?;

        if self.settings.format_in_container {
            let runner = ContainerRunner::connect(self.settings.docker_url.as_deref())?;
            let output = runner.run_to_completion(self.job_config(&path)).await?;
            debug!(logs = %output.logs, "formatting job finished");
        } else {
            let dir = Path::new(&path);
            let prices = store::read_prices(dir)?;
            let csv = format::reformat(&prices)?;
            store::write_formatted_csv(dir, &self.settings.symbol, &csv)?;
        }

        Ok(None)
    }
}

/// Locates the formatted CSV and publishes its path.
struct GetFormattedCsv;

#[async_trait]
impl Task for GetFormattedCsv {
    fn id(&self) -> &str {
        GET_FORMATTED_CSV
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let dir = ctx.pull_str(STORE_PRICES)?;
        let csv_path = store::find_formatted_csv(Path::new(&dir))?;
        Ok(Some(json!(csv_path.display().to_string())))
    }
}

/// Bulk-loads the formatted CSV into the warehouse table.
struct LoadToDw {
    settings: PipelineSettings,
}

#[async_trait]
impl Task for LoadToDw {
    fn id(&self) -> &str {
        LOAD_TO_DW
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let csv_path = ctx.pull_str(GET_FORMATTED_CSV)?;

        let conn = Connection::get(&self.settings.warehouse_conn_id)?;
        let url = conn.postgres_url(&self.settings.warehouse_conn_id)?;

        let warehouse = Warehouse::connect(
            &url,
            &self.settings.warehouse_schema,
            &self.settings.warehouse_table,
        )
        .await?;
        let rows = warehouse.load_csv(Path::new(&csv_path)).await?;

        Ok(Some(json!(rows)))
    }
}

/// Builds the stock market pipeline from settings.
///
/// Resolves the finance API connection up front; its headers become the HTTP
/// client's default headers and its host plus `extra.endpoint` form the URL
/// the sensor probes.
///
/// # Errors
///
/// Returns an error if the API connection is missing, lacks an `endpoint`
/// extra, or carries headers that cannot be represented.
pub fn build_pipeline(settings: &PipelineSettings) -> Result<Pipeline, TaskError> {
    let conn = Connection::get(&settings.api_conn_id)?;
    build_pipeline_with_connection(settings, &conn)
}

/// Builds the stock market pipeline against an already-resolved API
/// connection, for callers that do not source connections from the
/// environment.
pub fn build_pipeline_with_connection(
    settings: &PipelineSettings,
    conn: &Connection,
) -> Result<Pipeline, TaskError> {
    let endpoint = conn
        .extra_str("endpoint")
        .ok_or_else(|| ConnectionError::MissingField {
            id: settings.api_conn_id.clone(),
            field: "extra.endpoint".to_string(),
        })?;

    let client = quotes::build_client(&conn.extra_map("headers"))?;
    let url = format!("{}{}", conn.host, endpoint);

    let sensor = SensorTask::new(
        Box::new(ApiAvailableSensor {
            client: client.clone(),
            url,
        }),
        settings.poke_interval,
        settings.sensor_timeout,
    );

    Ok(Pipeline::new(PIPELINE_NAME)
        .with_tag("stock_market")
        .with_schedule("@daily")
        .add_task(Box::new(sensor))
        .add_task(Box::new(GetStockPrices {
            client,
            symbol: settings.symbol.clone(),
        }))
        .add_task(Box::new(StorePrices {
            storage_root: settings.storage_root.clone(),
            symbol: settings.symbol.clone(),
        }))
        .add_task(Box::new(FormatPrices {
            settings: settings.clone(),
        }))
        .add_task(Box::new(GetFormattedCsv))
        .add_task(Box::new(LoadToDw {
            settings: settings.clone(),
        })))
}
