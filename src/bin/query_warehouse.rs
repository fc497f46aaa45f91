use anyhow::Context;
use clap::Parser;
use howto_bot::adapters::warehouse::to_csv;
use howto_bot::app::pipelines::SCORECARD_QUERY;
use howto_bot::core::{QueryResult, Warehouse};
use howto_bot::utils::logger;
use howto_bot::{Settings, WarehouseClient};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "query-warehouse")]
#[command(about = "Run a query on the warehouse and print or export the rows")]
struct Args {
    /// SQL to run instead of the scorecard query
    #[arg(long, conflicts_with = "sql_file")]
    sql: Option<String>,

    /// File containing the SQL to run
    #[arg(long)]
    sql_file: Option<String>,

    /// Write the rows to this CSV file
    #[arg(long)]
    csv: Option<String>,

    /// Write the rows to this JSON file
    #[arg(long)]
    json: Option<String>,

    /// Rows to print
    #[arg(long, default_value_t = 20)]
    limit: usize,

    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_table(result: &QueryResult, limit: usize) {
    let shown: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(cell).collect())
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            shown
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(result.columns.iter().map(String::as_str).collect()));
    println!("{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    for row in &shown {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
    if result.len() > limit {
        println!("... {} more row(s)", result.len() - limit);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let sql = match (&args.sql, &args.sql_file) {
        (Some(sql), _) => sql.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file '{}'", path))?,
        (None, None) => SCORECARD_QUERY.to_string(),
    };

    let settings = Settings::load(args.config.as_deref())?;
    let warehouse = match settings.warehouse_settings().and_then(|s| WarehouseClient::new(&s)) {
        Ok(client) => client,
        Err(e) => {
            e.report("Warehouse client setup");
            std::process::exit(e.exit_code());
        }
    };

    tracing::info!("🗄️ Running query on the warehouse");
    let result = match warehouse.run_query(&sql).await {
        Ok(result) => result,
        Err(e) => {
            e.report("Query");
            std::process::exit(e.exit_code());
        }
    };

    println!("✅ Query returned {} row(s), {} column(s)", result.len(), result.columns.len());
    if !result.is_empty() {
        print_table(&result, args.limit);
    }

    if let Some(path) = &args.csv {
        std::fs::write(path, to_csv(&result)?)
            .with_context(|| format!("Failed to write CSV to '{}'", path))?;
        println!("💾 CSV saved to: {}", path);
    }
    if let Some(path) = &args.json {
        let body = serde_json::to_string_pretty(&result.records())?;
        std::fs::write(path, body).with_context(|| format!("Failed to write JSON to '{}'", path))?;
        println!("💾 JSON saved to: {}", path);
    }

    Ok(())
}
