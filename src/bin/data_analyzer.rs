use clap::Parser;
use howto_bot::app::interactive;
use howto_bot::utils::{logger, validation::Validate};
use howto_bot::{
    BedrockClient, BotError, ConfluenceClient, DataAnalysisPipeline, LocalStorage, Orchestrator,
    RunOptions, Settings, WarehouseClient,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "data-analyzer")]
#[command(about = "Analyze warehouse scorecard data with AI and write a report")]
struct Args {
    /// What the analysis should focus on; asked interactively when omitted
    #[arg(long)]
    focus: Option<String>,

    /// Use the default analysis focus without asking
    #[arg(long, conflicts_with = "focus")]
    no_prompt: bool,

    /// SQL to run instead of the scorecard query
    #[arg(long)]
    sql: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long, help = "Publish the report to Confluence")]
    publish: bool,

    #[arg(long)]
    output_path: Option<String>,

    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    monitor: bool,

    #[arg(long)]
    log_json: bool,
}

fn exit_with(context: &str, e: BotError) -> ! {
    e.report(context);
    std::process::exit(e.exit_code())
}

fn ask_focus() -> Option<String> {
    println!("💬 Enter a custom analysis focus, or press Enter for the default:");
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    interactive::ask(&mut input, &mut out, "> ").ok().flatten()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_logger(args.verbose, args.log_json);
    tracing::info!("Starting data-analyzer");

    let settings =
        Settings::load(args.config.as_deref()).unwrap_or_else(|e| exit_with("Configuration loading", e));
    let options = RunOptions::new(
        args.output_path
            .clone()
            .unwrap_or_else(|| settings.output_dir().to_string()),
    )
    .with_title(args.title.clone())
    .with_publish(args.publish);

    if let Err(e) = options.validate().and_then(|_| settings.validate()) {
        exit_with("Configuration validation", e);
    }

    let warehouse = settings
        .warehouse_settings()
        .and_then(|s| WarehouseClient::new(&s))
        .unwrap_or_else(|e| exit_with("Warehouse client setup", e));
    let analyzer = settings
        .analysis_settings()
        .and_then(|s| BedrockClient::new(&s))
        .unwrap_or_else(|e| exit_with("Analysis client setup", e));

    let focus = match (&args.focus, args.no_prompt) {
        (Some(focus), _) => Some(focus.clone()),
        (None, true) => None,
        (None, false) => ask_focus(),
    };

    let storage = LocalStorage::new(options.output_path.clone());
    let mut pipeline =
        DataAnalysisPipeline::new(storage, options, Arc::new(warehouse), Arc::new(analyzer))
            .with_focus(focus);
    if let Some(sql) = &args.sql {
        pipeline = pipeline.with_sql(sql.clone());
    }

    if args.publish {
        let publisher = settings
            .publish_settings()
            .and_then(|s| ConfluenceClient::new(&s))
            .unwrap_or_else(|e| exit_with("Confluence client setup", e));
        pipeline = pipeline.with_publisher(Arc::new(publisher));
    }

    let report = Orchestrator::new_with_monitoring(pipeline, args.monitor)
        .run()
        .await;
    print!("{}", report);

    match report.failure {
        Some(failure) => exit_with(&format!("Stage {}", failure.stage), failure.error),
        None => println!("✅ Data analysis completed successfully!"),
    }
}
