use clap::Parser;
use howto_bot::app::interactive;
use howto_bot::utils::{logger, validation::Validate};
use howto_bot::{
    BedrockClient, BotError, ConfluenceClient, DashboardTarget, LocalStorage, Orchestrator,
    QuickSightClient, QuickSightPipeline, RunOptions, Settings,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quicksight-analyzer")]
#[command(about = "Analyze a QuickSight dashboard from its API metadata")]
struct Args {
    /// Dashboard ID to analyze
    #[arg(long, conflicts_with_all = ["search", "list"])]
    id: Option<String>,

    /// Analyze the first dashboard whose name contains this keyword
    #[arg(long, conflicts_with = "list")]
    search: Option<String>,

    /// List dashboards and exit
    #[arg(long)]
    list: bool,

    #[arg(long, default_value_t = 20)]
    max_results: usize,

    /// What the analysis should focus on; asked interactively when omitted
    #[arg(long)]
    focus: Option<String>,

    /// Use the default analysis focus without asking
    #[arg(long, conflicts_with = "focus")]
    no_prompt: bool,

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

fn ask(prompt: &str) -> Option<String> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    interactive::ask(&mut input, &mut out, prompt).ok().flatten()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_logger(args.verbose, args.log_json);
    tracing::info!("Starting quicksight-analyzer");

    let settings =
        Settings::load(args.config.as_deref()).unwrap_or_else(|e| exit_with("Configuration loading", e));
    let catalog = settings
        .quicksight_settings()
        .and_then(|s| QuickSightClient::new(&s))
        .unwrap_or_else(|e| exit_with("QuickSight client setup", e));

    if args.list {
        let dashboards = catalog
            .list_dashboards(args.max_results)
            .await
            .unwrap_or_else(|e| exit_with("Listing dashboards", e));
        for (i, d) in dashboards.iter().enumerate() {
            println!("{}. {}", i + 1, d.name);
            println!("   ID: {}", d.dashboard_id);
            println!(
                "   Last Updated: {}",
                d.last_updated_time.as_deref().unwrap_or("Unknown")
            );
        }
        return;
    }

    let target = match (&args.id, &args.search) {
        (Some(id), _) => DashboardTarget::Id(id.clone()),
        (None, Some(keyword)) => DashboardTarget::Search(keyword.clone()),
        (None, None) => match ask("Dashboard ID: ") {
            Some(id) => DashboardTarget::Id(id),
            None => exit_with(
                "Dashboard selection",
                BotError::MissingConfigError {
                    field: "--id or --search".to_string(),
                },
            ),
        },
    };

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

    let analyzer = settings
        .analysis_settings()
        .and_then(|s| BedrockClient::new(&s))
        .unwrap_or_else(|e| exit_with("Analysis client setup", e));

    let focus = match (&args.focus, args.no_prompt) {
        (Some(focus), _) => Some(focus.clone()),
        (None, true) => None,
        (None, false) => {
            println!("💬 Enter a custom analysis focus, or press Enter for the default:");
            ask("> ")
        }
    };

    let storage = LocalStorage::new(options.output_path.clone());
    let mut pipeline = QuickSightPipeline::new(
        storage,
        options,
        Arc::new(catalog),
        Arc::new(analyzer),
        target,
    )
    .with_focus(focus);

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
        None => println!("✅ Dashboard analysis completed successfully!"),
    }
}
