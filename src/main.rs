use clap::Parser;
use howto_bot::app::interactive;
use howto_bot::core::images::{
    default_image_dirs, find_recent_images, validate_image, RECENT_IMAGE_LIMIT,
};
use howto_bot::core::ConfigProvider;
use howto_bot::utils::{logger, validation::Validate};
use howto_bot::{
    BedrockClient, BotError, CliConfig, ConfluenceClient, DashboardPipeline, LocalStorage,
    Orchestrator, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;

fn exit_with(context: &str, e: BotError) -> ! {
    e.report(context);
    std::process::exit(e.exit_code())
}

fn print_dry_run(config: &CliConfig, settings: &Settings) {
    println!("🧪 Dry run, nothing will be sent");
    println!("Mode: {:?}", config.mode);
    println!("Output directory: {}", config.output_path());
    for image in &config.images {
        match validate_image(image) {
            Ok(path) => println!("   ✅ {}", path.display()),
            Err(e) => println!("   ❌ {}", e.user_friendly_message()),
        }
    }
    match settings.analysis_settings() {
        Ok(analysis) => println!("Analysis model: {} via {}", analysis.model_id, analysis.endpoint),
        Err(e) => println!("Analysis not configured: {}", e.user_friendly_message()),
    }
    if config.publish {
        match settings.publish_settings() {
            Ok(publish) => println!("Publish to space {} at {}", publish.space_key, publish.url),
            Err(e) => println!("Publishing not configured: {}", e.user_friendly_message()),
        }
    }
}

#[tokio::main]
async fn main() {
    let mut config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.log_json);
    tracing::info!("Starting howto-bot");

    let settings = Settings::load(config.config.as_deref())
        .unwrap_or_else(|e| exit_with("Configuration loading", e));
    config.resolve_output_path(settings.output_dir());
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate().and_then(|_| settings.validate()) {
        exit_with("Configuration validation", e);
    }

    if config.images.is_empty() {
        let mut dirs: Vec<PathBuf> = config.scan_dirs.iter().map(PathBuf::from).collect();
        dirs.extend(default_image_dirs());
        let recent = find_recent_images(&dirs, RECENT_IMAGE_LIMIT);

        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut out = std::io::stdout();
        match interactive::select_images(&mut input, &mut out, &recent) {
            Ok(Some(images)) => config.images = images,
            Ok(None) => {
                println!("Goodbye!");
                return;
            }
            Err(e) => exit_with("Image selection", BotError::from(e)),
        }
    }

    if config.dry_run {
        print_dry_run(&config, &settings);
        return;
    }

    let analyzer = settings
        .analysis_settings()
        .and_then(|s| BedrockClient::new(&s))
        .unwrap_or_else(|e| exit_with("Analysis client setup", e));

    let storage = LocalStorage::new(config.output_path());
    let mut pipeline = DashboardPipeline::new(
        storage,
        config.clone(),
        Arc::new(analyzer),
        config.images.clone(),
        config.mode,
    );

    if config.publish {
        let publisher = settings
            .publish_settings()
            .and_then(|s| ConfluenceClient::new(&s))
            .unwrap_or_else(|e| exit_with("Confluence client setup", e));
        pipeline = pipeline.with_publisher(Arc::new(publisher));
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let orchestrator = Orchestrator::new_with_monitoring(pipeline, config.monitor);
    let report = orchestrator.run().await;
    print!("{}", report);

    match report.failure {
        Some(failure) => exit_with(&format!("Stage {}", failure.stage), failure.error),
        None => println!("✅ Dashboard guide completed successfully!"),
    }
}
