use clap::Parser;
use howto_bot::utils::logger;
use howto_bot::utils::validation::Validate;
use howto_bot::{ConfluenceClient, Settings};

#[derive(Parser)]
#[command(name = "check-config")]
#[command(about = "Show which services are configured, with secrets redacted")]
struct Args {
    /// Also try to reach Confluence with the configured credentials
    #[arg(long)]
    connect: bool,

    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

/// Keeps the first four characters of a secret.
fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn status<T>(name: &str, result: &howto_bot::Result<T>) -> bool {
    match result {
        Ok(_) => {
            println!("✅ {}", name);
            true
        }
        Err(e) => {
            println!("❌ {}: {}", name, e.user_friendly_message());
            println!("   💡 {}", e.recovery_suggestion());
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let settings = Settings::load(args.config.as_deref())?;
    println!("Output directory: {}", settings.output_dir());
    println!("HTTP timeout: {}s", settings.timeout_seconds());
    if let Err(e) = settings.validate() {
        println!("❌ {}", e.user_friendly_message());
    }
    println!();

    let analysis = settings.analysis_settings();
    if status("Analysis (Bedrock)", &analysis) {
        if let Ok(a) = &analysis {
            println!("   endpoint: {}", a.endpoint);
            println!("   model:    {}", a.model_id);
            println!("   token:    {}", redact(&a.api_token));
        }
    }

    let warehouse = settings.warehouse_settings();
    if status("Warehouse (Redshift Data API)", &warehouse) {
        if let Ok(w) = &warehouse {
            println!("   endpoint: {}", w.endpoint);
            println!("   cluster:  {} / {} as {}", w.cluster_id, w.database, w.user);
            println!("   token:    {}", redact(&w.api_token));
        }
    }

    let quicksight = settings.quicksight_settings();
    if status("Dashboards (QuickSight)", &quicksight) {
        if let Ok(q) = &quicksight {
            println!("   endpoint: {}", q.endpoint);
            println!("   account:  {}", q.account_id);
            println!("   token:    {}", redact(&q.api_token));
        }
    }

    let publish = settings.publish_settings();
    if status("Publishing (Confluence)", &publish) {
        if let Ok(p) = &publish {
            println!("   url:      {}", p.url);
            println!("   user:     {}", p.username);
            println!("   space:    {}", p.space_key);
            println!(
                "   parent:   {}",
                p.parent_page_id.as_deref().unwrap_or("(space root)")
            );
            println!("   token:    {}", redact(&p.api_token));
        }
    }

    if args.connect {
        println!();
        match &publish {
            Ok(p) => match ConfluenceClient::new(p)?.test_connection().await {
                Ok(user) => println!(
                    "🔗 Connected to Confluence as {}",
                    user.display_name.as_deref().unwrap_or(&p.username)
                ),
                Err(e) => {
                    e.report("Confluence connection");
                    std::process::exit(e.exit_code());
                }
            },
            Err(_) => println!("⏭️ Skipping connection test, Confluence is not configured"),
        }
    }

    Ok(())
}
