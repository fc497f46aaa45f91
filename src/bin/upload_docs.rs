use clap::Parser;
use howto_bot::app::interactive;
use howto_bot::core::images::validate_image;
use howto_bot::core::storage_format::extract_title;
use howto_bot::core::{PageDraft, Publisher};
use howto_bot::utils::logger;
use howto_bot::{BotError, ConfluenceClient, Settings};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "upload-docs")]
#[command(about = "Upload an existing Markdown or HTML document to Confluence")]
struct Args {
    /// Markdown or HTML file to upload
    file: String,

    /// Page title; taken from the first heading when omitted
    #[arg(long)]
    title: Option<String>,

    /// Screenshots to attach and embed
    #[arg(long = "image")]
    images: Vec<String>,

    /// Update an existing page without asking
    #[arg(short, long)]
    yes: bool,

    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn exit_with(context: &str, e: BotError) -> ! {
    e.report(context);
    std::process::exit(e.exit_code())
}

fn default_title(path: &Path, content: &str) -> String {
    extract_title(content).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().replace('_', " "))
            .unwrap_or_else(|| "Untitled".to_string())
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let path = PathBuf::from(&args.file);
    let content = std::fs::read_to_string(&path)
        .map_err(BotError::from)
        .unwrap_or_else(|e| exit_with(&format!("Reading {}", args.file), e));
    let title = args.title.clone().unwrap_or_else(|| default_title(&path, &content));

    let attachments: Vec<PathBuf> = args
        .images
        .iter()
        .filter_map(|raw| match validate_image(raw) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping invalid image: {}", e);
                None
            }
        })
        .collect();

    let settings =
        Settings::load(args.config.as_deref()).unwrap_or_else(|e| exit_with("Configuration loading", e));
    let client = settings
        .publish_settings()
        .and_then(|s| ConfluenceClient::new(&s))
        .unwrap_or_else(|e| exit_with("Confluence client setup", e));

    if let Err(e) = client.test_connection().await {
        exit_with("Confluence connection", e);
    }

    let existing = client
        .find_page_by_title(&title)
        .await
        .unwrap_or_else(|e| exit_with("Page lookup", e));
    if let Some(page) = &existing {
        println!("📄 Page '{}' already exists (version {})", page.title, page.version_number());
        if !args.yes {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            let update = interactive::confirm(&mut input, &mut out, "Update the existing page?")
                .unwrap_or(false);
            if !update {
                println!("Upload cancelled");
                return;
            }
        }
    }

    let draft = PageDraft {
        title,
        content,
        attachments,
    };
    match client.publish(&draft).await {
        Ok(page) => {
            println!("✅ Uploaded '{}' (version {})", draft.title, page.version);
            println!("🔗 {}", page.url);
        }
        Err(e) => exit_with("Upload", e),
    }
}
