use std::path::{Path, PathBuf};

use bytes::Bytes;
use catalog_common::telemetry::{self, TelemetryConfig};
use catalog_common::{
    ApiClient, AuthService, Blog, CatalogService, Config, Industry, ListParams, Notification,
    Notifier, Product, Project, Resource, Session, Severity, UploadService, UserRequestService,
    matches_search,
};
use catalog_editor_core::{
    CodeEditor, CommandOutcome, FormatCommand, ImageFile, MemorySurface, Selection,
    UploadOrdering, UploadOutcome, render_preview, render_preview_sanitized, utf16_len,
};
use miette::{IntoDiagnostic, Result, miette};
use mime_sniffer::MimeTypeSniffer;
use serde::Serialize;
use serde::de::DeserializeOwned;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Catalog console - markdown authoring and catalog administration", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a .toml or .json config file
    #[arg(long, env = "CATALOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long, env = "CATALOG_API_URL", global = true)]
    api_url: Option<String>,

    /// Path to the session file
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to the preview HTML
    Preview {
        file: PathBuf,

        /// Skip the sanitizing pass
        #[arg(long)]
        raw: bool,
    },
    /// Apply a toolbar formatting command to a range of a markdown file
    Format {
        file: PathBuf,

        /// Command name (bold, italic, underline, code, quote, ul, ol, link, h1, h2, h3)
        command: String,

        /// Selection start, in UTF-16 code units
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Selection end, in UTF-16 code units (defaults to start)
        #[arg(long)]
        end: Option<usize>,

        /// Rewrite the file instead of printing the result
        #[arg(long)]
        in_place: bool,
    },
    /// Upload images and insert references to them into a markdown file
    InsertImage {
        file: PathBuf,

        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Insertion offset in UTF-16 code units (defaults to end of file)
        #[arg(long)]
        at: Option<usize>,

        /// Upload one at a time, inserting in the order given
        #[arg(long)]
        queued: bool,

        /// Rewrite the file instead of printing the result
        #[arg(long)]
        in_place: bool,
    },
    /// Log in to the catalog API
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored session
    Logout,
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Manage blog posts
    Blogs {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Browse and export contact requests
    Requests {
        #[command(subcommand)]
        action: RequestAction,
    },
}

#[derive(Subcommand)]
enum ResourceAction {
    /// List one page
    List(ListArgs),
    /// Show one item
    Get { id: String },
    /// Create an item from a JSON file
    Create { file: PathBuf },
    /// Replace an item with the contents of a JSON file
    Update { id: String, file: PathBuf },
    /// Delete an item
    Delete { id: String },
}

#[derive(Subcommand)]
enum RequestAction {
    /// List one page
    List(ListArgs),
    /// Show one request
    Get { id: String },
    /// Download all requests as a spreadsheet
    Export {
        #[arg(long, default_value = UserRequestService::EXPORT_FILE_NAME)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long)]
    limit: Option<u32>,

    /// Case-insensitive substring filter
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    industry: Option<Industry>,

    #[arg(long)]
    tag: Option<String>,
}

impl ListArgs {
    fn params(&self) -> ListParams {
        ListParams {
            limit: self.limit,
            industry: self.industry,
            tag: self.tag.clone(),
            ..ListParams::page(self.page).with_search(self.search.clone().unwrap_or_default())
        }
    }
}

/// Prints notifications to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let mark = match notification.severity {
            Severity::Info => "✓",
            Severity::Error => "✗",
        };
        eprintln!("{mark} {notification}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    dotenvy::dotenv().ok();

    let Cli {
        config,
        api_url,
        session,
        verbose,
        command,
    } = Cli::parse();

    let mut telemetry_config = TelemetryConfig::from_env("catalog-cli");
    if verbose {
        telemetry_config = telemetry_config.with_level(tracing::Level::DEBUG);
    }
    telemetry::init(telemetry_config);

    let remote = Remote {
        config,
        api_url,
        session,
    };

    match command {
        Commands::Preview { file, raw } => preview(&file, raw),
        Commands::Format {
            file,
            command,
            start,
            end,
            in_place,
        } => format_file(&file, &command, Selection::new(start, end.unwrap_or(start)), in_place),
        Commands::InsertImage {
            file,
            images,
            at,
            queued,
            in_place,
        } => {
            let (config, client) = remote.connect().await?;
            let ordering = if queued {
                UploadOrdering::Queued
            } else {
                UploadOrdering::Resolution
            };
            insert_images(&config, client, &file, &images, at, ordering, in_place).await
        }
        Commands::Login { email, password } => {
            let (_, client) = remote.connect().await?;
            let user = AuthService::new(client).login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
            Ok(())
        }
        Commands::Logout => {
            let (_, client) = remote.connect().await?;
            AuthService::new(client).logout().await?;
            Ok(())
        }
        Commands::Products { action } => {
            run_resource::<Product>(remote.connect().await?.1, action).await
        }
        Commands::Projects { action } => {
            run_resource::<Project>(remote.connect().await?.1, action).await
        }
        Commands::Blogs { action } => run_resource::<Blog>(remote.connect().await?.1, action).await,
        Commands::Requests { action } => run_requests(remote.connect().await?.1, action).await,
    }
}

/// Connection settings from the global flags, resolved only by commands that
/// talk to the API.
struct Remote {
    config: Option<PathBuf>,
    api_url: Option<String>,
    session: Option<PathBuf>,
}

impl Remote {
    async fn connect(self) -> Result<(Config, ApiClient)> {
        let config = load_config(self.config.as_deref(), self.api_url)?;
        let session_path = self
            .session
            .unwrap_or_else(|| default_session_path(&config));
        if let Some(parent) = session_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
        let session = Session::init(&session_path).await?;
        tracing::debug!(api = %config.api_url, session = %session_path.display(), "connecting");
        let client = ApiClient::new(&config, session)?.with_notifier(ConsoleNotifier);
        Ok((config, client))
    }
}

fn load_config(path: Option<&Path>, api_url: Option<String>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(api_url) = api_url {
        config.api_url = api_url;
        config.api_url()?;
    }
    Ok(config)
}

/// The configured session file, or one under the user config directory when
/// the configuration leaves it at the default.
fn default_session_path(config: &Config) -> PathBuf {
    if config.session_path != Path::new(Config::DEFAULT_SESSION_FILE) {
        return config.session_path.clone();
    }
    dirs::config_dir()
        .map(|dir| dir.join("catalog").join(Config::DEFAULT_SESSION_FILE))
        .unwrap_or_else(|| config.session_path.clone())
}

fn preview(file: &Path, raw: bool) -> Result<()> {
    let markdown = std::fs::read_to_string(file).into_diagnostic()?;
    let html = if raw {
        render_preview(&markdown)
    } else {
        render_preview_sanitized(&markdown)
    };
    println!("{html}");
    Ok(())
}

fn format_file(file: &Path, name: &str, selection: Selection, in_place: bool) -> Result<()> {
    let command: FormatCommand = name.parse().into_diagnostic()?;
    let markdown = std::fs::read_to_string(file).into_diagnostic()?;
    let mut editor = CodeEditor::new(MemorySurface::new(selection), markdown);

    match editor.apply_command(command) {
        CommandOutcome::Applied => {
            if let Some(restored) = editor.after_render().into_diagnostic()? {
                tracing::debug!(start = restored.start, end = restored.end, "selection after edit");
            }
        }
        CommandOutcome::OpenFilePicker => {
            return Err(miette!(
                help = "Use `catalog insert-image <file> <images>...`",
                "the image command needs files to upload"
            ));
        }
        CommandOutcome::Ignored => return Err(miette!("nothing to format")),
    }

    let (_, markdown) = editor.into_parts();
    write_document(file, &markdown, in_place)
}

async fn insert_images(
    config: &Config,
    client: ApiClient,
    file: &Path,
    images: &[PathBuf],
    at: Option<usize>,
    ordering: UploadOrdering,
    in_place: bool,
) -> Result<()> {
    let markdown = std::fs::read_to_string(file).into_diagnostic()?;
    let at = at.unwrap_or_else(|| utf16_len(&markdown));

    let mut editor = CodeEditor::new(MemorySurface::new(Selection::collapsed(at)), markdown)
        .with_uploader(UploadService::new(client))
        .with_ordering(ordering);
    if let Some(base) = &config.asset_base_url {
        editor = editor.with_base_url(base.clone());
    }

    let files = images
        .iter()
        .map(|path| read_image(path))
        .collect::<Result<Vec<_>>>()?;
    let outcomes = editor.on_files_selected(files).await;
    if outcomes.is_empty() {
        return Err(miette!("no image files among the given paths"));
    }
    for outcome in &outcomes {
        match outcome {
            UploadOutcome::Uploaded { name, url } => eprintln!("✓ {name} → {url}"),
            UploadOutcome::Placeholder { name } => {
                eprintln!("⚠ {name}: upload failed, inserted placeholder")
            }
            UploadOutcome::Dropped { name } => eprintln!("⚠ {name}: not inserted"),
        }
    }

    let (_, markdown) = editor.into_parts();
    write_document(file, &markdown, in_place)
}

fn read_image(path: &Path) -> Result<ImageFile> {
    let data = Bytes::from(std::fs::read(path).into_diagnostic()?);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media_type = media_type(path, &data);
    tracing::debug!(%name, %media_type, "read image");
    Ok(ImageFile::new(name, media_type, data))
}

/// Media type sniffed from the file contents, falling back to the extension
/// when the contents are plain text or unrecognised.
fn media_type(path: &Path, data: &Bytes) -> String {
    data.sniff_mime_type()
        .filter(|mime| !mime.starts_with("text/") && *mime != "application/octet-stream")
        .or_else(|| extension_media_type(path))
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn extension_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

fn write_document(file: &Path, markdown: &str, in_place: bool) -> Result<()> {
    if in_place {
        std::fs::write(file, markdown).into_diagnostic()?;
        eprintln!("✓ Wrote {}", file.display());
    } else {
        print!("{markdown}");
    }
    Ok(())
}

async fn run_resource<R>(client: ApiClient, action: ResourceAction) -> Result<()>
where
    R: Resource,
{
    let service = CatalogService::<R>::new(client);
    match action {
        ResourceAction::List(args) => {
            let mut page = service.list(&args.params()).await?;
            if let Some(term) = &args.search {
                page.data.retain(|item| matches_search(item, term));
            }
            print_json(&page)
        }
        ResourceAction::Get { id } => print_json(&service.get(&id).await?),
        ResourceAction::Create { file } => {
            let item: R = read_json(&file)?;
            print_json(&service.create(&item).await?)
        }
        ResourceAction::Update { id, file } => {
            let item: R = read_json(&file)?;
            print_json(&service.update(&id, &item).await?)
        }
        ResourceAction::Delete { id } => service.delete(&id).await.map_err(Into::into),
    }
}

async fn run_requests(client: ApiClient, action: RequestAction) -> Result<()> {
    let service = UserRequestService::new(client);
    match action {
        RequestAction::List(args) => {
            let mut page = service.list(&args.params()).await?;
            if let Some(term) = &args.search {
                page.data.retain(|item| matches_search(item, term));
            }
            print_json(&page)
        }
        RequestAction::Get { id } => print_json(&service.get(&id).await?),
        RequestAction::Export { out } => {
            let bytes = service.export_xlsx().await?;
            std::fs::write(&out, &bytes).into_diagnostic()?;
            eprintln!("✓ Saved {} ({} bytes)", out.display(), bytes.len());
            Ok(())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&text).into_diagnostic()
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

    #[test]
    fn test_media_type_sniffs_contents() {
        let png = Bytes::from_static(PNG_MAGIC);
        assert_eq!(media_type(Path::new("screenshot"), &png), "image/png");
        assert_eq!(media_type(Path::new("mislabelled.txt"), &png), "image/png");

        let pdf = Bytes::from_static(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");
        assert_eq!(media_type(Path::new("report.pdf"), &pdf), "application/pdf");
    }

    #[test]
    fn test_media_type_falls_back_to_extension() {
        let empty = Bytes::new();
        assert_eq!(media_type(Path::new("cat.PNG"), &empty), "image/png");
        assert_eq!(media_type(Path::new("a/b.jpeg"), &empty), "image/jpeg");
        assert_eq!(media_type(Path::new("noext"), &empty), "application/octet-stream");
    }

    #[test]
    fn test_read_image_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let file = read_image(&path).unwrap();
        assert_eq!(file.name.as_str(), "screenshot");
        assert_eq!(file.media_type.as_str(), "image/png");
        assert!(file.is_image());
    }

    #[test]
    fn test_list_args_to_params() {
        let args = ListArgs {
            page: 2,
            limit: Some(20),
            search: Some(String::new()),
            industry: Some(Industry::Oil),
            tag: None,
        };
        let params = args.params();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, Some(20));
        assert_eq!(params.search, None);
        assert_eq!(params.industry, Some(Industry::Oil));
    }
}
