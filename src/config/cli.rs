use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::pagination::DEFAULT_PAGE_SIZE;

/// Command-line arguments for the catalog binary.
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Browse and edit the product catalog")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CATALOG_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the catalog service base URL.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override the request timeout.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show one page of products.
    List(ListArgs),
    /// Show every product.
    All,
    /// Show a single product.
    Show(ShowArgs),
    /// Show the category options.
    Categories,
    /// Update a product with a sparse patch.
    Edit(Box<EditArgs>),
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Products per page.
    #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Keep only products whose title, description, category or brand
    /// contains this text.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Product identifier.
    #[arg(value_name = "ID")]
    pub id: u64,
}

#[derive(Debug, Args, Clone, Default)]
pub struct EditArgs {
    /// Product identifier.
    #[arg(value_name = "ID")]
    pub id: u64,

    /// JSON file with patch fields; flags override its values.
    #[arg(long = "patch-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub patch_file: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    /// Discount percentage (0-100).
    #[arg(long = "discount", value_name = "PERCENT")]
    pub discount_percentage: Option<f64>,

    #[arg(long)]
    pub stock: Option<u32>,

    /// Rating (0-5).
    #[arg(long)]
    pub rating: Option<f64>,

    #[arg(long)]
    pub brand: Option<String>,

    /// Category value (slug).
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, value_name = "URL")]
    pub thumbnail: Option<String>,

    /// Image URL; repeat to replace the whole image list.
    #[arg(long = "image", value_name = "URL")]
    pub images: Vec<String>,
}
