use std::io::Write;

use catalog_types::Product;
use serde::Serialize;
use tracing::info;

use crate::application::categories::{self, CategoryOption};
use crate::application::pagination::{PageRequest, page_count};
use crate::application::{AppError, CatalogClient, search};
use crate::config::{Command, EditArgs, ListArgs};

use super::io::build_patch;
use super::print::print_json;

#[derive(Debug, Serialize)]
pub struct PageView<'a> {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub skip: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
    pub products: Vec<&'a Product>,
}

#[derive(Debug, Serialize)]
pub struct EditView {
    pub updated: Product,
    pub current: Product,
}

pub async fn handle<W: Write>(
    client: &CatalogClient,
    command: Command,
    out: &mut W,
) -> Result<(), AppError> {
    match command {
        Command::List(args) => list(client, &args, out).await,
        Command::All => {
            let all = client.list_all_products().await?;
            print_json(out, &all)
        }
        Command::Show(args) => {
            let product = client.get_product_by_id(args.id).await?;
            print_json(out, &product)
        }
        Command::Categories => {
            let options: Vec<CategoryOption> =
                categories::options(&client.list_categories().await?);
            print_json(out, &options)
        }
        Command::Edit(args) => edit(client, &args, out).await,
    }
}

async fn list<W: Write>(
    client: &CatalogClient,
    args: &ListArgs,
    out: &mut W,
) -> Result<(), AppError> {
    let request = PageRequest::new(args.page, args.page_size)?;
    let page = client
        .list_products(request.page_size(), request.skip()?)
        .await?;

    let needle = args.search.as_deref().unwrap_or_default();
    let view = PageView {
        page: request.page(),
        page_size: request.page_size(),
        total: page.total,
        total_pages: page_count(page.total, request.page_size()),
        skip: page.skip,
        search: args.search.as_deref(),
        products: search::filter(&page.products, needle),
    };
    print_json(out, &view)
}

async fn edit<W: Write>(
    client: &CatalogClient,
    args: &EditArgs,
    out: &mut W,
) -> Result<(), AppError> {
    let patch = build_patch(args).await?;
    let updated = client.update_product(args.id, &patch).await?;
    let current = client.get_product_by_id(args.id).await?;
    info!(product_id = args.id, "Product edit applied");

    print_json(out, &EditView { updated, current })
}
