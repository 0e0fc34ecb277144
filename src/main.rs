use std::{process, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use storefront_cms::{
    application::{content::ContentService, error::AppError},
    cache::{CacheConfig, CacheStore, MemoryCacheStore, compute_invalidation},
    config::{self, CategoriesArgs, GetArgs, InvalidateArgs, ListArgs, Settings},
    domain::{Collection, Grouping, ListQueryOptions},
    infra::{cms::CmsClient, error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = %report.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Get(args) => run_get(&content_service(&settings)?, args).await,
        config::Command::List(args) => run_list(&content_service(&settings)?, args).await,
        config::Command::Categories(args) => {
            run_categories(&content_service(&settings)?, args).await
        }
        config::Command::Invalidate(args) => run_invalidate(args),
    }
}

fn content_service(settings: &Settings) -> Result<ContentService, AppError> {
    let cache_config = CacheConfig::from(settings);
    let client = CmsClient::new(&settings.cms)?;
    Ok(ContentService::from_config(
        Arc::new(client),
        cache_config.clone(),
        || {
            let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&cache_config));
            Ok(store)
        },
    ))
}

async fn run_get(service: &ContentService, args: GetArgs) -> Result<(), AppError> {
    let collection = Collection::parse(&args.collection);
    let item: Option<Value> = service
        .get_published_single(&collection, &args.slug, args.locale.as_deref())
        .await?;

    if item.is_none() {
        info!(
            target: "storefront_cms::get",
            collection = %collection,
            slug = %args.slug,
            "No published item found"
        );
    }
    print_json(&item)
}

async fn run_list(service: &ContentService, args: ListArgs) -> Result<(), AppError> {
    let collection = Collection::parse(&args.collection);
    let options = ListQueryOptions {
        limit: args.limit,
        page: args.page,
        sort: args.sort,
        category_slug: args.category_slug,
        locale: args.locale,
    };

    let items: Vec<Value> = service.list_published(&collection, Some(&options)).await?;
    print_json(&items)
}

async fn run_categories(service: &ContentService, args: CategoriesArgs) -> Result<(), AppError> {
    let grouping = Grouping::from(args.kind);
    let groups: Vec<Value> = service
        .list_grouped_with_children(
            grouping,
            args.locale.as_deref(),
            args.category_slug.as_deref(),
        )
        .await?;
    print_json(&groups)
}

fn run_invalidate(args: InvalidateArgs) -> Result<(), AppError> {
    let collection = Collection::parse(&args.collection);
    let plan = compute_invalidation(&collection, args.slug.as_deref(), args.locale.as_deref());
    info!(
        target: "storefront_cms::invalidate",
        collection = %collection,
        exact_key = plan.exact_key.as_deref(),
        tags = ?plan.tags,
        "Computed invalidation plan"
    );
    print_json(&plan)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value).map_err(InfraError::from)?;
    println!("{out}");
    Ok(())
}
