use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use shipfee::{
    adapters::{
        GhnMasterData, HttpHandler, IpInfoGeoLookup, JsonHttpClient, MemoryCacheStore,
        NominatimGeocoder, RedisCacheStore, StaticAddressBook,
    },
    config::{CacheBackend, EngineConfig, EngineConfigValidator, load_config, loader},
    core::{
        AddressCanonicalizer, CallerIdentity, LocationResolver, OriginAddress, ProductShipping,
        Region, ResolverPorts, ServiceTier, ShippingCalculator, ShippingFeeCache,
    },
    ports::CacheStore,
    tracing_setup,
};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml", global = true)]
    config: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Start the HTTP server (default)
    Serve,
    /// Quote shipping of one product and print the result as JSON
    Quote {
        /// Parcel weight in kilograms
        #[clap(short, long)]
        weight: f64,
        /// Province the product ships from
        #[clap(long)]
        origin_province: String,
        /// Region id (1-6) of the origin province
        #[clap(long)]
        origin_region: u8,
        /// Caller IP used to locate the destination
        #[clap(long)]
        ip: Option<String>,
        /// User whose default address is the destination
        #[clap(long)]
        user: Option<String>,
        /// standard or fast; defaults to the configured tier
        #[clap(long)]
        tier: Option<ServiceTier>,
    },
    /// Resolve an IP address to a shipping location
    Resolve {
        #[clap(long)]
        ip: Option<String>,
    },
}

/// Everything the commands need, wired from configuration
struct Services {
    engine: Arc<ShippingFeeCache>,
    canonicalizer: Arc<AddressCanonicalizer>,
}

async fn build_services(config: &EngineConfig) -> Result<Services> {
    let upstream_timeout = config
        .upstream
        .timeout()
        .context("Invalid upstream.timeout")?;
    let cache_ttl = config.cache.ttl().context("Invalid cache.ttl")?;

    let cache: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .ok_or_else(|| eyre!("cache.redis_url is required for the redis backend"))?;
            Arc::new(
                RedisCacheStore::connect(url)
                    .await
                    .context("Failed to connect to Redis")?,
            )
        }
    };

    let http = JsonHttpClient::new(upstream_timeout, &config.upstream.user_agent)
        .context("Failed to create HTTP client")?;
    let master_data = Arc::new(GhnMasterData::new(
        http.clone(),
        &config.upstream.master_data_url,
        &config.upstream.master_data_token,
    ));
    let ports = ResolverPorts {
        address_book: Arc::new(StaticAddressBook::new(config.address_book.clone())),
        geo_ip: Arc::new(IpInfoGeoLookup::new(
            http.clone(),
            &config.upstream.geo_ip_url,
            config.upstream.geo_ip_token.clone(),
        )),
        geocoder: Arc::new(NominatimGeocoder::new(
            http,
            &config.upstream.reverse_geocode_url,
        )),
        master_data: master_data.clone(),
    };

    let resolver = Arc::new(
        LocationResolver::new(ports, cache.clone())
            .with_cache_ttl(cache_ttl)
            .with_upstream_timeout(upstream_timeout),
    );
    let engine = ShippingFeeCache::new(
        resolver,
        ShippingCalculator::new(config.fee_table()),
        cache,
    )
    .with_ttl(cache_ttl);
    let canonicalizer =
        AddressCanonicalizer::new(master_data).with_upstream_timeout(upstream_timeout);

    Ok(Services {
        engine: Arc::new(engine),
        canonicalizer: Arc::new(canonicalizer),
    })
}

/// Load the config file, or defaults plus `SHIPFEE__*` overrides when it is absent
async fn load_engine_config(config_path: &str) -> Result<EngineConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
            .await
            .with_context(|| format!("Failed to load config from {config_path}"))
    } else {
        loader::load_from_env().context("Failed to load configuration from environment")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => validate_config_command(&config_path).await,
        Commands::Init => init_config_command(&config_path).await,
        Commands::Serve => serve_command(&config_path).await,
        Commands::Quote {
            weight,
            origin_province,
            origin_region,
            ip,
            user,
            tier,
        } => {
            let region = Region::try_from(origin_region).map_err(|e| eyre!(e))?;
            let product = ProductShipping {
                weight_kg: weight,
                origin: OriginAddress::new(origin_province, region),
            };
            quote_command(&config_path, product, CallerIdentity::new(user, ip), tier).await
        }
        Commands::Resolve { ip } => resolve_command(&config_path, ip).await,
    }
}

async fn serve_command(config_path: &str) -> Result<()> {
    let config = load_engine_config(config_path).await?;
    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    if let Err(e) = EngineConfigValidator::validate(&config) {
        return Err(eyre!("Invalid configuration: {}", e));
    }

    let services = build_services(&config).await?;
    let app = HttpHandler::new(
        services.engine,
        services.canonicalizer,
        config.default_service_tier,
    )
    .router();

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    tracing::info!(
        "shipfee listening on {} (cache: {:?}, default tier: {})",
        config.listen_addr,
        config.cache.backend,
        config.default_service_tier
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

async fn quote_command(
    config_path: &str,
    product: ProductShipping,
    caller: CallerIdentity,
    tier: Option<ServiceTier>,
) -> Result<()> {
    tracing_setup::init_console_tracing()?;
    let config = load_engine_config(config_path).await?;
    let services = build_services(&config).await?;

    let tier = tier.unwrap_or(config.default_service_tier);
    let response = services
        .engine
        .quote(&product, tier, &caller)
        .await
        .context("Quote failed")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn resolve_command(config_path: &str, ip: Option<String>) -> Result<()> {
    tracing_setup::init_console_tracing()?;
    let config = load_engine_config(config_path).await?;
    let services = build_services(&config).await?;

    let location = services
        .engine
        .resolver()
        .resolve_ip(ip.as_deref())
        .await
        .context("Location lookup failed")?;
    println!("{}", serde_json::to_string_pretty(&location)?);
    Ok(())
}

async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    // First check if file exists and is readable
    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    // Try to parse the configuration
    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    // Validate the configuration
    match EngineConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Default Tier: {}", config.default_service_tier);
            println!(
                "   • Cache: {:?} (ttl {})",
                config.cache.backend, config.cache.ttl
            );
            println!("   • Upstream Timeout: {}", config.upstream.timeout);
            println!(
                "   • Fee Table: {}",
                if config.fee_table.is_some() {
                    "custom"
                } else {
                    "built-in"
                }
            );
            println!("   • Saved Address Users: {}", config.address_book.len());
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all upstream URLs start with http:// or https://");
            println!("   • Use humantime durations such as '5s' or '1h'");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Set cache.redis_url when cache.backend = \"redis\"");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# shipfee configuration
# Every value can be overridden with SHIPFEE__<SECTION>__<KEY> environment variables.

listen_addr = "127.0.0.1:8080"
# standard | fast
default_service_tier = "standard"

[cache]
# memory | redis
backend = "memory"
# redis_url = "redis://127.0.0.1:6379/0"
ttl = "1h"

[upstream]
timeout = "5s"
geo_ip_url = "https://ipinfo.io"
# geo_ip_token = ""
reverse_geocode_url = "https://nominatim.openstreetmap.org"
user_agent = "shipfee/0.1 (ops@example.com)"
master_data_url = "https://online-gateway.ghn.vn/shiip/public-api/master-data"
master_data_token = ""

[logging]
level = "info"
json = true

# Saved addresses by user id
# [[address_book.user-1]]
# province_name = "Hà Nội"
# ward_name = "Phường Tràng Tiền"
# region_id = 2
# is_default = true
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'shipfee serve --config {config_path}' to start the server");
    Ok(())
}
