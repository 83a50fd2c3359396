use super::Workspace;
use crate::output::{mask_secret, styled_table, Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Table};
use media_retention_config::{BackendConfig, Config, CredentialStore};
use media_retention_sources::{TokenInfo, TraktAuth};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;

pub async fn run_config(config_path: Option<PathBuf>, cmd: ConfigCommands, output: &Output) -> Result<()> {
    let workspace = Workspace::resolve(config_path);
    match cmd {
        ConfigCommands::Show { full } => show_config(&workspace, full, output),
        ConfigCommands::Init { force } => init_config(&workspace, force, output),
        ConfigCommands::Validate => validate_config(&workspace, output),
        ConfigCommands::Trakt { client_id, client_secret } => {
            configure_trakt(&workspace, client_id, client_secret, output).await
        }
    }
}

/// Trakt login state as shown by `config show`.
fn trakt_login_state(workspace: &Workspace) -> String {
    let token = CredentialStore::open(workspace.credentials_file())
        .ok()
        .and_then(|store| TokenInfo::load(&store));
    match token {
        Some(TokenInfo { expires_at: Some(expires), .. }) => {
            format!("logged in, expires {}", expires.format("%Y-%m-%d %H:%M UTC"))
        }
        Some(_) => "logged in".to_string(),
        None => "not logged in".to_string(),
    }
}

fn show_config(workspace: &Workspace, full: bool, output: &Output) -> Result<()> {
    let config_file = &workspace.config_file;
    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'afterwatch config init' to create a template.");
        return Ok(());
    }

    let config = Config::load_from_file(config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let secret = |s: &str| if full { s.to_string() } else { mask_secret(s) };

    if output.format() != OutputFormat::Human {
        let mut shown = config.clone();
        for backend in [&mut shown.sonarr, &mut shown.radarr, &mut shown.emby].into_iter().flatten() {
            backend.api_key = secret(&backend.api_key);
        }
        shown.trakt.client_id = secret(&shown.trakt.client_id);
        shown.trakt.client_secret = secret(&shown.trakt.client_secret);
        if !shown.trakt.access_token.is_empty() {
            shown.trakt.access_token = secret(&shown.trakt.access_token);
        }
        output.data(&json!({
            "config": shown,
            "trakt_login": trakt_login_state(workspace),
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    println!("\n{}", "Configuration".bright_cyan().bold());
    let mut location = Table::new();
    location.set_header(vec![
        Cell::new("Config File").add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    location.load_preset(comfy_table::presets::UTF8_FULL);
    location.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    output.table(&location);

    let mut services = styled_table(&["Service", "Enabled", "URL", "Credentials"]);
    for (name, backend) in [("sonarr", &config.sonarr), ("radarr", &config.radarr), ("emby", &config.emby)] {
        match backend {
            Some(BackendConfig { enabled, base_url, api_key }) => services.add_row(vec![
                name.to_string(),
                enabled.to_string(),
                base_url.clone(),
                secret(api_key),
            ]),
            None => services.add_row(vec![name.to_string(), "not configured".to_string(), String::new(), String::new()]),
        };
    }
    services.add_row(vec![
        "trakt".to_string(),
        "true".to_string(),
        config.trakt.base_url.clone(),
        match config.trakt.fixed_access_token() {
            Some(token) => format!("{} / fixed token {}", secret(&config.trakt.client_id), secret(token)),
            None => format!("{} / {}", secret(&config.trakt.client_id), trakt_login_state(workspace)),
        },
    ]);
    output.table(&services);

    let cleanup = &config.cleanup;
    let mut settings = styled_table(&["Setting", "Value"]);
    let optional_days = |days: Option<u32>| days.map(|d| d.to_string()).unwrap_or_else(|| "default".to_string());
    settings.add_row(vec!["cleanup.enabled".to_string(), cleanup.enabled.to_string()]);
    settings.add_row(vec!["cleanup.delay_days".to_string(), cleanup.delay_days.to_string()]);
    settings.add_row(vec!["cleanup.series_delay_days".to_string(), optional_days(cleanup.series_delay_days)]);
    settings.add_row(vec!["cleanup.movie_delay_days".to_string(), optional_days(cleanup.movie_delay_days)]);
    settings.add_row(vec!["cleanup.exclusions".to_string(), cleanup.exclusions.join(", ")]);
    settings.add_row(vec!["cleanup.excluded_libraries".to_string(), cleanup.excluded_libraries.join(", ")]);
    settings.add_row(vec!["scheduler.cron".to_string(), config.scheduler.cron.clone()]);
    settings.add_row(vec!["scheduler.run_on_start".to_string(), config.scheduler.run_on_start.to_string()]);
    settings.add_row(vec!["scheduler.dry_run".to_string(), config.scheduler.dry_run.to_string()]);
    output.table(&settings);

    Ok(())
}

fn init_config(workspace: &Workspace, force: bool, output: &Output) -> Result<()> {
    let config_file = &workspace.config_file;
    if config_file.exists() && !force {
        output.warn(format!(
            "Configuration already exists at {}. Use --force to overwrite it.",
            config_file.display()
        ));
        return Ok(());
    }

    Config::template()
        .save_to_file(config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote configuration template to {}", config_file.display()));
    output.info("Fill in the service URLs, API keys and the Trakt client id and secret.");
    output.info("Then run 'afterwatch config trakt' to log in and 'afterwatch config validate' to check the file.");
    Ok(())
}

fn validate_config(workspace: &Workspace, output: &Output) -> Result<()> {
    let manager = workspace.load_config()?;
    let config = manager.current();
    output.success(format!(
        "Configuration is valid ({})",
        config.get_configured_services().join(", ")
    ));
    if config.scheduler.dry_run {
        output.warn("Dry-run is enabled: nothing will be deleted");
    }
    if !config.cleanup.enabled {
        output.warn("Cleanup is disabled");
    }
    Ok(())
}

async fn configure_trakt(
    workspace: &Workspace,
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    output: &Output,
) -> Result<()> {
    let config_file = &workspace.config_file;
    let mut config = if config_file.exists() {
        Config::load_from_file(config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?
    } else {
        output.info("Configuration file not found. Creating a template...");
        Config::template()
    };

    let args_given = client_id_arg.is_some() || client_secret_arg.is_some();
    if let Some(id) = client_id_arg {
        config.trakt.client_id = id;
    }
    if let Some(secret) = client_secret_arg {
        config.trakt.client_secret = secret;
    }
    let client_id = config.trakt.client_id.trim().to_string();
    let Some(client_secret) = config.trakt.client_secret().map(str::to_string) else {
        output.info("Create an API application at https://trakt.tv/oauth/applications");
        output.info("with 'urn:ietf:wg:oauth:2.0:oob' as the redirect URI.");
        return Err(eyre!(
            "Trakt client id and secret are required: pass --client-id and --client-secret or set them in {}",
            config_file.display()
        ));
    };
    if client_id.is_empty() || client_id.starts_with("YOUR_") {
        return Err(eyre!("Trakt client id is required"));
    }
    if args_given || !config_file.exists() {
        config
            .save_to_file(config_file)
            .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    }

    let auth = TraktAuth::new(&config.trakt.base_url, &client_id, &client_secret)
        .map_err(|e| eyre!("Failed to create Trakt client: {}", e))?;
    let code = auth
        .start_device_auth()
        .await
        .map_err(|e| eyre!("Failed to start Trakt authorization: {}", e))?;

    if output.format() == OutputFormat::Human {
        if !output.is_quiet() {
            println!("\n{}", "Trakt Login".bright_cyan().bold());
            println!("  1. Open {}", code.verification_url.bright_blue().underline());
            println!("  2. Enter the code {}", code.user_code.bright_yellow().bold());
            println!();
        }
        output.info("Waiting for authorization...");
    } else {
        output.data(&json!({
            "type": "device_code",
            "verification_url": code.verification_url,
            "user_code": code.user_code,
            "expires_in": code.expires_in,
        }));
    }

    let token = auth
        .wait_for_authorization(&code)
        .await
        .map_err(|e| eyre!("Trakt authorization failed: {}", e))?;

    let credentials_file = workspace.credentials_file();
    let mut store = CredentialStore::open(credentials_file.clone())
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    token.store(&mut store);
    store
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;

    output.success("Trakt authentication successful!");
    if let Some(expires) = token.expires_at {
        output.info(format!("  Access token expires at: {}", expires.to_rfc3339().bright_green()));
    }
    if config.trakt.fixed_access_token().is_some() {
        output.warn("trakt.access_token is set in the config file; the stored login takes precedence");
    }
    Ok(())
}
