//! `learnflow config`: configuration management commands.

use learnflow_config::AppConfig;

pub async fn validate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration OK");
    println!("   Service tag:   {}", config.service_tag);
    println!("   Graph:         {}", config.endpoints.graph_url);
    println!("   Auth:          {}", config.endpoints.auth_url);
    println!("   Profiles:      {}", config.endpoints.profile_url);
    println!("   Presentation:  {}", config.endpoints.presentation_url);
    println!("   Machines:      {:?}", config.content.machines_lookup);
    println!(
        "   Assessment:    {} ({:?})",
        config.assessment.item.id, config.assessment.priority_policy
    );
    println!(
        "   Featured:      {}",
        config
            .featured
            .as_ref()
            .map(|f| f.id.as_str())
            .unwrap_or("none")
    );
    println!(
        "   Heartbeat:     {}",
        if config.heartbeat.enabled {
            format!("every {}s", config.heartbeat.interval_secs)
        } else {
            "disabled".into()
        }
    );
    Ok(())
}

pub async fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
