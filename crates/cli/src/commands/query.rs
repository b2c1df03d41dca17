//! `learnflow query`: print the graph query a stage would send.

use clap::ValueEnum;
use learnflow_config::AppConfig;
use learnflow_graph::QueryBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryStage {
    /// Stations in workplace groups
    Stations,
    /// Machines in workplace groups
    Machines,
    /// Operating states of stations
    States,
    /// Content for states, machines and stations
    Content,
    /// Content for the position and its production items
    Items,
    /// Production items the position interacts with
    PositionItems,
    /// Production items used in the position's measures
    MeasureItems,
    /// Labels for content identifiers
    Labels,
}

/// Render the query for `stage` over `ids`.
///
/// Position stages use the first identifier as the position.
pub fn render(config: &AppConfig, stage: QueryStage, ids: &[String], role: &str) -> String {
    let queries = QueryBuilder::new(&config.content);
    let position = ids.first().map(String::as_str).unwrap_or_default();
    match stage {
        QueryStage::Stations => queries.stations_in_groups(ids),
        QueryStage::Machines => queries.machines_in_groups(ids),
        QueryStage::States => queries.local_states(ids),
        QueryStage::Content => queries.contents_for_ids(ids, role),
        QueryStage::Items => queries.items_content(ids, role),
        QueryStage::PositionItems => queries.production_items_for_position(position),
        QueryStage::MeasureItems => queries.production_items_for_position_measures(position),
        QueryStage::Labels => queries.labels_for(ids),
    }
}

pub async fn run(
    config: AppConfig,
    stage: QueryStage,
    ids: Vec<String>,
    role: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = role.unwrap_or_default();
    if matches!(stage, QueryStage::Content | QueryStage::Items) && role.is_empty() {
        return Err("--role is required for content and items queries".into());
    }
    println!("{}", render(&config, stage, &ids, &role));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_stage_queries() {
        let config = AppConfig::default();
        let ids = vec!["g1".to_string()];
        assert!(render(&config, QueryStage::Stations, &ids, "").contains("{<g1>}"));
        assert!(render(&config, QueryStage::Content, &ids, "r1").contains("<r1>"));
        assert!(
            render(&config, QueryStage::MeasureItems, &ids, "").contains("VALUES ?stelle {<g1>}")
        );
    }

    #[test]
    fn position_stage_without_ids_is_empty_set() {
        let config = AppConfig::default();
        assert!(render(&config, QueryStage::PositionItems, &[], "").contains("VALUES ?stelle {}"));
    }
}
