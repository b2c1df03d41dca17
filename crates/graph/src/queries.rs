//! Query builders, one per pipeline stage.
//!
//! Builders are pure: they only format the identifiers they are given. Result
//! variables are fixed per query and read back by [`crate::interpret`].

use learnflow_config::{ContentConfig, MachinesLookup};

use crate::sparql::{bracket, id_set, pair_set, prefix_header};

/// Variable holding equipment identifiers.
pub const DEVICE_VAR: &str = "device";
/// Variable holding content identifiers.
pub const CONTENT_VAR: &str = "inhalt";
/// Variable holding preview images.
pub const PREVIEW_VAR: &str = "vorschau";
/// Variables of the operating state query.
pub const STATE_VAR: &str = "z";
pub const STATION_VAR: &str = "station";
pub const STATE_TYPE_VAR: &str = "p";
/// Variables of the label query.
pub const LABELLED_VAR: &str = "oc";
pub const LABEL_VAR: &str = "label";

/// Builds query text for every stage from the configured vocabulary.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    header: String,
    functional_state: String,
    label_locale: String,
    machines_lookup: MachinesLookup,
}

impl QueryBuilder {
    pub fn new(content: &ContentConfig) -> Self {
        Self {
            header: prefix_header(&content.ontology_namespace),
            functional_state: content.functional_state.clone(),
            label_locale: content.label_locale.clone(),
            machines_lookup: content.machines_lookup,
        }
    }

    /// Stations belonging to any of the workplace groups.
    pub fn stations_in_groups<I, S>(&self, groups: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        format!(
            "{}SELECT DISTINCT ?device WHERE {{ VALUES ?apg {} ?device app:isPartOf ?apg . }}",
            self.header,
            id_set(groups)
        )
    }

    /// Machines belonging to any of the workplace groups.
    ///
    /// With [`MachinesLookup::SameAsStations`] this is the stations query,
    /// so it answers with the stations already known.
    pub fn machines_in_groups<I, S>(&self, groups: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self.machines_lookup {
            MachinesLookup::SameAsStations => self.stations_in_groups(groups),
            MachinesLookup::MachineRelation => format!(
                "{}SELECT DISTINCT ?device WHERE {{ VALUES ?apg {} ?device app:isPartOf ?apg . \
                 ?device a ?type . ?type rdfs:subClassOf* app:Maschine . }}",
                self.header,
                id_set(groups)
            ),
        }
    }

    /// Operating states currently true for the stations, scoped to the
    /// functional state class.
    pub fn local_states<I, S>(&self, stations: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        format!(
            "{}SELECT DISTINCT ?z ?station ?p WHERE {{ VALUES (?p ?station) {} \
             ?z rdfs:subClassOf* ?p . ?z app:liegtVorIn ?station . }}",
            self.header,
            pair_set(&self.functional_state, stations)
        )
    }

    /// Content informing about any of `ids`, untargeted or targeted at `role`.
    pub fn contents_for_ids<I, S>(&self, ids: I, role: &str) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        format!(
            "{}SELECT DISTINCT ?inhalt ?vorschau WHERE {{ VALUES ?i {} \
             {{ ?inhalt app:informiertUeber ?i . ?inhalt app:hasPreview ?vorschau \
             {{{{ ?inhalt app:informiertUeber ?i . FILTER NOT EXISTS {{?inhalt app:hatZielgruppe ?y}}}} \
             UNION {{?inhalt app:informiertUeber ?i . ?inhalt app:hatZielgruppe {} }}}}}}}}",
            self.header,
            id_set(ids),
            bracket(role)
        )
    }

    /// Content for the role's production items, with the same audience rules
    /// as [`Self::contents_for_ids`], plus content about the role's tasks.
    pub fn items_content<I, S>(&self, items: I, role: &str) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        format!(
            "{}SELECT DISTINCT ?inhalt ?vorschau WHERE {{ VALUES ?item {} \
             {{{{ ?inhalt app:informiertUeber ?item . FILTER NOT EXISTS {{?inhalt app:hatZielgruppe ?y}} \
             OPTIONAL {{?inhalt app:hasPreview ?vorschau}}}} \
             UNION {{ ?inhalt app:informiertUeber ?item . ?inhalt app:hatZielgruppe {} \
             OPTIONAL {{?inhalt app:hasPreview ?vorschau}}}}}} \
             UNION {{ ?item rdfs:subClassOf* app:Stelle . ?item rdfs:subClassOf* ?bg . \
             ?bg app:hatAufgabe ?fkt . ?inhalt app:informiertUeber ?fkt . \
             OPTIONAL {{?inhalt app:hasPreview ?vorschau}} }}}}",
            self.header,
            id_set(items),
            bracket(role)
        )
    }

    /// Content about items the position interacts with, directly or through
    /// a part-of relation. Only content with a preview qualifies.
    pub fn production_items_for_position(&self, position: &str) -> String {
        format!(
            "{}SELECT DISTINCT ?inhalt ?vorschau WHERE {{ VALUES ?stelle {} \
             ?stelle app:interagiertMit ?pg . {{ \
             {{ ?inhalt app:informiertUeber ?pg . ?inhalt app:hasPreview ?vorschau }} UNION {{ \
             ?pgs app:isPartOf ?pg . ?inhalt app:informiertUeber ?pgs . ?inhalt app:hasPreview ?vorschau}}}}}}",
            self.header,
            id_set([position])
        )
    }

    /// Content about items required by measures of the position's tasks.
    pub fn production_items_for_position_measures(&self, position: &str) -> String {
        format!(
            "{}SELECT DISTINCT ?inhalt ?vorschau WHERE {{ VALUES ?stelle {} \
             ?stelle app:hatAufgabe ?aufgabe . ?aufgabe app:hatMassnahme ?massnahme . \
             ?massnahme app:benoetigt ?pg . ?inhalt app:informiertUeber ?pg . \
             ?inhalt app:hasPreview ?vorschau}}",
            self.header,
            id_set([position])
        )
    }

    /// Labels in the configured locale for exactly `ids`.
    pub fn labels_for<I, S>(&self, ids: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        format!(
            "{}SELECT DISTINCT ?oc ?label WHERE {{ VALUES ?oc {} ?oc rdfs:label ?label . \
             FILTER(langMatches(lang(?label), \"{}\")) }}",
            self.header,
            id_set(ids),
            self.label_locale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(&ContentConfig::default())
    }

    #[test]
    fn stations_query_lists_groups() {
        let q = builder().stations_in_groups(["app:g1", "app:g2"]);
        assert!(q.starts_with("BASE <http://www.appsist.de/ontology/>"));
        assert!(q.contains("VALUES ?apg {<app:g1> <app:g2>}"));
        assert!(q.contains("?device"));
    }

    #[test]
    fn machines_query_defaults_to_stations_query() {
        let b = builder();
        assert_eq!(b.machines_in_groups(["g1"]), b.stations_in_groups(["g1"]));

        let content = ContentConfig {
            machines_lookup: MachinesLookup::MachineRelation,
            ..ContentConfig::default()
        };
        let b = QueryBuilder::new(&content);
        assert_ne!(b.machines_in_groups(["g1"]), b.stations_in_groups(["g1"]));
        assert!(b.machines_in_groups(["g1"]).contains("app:Maschine"));
    }

    #[test]
    fn state_query_pairs_functional_state() {
        let q = builder().local_states(["urn:st1"]);
        assert!(q.contains(
            "{(<http://www.appsist.de/ontology/FunkionsfaehigerZustand> <urn:st1>)}"
        ));
    }

    #[test]
    fn content_query_filters_on_role() {
        let q = builder().contents_for_ids(["on", "st1"], "r1");
        assert!(q.contains("VALUES ?i {<on> <st1>}"));
        assert!(q.contains("app:hatZielgruppe <r1>"));
        assert!(q.contains("FILTER NOT EXISTS"));
    }

    #[test]
    fn secondary_queries_bracket_position() {
        let b = builder();
        assert!(b.items_content(["pos", "item"], "role").contains("VALUES ?item {<pos> <item>}"));
        assert!(b.production_items_for_position("pos").contains("VALUES ?stelle {<pos>}"));
        assert!(
            b.production_items_for_position_measures("<pos>")
                .contains("VALUES ?stelle {<pos>}")
        );
    }

    #[test]
    fn label_query_uses_locale() {
        let q = builder().labels_for(["urn:c1"]);
        assert!(q.contains("VALUES ?oc {<urn:c1>}"));
        assert!(q.contains("\"de\""));
    }

    #[test]
    fn braces_are_balanced() {
        let b = builder();
        for q in [
            b.stations_in_groups(["g"]),
            b.local_states(["s"]),
            b.contents_for_ids(["i"], "r"),
            b.items_content(["i"], "r"),
            b.production_items_for_position("p"),
            b.production_items_for_position_measures("p"),
            b.labels_for(["c"]),
        ] {
            let open = q.matches('{').count();
            let close = q.matches('}').count();
            assert_eq!(open, close, "unbalanced query: {q}");
        }
    }
}
