//! Identifier formatting for graph queries.
//!
//! Every filter value is an IRI in angle brackets, and sets of identifiers are
//! brace-delimited, space-separated lists: `{<urn:a> <urn:b>}`.

/// Wrap an identifier in angle brackets unless it already has them.
///
/// Surrounding whitespace is trimmed. An empty identifier stays empty.
pub fn bracket(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(id.len() + 2);
    if !id.starts_with('<') {
        out.push('<');
    }
    out.push_str(id);
    if !id.ends_with('>') {
        out.push('>');
    }
    out
}

/// Serialize identifiers as `{<a> <b>}`; no identifiers gives `{}`.
///
/// Blank identifiers are dropped.
pub fn id_set<I, S>(ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let inner: Vec<String> = ids
        .into_iter()
        .map(|id| bracket(id.as_ref()))
        .filter(|id| !id.is_empty())
        .collect();
    format!("{{{}}}", inner.join(" "))
}

/// Serialize `(class, station)` pairs as `{(<class> <s1>) (<class> <s2>)}`.
pub fn pair_set<I, S>(class: &str, stations: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let class = bracket(class);
    let inner: Vec<String> = stations
        .into_iter()
        .map(|s| bracket(s.as_ref()))
        .filter(|s| !s.is_empty())
        .map(|s| format!("({class} {s})"))
        .collect();
    format!("{{{}}}", inner.join(" "))
}

/// Prefix declarations preceding every query.
pub fn prefix_header(namespace: &str) -> String {
    let ns = bracket(namespace);
    format!(
        "BASE {ns} PREFIX app: {ns} PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> "
    )
}
