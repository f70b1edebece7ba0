//! Lookup/Enrichment Engine
//!
//! Turns a free-text user message into a block of dataset facts to inject as
//! conversation context before the message is forwarded upstream. Never fails
//! the caller: anything that goes wrong degrades to "no enrichment".

use crate::dataset::SculptureStore;
use crate::models::{SculptureRecord, SearchCriteria};
use tracing::debug;

/// Builds an enrichment context block for `user_message`, if the dataset has
/// anything relevant to say.
///
/// A sculpture name mentioned anywhere in the message wins; the longest
/// mentioned name is preferred so a short name contained in a longer title
/// cannot shadow it. Without a name mention, the whole message is run once
/// through the multi-field search as every criterion at once.
pub fn enrich(store: &SculptureStore, user_message: &str) -> Option<String> {
    let message = user_message.to_lowercase();

    let mentioned = store
        .sculpture_names()
        .filter(|name| {
            let name = name.trim();
            !name.is_empty() && message.contains(&name.to_lowercase())
        })
        .max_by_key(|name| name.len());

    if let Some(name) = mentioned {
        match store.get_by_name(name) {
            Some(record) => return Some(wrap_context(&format_record(record))),
            None => debug!(%name, "Mentioned sculpture disappeared between lookup steps"),
        }
    }

    let joined = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        return None;
    }
    let criteria = SearchCriteria {
        name: Some(joined.clone()),
        artist: Some(joined.clone()),
        location: Some(joined.clone()),
        year: Some(joined),
    };
    let results = store.search(&criteria);
    if results.is_empty() {
        return None;
    }

    let sheets: Vec<String> = results.iter().map(|r| format_record(r)).collect();
    Some(wrap_context(&sheets.join("\n\n")))
}

/// Renders one record as a labeled fact sheet, one line per present field.
fn format_record(record: &SculptureRecord) -> String {
    let mut lines = vec![format!("Name: {}", record.name)];
    let fields = [
        ("Year", &record.year),
        ("Location", &record.location),
        ("Artist", &record.artist),
        ("Description", &record.description),
        ("Cast information", &record.cast_information),
        ("Original material", &record.original_material),
        ("Dimensions", &record.dimensions),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
        }
    }
    lines.join("\n")
}

fn wrap_context(facts: &str) -> String {
    format!(
        "Use the following information about the gallery's sculptures to answer the visitor's question:\n\n{facts}"
    )
}
