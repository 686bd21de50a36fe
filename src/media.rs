//! Media-type preference used for Accept and Content-Type inference.

use indexmap::IndexMap;

/// Pick the preferred media type from a `content` mapping: the first key (in
/// document order) containing "json", otherwise the first key.
pub fn preferred<V>(content: &IndexMap<String, V>) -> Option<&str> {
    preferred_of(content.keys().map(String::as_str))
}

/// Same preference over a plain list, as found in `produces`/`consumes`.
pub fn preferred_of<'a, I>(types: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut first = None;
    for media_type in types {
        if media_type.contains("json") {
            return Some(media_type);
        }
        first.get_or_insert(media_type);
    }
    first
}
