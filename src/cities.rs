//! City name canonicalization
//!
//! Maps free-text city names, IATA codes and common abbreviations to a
//! canonical lowercase city name so that "NYC" and "new york" resolve to the
//! same downstream lookup key.

/// Alias table mapping abbreviations and airport codes to canonical names.
/// Targets are never themselves aliases, which keeps normalization idempotent.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("nyc", "new york"),
    ("ny", "new york"),
    ("jfk", "new york"),
    ("lga", "new york"),
    ("ewr", "new york"),
    ("lon", "london"),
    ("lhr", "london"),
    ("lgw", "london"),
    ("stn", "london"),
    ("cdg", "paris"),
    ("ory", "paris"),
    ("hnd", "tokyo"),
    ("nrt", "tokyo"),
    ("icn", "seoul"),
    ("la", "los angeles"),
    ("lax", "los angeles"),
    ("chi", "chicago"),
    ("ord", "chicago"),
    ("mdw", "chicago"),
    ("pek", "beijing"),
    ("pvg", "shanghai"),
    ("dxb", "dubai"),
    ("sin", "singapore"),
    ("hkg", "hong kong"),
    ("syd", "sydney"),
    ("mel", "melbourne"),
    ("sf", "san francisco"),
    ("sfo", "san francisco"),
    ("aus", "austin"),
    ("sea", "seattle"),
    ("mia", "miami"),
    ("dfw", "dallas"),
    ("iah", "houston"),
    ("atl", "atlanta"),
    ("bos", "boston"),
    ("dc", "washington"),
    ("iad", "washington"),
    ("dca", "washington"),
    ("den", "denver"),
    ("las", "las vegas"),
    ("vegas", "las vegas"),
    ("yyz", "toronto"),
    ("yvr", "vancouver"),
    ("yul", "montreal"),
];

/// Canonicalize a city string: lowercase, trim, then exact alias lookup.
/// Unknown input is never rejected; it passes through lowercased and trimmed.
pub fn normalize(input: &str) -> String {
    let city = input.trim().to_lowercase();
    match CITY_ALIASES.iter().find(|(alias, _)| *alias == city) {
        Some((_, canonical)) => (*canonical).to_string(),
        None => city,
    }
}
