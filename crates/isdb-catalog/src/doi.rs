use std::borrow::Cow;

pub const DOI_RESOLVER: &str = "https://doi.org/";

/// Turn a DOI into a resolvable URL; anything else passes through unchanged.
///
/// - `10.1000/xyz` -> `https://doi.org/10.1000/xyz`
/// - `DOI:10.1000/xyz` / `doi:10.1000/xyz` -> `https://doi.org/10.1000/xyz`
pub fn doi_to_url(link: &str) -> Cow<'_, str> {
    if link.starts_with("10.") {
        return Cow::Owned(format!("{DOI_RESOLVER}{link}"));
    }
    if let Some(rest) = link.strip_prefix("DOI:").or_else(|| link.strip_prefix("doi:")) {
        return Cow::Owned(format!("{DOI_RESOLVER}{}", rest.trim_start()));
    }
    Cow::Borrowed(link)
}
