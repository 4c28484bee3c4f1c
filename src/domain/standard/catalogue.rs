//! Enumerated catalogue of standard reference names

use super::entity::StandardKind;

/// A name templates may use to reference a company standard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub name: &'static str,
    pub kind: StandardKind,
    /// Words a stored standard's name should contain to be picked for this entry
    pub keywords: &'static [&'static str],
}

const fn entry(
    name: &'static str,
    kind: StandardKind,
    keywords: &'static [&'static str],
) -> CatalogueEntry {
    CatalogueEntry {
        name,
        kind,
        keywords,
    }
}

static ENTRIES: &[CatalogueEntry] = &[
    entry("brand_voice", StandardKind::Voice, &[]),
    entry("tone_of_voice", StandardKind::Voice, &[]),
    entry("voice_guidelines", StandardKind::Voice, &[]),
    entry("writing_style", StandardKind::Voice, &[]),
    entry("brand_guidelines", StandardKind::Voice, &[]),
    entry("platform_requirements", StandardKind::Platform, &[]),
    entry("amazon_requirements", StandardKind::Platform, &["amazon"]),
    entry("shopify_requirements", StandardKind::Platform, &["shopify"]),
    entry("etsy_requirements", StandardKind::Platform, &["etsy"]),
    entry("ebay_requirements", StandardKind::Platform, &["ebay"]),
    entry("walmart_requirements", StandardKind::Platform, &["walmart"]),
    entry("image_guidelines", StandardKind::Image, &[]),
    entry("image_requirements", StandardKind::Image, &[]),
    entry("photo_guidelines", StandardKind::Image, &["photo"]),
    entry("visual_guidelines", StandardKind::Image, &[]),
];

/// Shortest token allowed to match as a fragment of a catalogue name
const MIN_FRAGMENT_LEN: usize = 8;

/// Lower-cases and drops `_`, `-` and whitespace
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Recognizes template variables that refer to company standards
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalogue;

impl StandardCatalogue {
    pub fn entries(&self) -> &'static [CatalogueEntry] {
        ENTRIES
    }

    /// Finds the entry a variable name refers to
    ///
    /// Exact normalized matches win. Otherwise a token containing a catalogue
    /// name matches it, as does a long enough token that is a fragment of one.
    pub fn lookup(&self, variable: &str) -> Option<&'static CatalogueEntry> {
        let token = normalize_name(variable);
        if token.is_empty() {
            return None;
        }

        let normalized: Vec<(String, &'static CatalogueEntry)> =
            ENTRIES.iter().map(|e| (normalize_name(e.name), e)).collect();

        if let Some((_, e)) = normalized.iter().find(|(name, _)| *name == token) {
            return Some(e);
        }

        if let Some((_, e)) = normalized.iter().find(|(name, _)| token.contains(name.as_str())) {
            return Some(e);
        }

        if token.len() >= MIN_FRAGMENT_LEN {
            return normalized
                .iter()
                .find(|(name, _)| name.contains(token.as_str()))
                .map(|(_, e)| *e);
        }

        None
    }

    pub fn is_standard(&self, variable: &str) -> bool {
        self.lookup(variable).is_some()
    }
}
