//! Picks the stored standard that best answers a catalogue reference

use std::fmt::Debug;

use super::catalogue::{normalize_name, CatalogueEntry};
use super::entity::CompanyStandard;

/// Chooses a standard record for a catalogue entry
pub trait StandardResolver: Send + Sync + Debug {
    fn resolve<'a>(
        &self,
        entry: &CatalogueEntry,
        standards: &'a [CompanyStandard],
    ) -> Option<&'a CompanyStandard>;
}

/// Scores standards of the entry's kind by name similarity and keyword hits
///
/// Entries that carry keywords only accept standards matching at least one of
/// them; generic entries accept any standard of the right kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStandardResolver;

impl KeywordStandardResolver {
    fn score(entry: &CatalogueEntry, standard: &CompanyStandard) -> u32 {
        let name = normalize_name(standard.name());
        let mut score = 0;

        if name == normalize_name(entry.name) {
            score += 100;
        }

        let content = standard.content().to_string().to_lowercase();
        for keyword in entry.keywords {
            if name.contains(keyword) {
                score += 10;
            }
            if content.contains(keyword) {
                score += 1;
            }
        }

        score
    }
}

impl StandardResolver for KeywordStandardResolver {
    fn resolve<'a>(
        &self,
        entry: &CatalogueEntry,
        standards: &'a [CompanyStandard],
    ) -> Option<&'a CompanyStandard> {
        let mut best: Option<(u32, &CompanyStandard)> = None;

        for standard in standards.iter().filter(|s| s.kind() == entry.kind) {
            let score = Self::score(entry, standard);
            if !entry.keywords.is_empty() && score == 0 {
                continue;
            }

            let better = match best {
                None => true,
                Some((best_score, current)) => {
                    score > best_score
                        || (score == best_score && standard.updated_at() > current.updated_at())
                }
            };

            if better {
                best = Some((score, standard));
            }
        }

        best.map(|(_, standard)| standard)
    }
}
