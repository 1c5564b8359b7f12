//! Near-duplicate suppression across sources.
//!
//! Outlets routinely cover the same story with slightly different headlines.
//! Items are compared by normalized title; the first occurrence of a story is
//! kept and later look-alikes are dropped.

use crate::models::NewsItem;
use crate::utils::truncate_for_log;
use std::collections::HashSet;
use tracing::{debug, info};

/// Titles at least this similar are treated as the same story.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Lowercase, strip punctuation and trim. Letters with diacritics are kept.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

fn significant_tokens(title: &str) -> HashSet<&str> {
    title
        .split_whitespace()
        .filter(|t| t.chars().count() > 3)
        .collect()
}

/// Similarity of two titles in `[0, 1]`.
///
/// 1.0 for identical normalized titles; the length ratio when one contains the
/// other; otherwise the Jaccard index over tokens longer than three characters.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a == b {
        return 1.0;
    }

    if a.contains(&b) || b.contains(&a) {
        let (a_len, b_len) = (a.chars().count(), b.chars().count());
        return a_len.min(b_len) as f64 / a_len.max(b_len) as f64;
    }

    let a_tokens = significant_tokens(&a);
    let b_tokens = significant_tokens(&b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }
    let shared = a_tokens.intersection(&b_tokens).count();
    let union = a_tokens.union(&b_tokens).count();
    shared as f64 / union as f64
}

/// Drop near-duplicates, keeping the first occurrence of each story in order.
pub fn dedupe(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let total = items.len();
    let mut accepted: Vec<NewsItem> = Vec::with_capacity(total);

    for candidate in items {
        let duplicate_of = accepted.iter().find_map(|kept| {
            let similarity = title_similarity(&candidate.title, &kept.title);
            (similarity >= SIMILARITY_THRESHOLD).then_some((kept, similarity))
        });
        match duplicate_of {
            Some((kept, similarity)) => debug!(
                similarity = %format!("{:.2}", similarity),
                dropped = %truncate_for_log(&candidate.title, 60),
                kept = %truncate_for_log(&kept.title, 60),
                "Dropped duplicate"
            ),
            None => accepted.push(candidate),
        }
    }

    info!(total, unique = accepted.len(), "Deduplicated items");
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Metrô: Linha 2, enfim!  "), "metrô linha 2 enfim");
    }

    #[test]
    fn test_similarity_cases() {
        assert_eq!(title_similarity("Metrô abre hoje", "metrô abre hoje!"), 1.0);

        let ratio = title_similarity("Metro line opens", "Metro line opens today");
        assert!((ratio - 16.0 / 22.0).abs() < 1e-9);

        let jaccard = title_similarity(
            "Metro line in Belo Horizonte opens today",
            "Metro line opens in Belo Horizonte",
        );
        assert!((jaccard - 5.0 / 6.0).abs() < 1e-9);

        assert_eq!(title_similarity("a b c", "d e f"), 0.0);
        assert_eq!(
            title_similarity("Chuva forte atinge capital", "Cruzeiro vence clássico mineiro"),
            0.0
        );
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let items = vec![
            item("G1 Minas", "Metro line in Belo Horizonte opens today", 1),
            item("O Tempo", "Cruzeiro vence clássico no Mineirão", 2),
            item("Estado de Minas", "Metro line opens in Belo Horizonte", 3),
        ];

        let unique = dedupe(items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].source, "G1 Minas");
        assert_eq!(unique[1].source, "O Tempo");
    }

    #[test]
    fn test_dedupe_converges() {
        let items = vec![
            item("G1 Minas", "Prefeitura anuncia obras no Anel Rodoviário", 1),
            item("O Tempo", "Prefeitura anuncia obras no Anel Rodoviário hoje", 2),
            item("Portal Uai", "Festival de inverno movimenta a cidade", 3),
            item("Estado de Minas", "Festival de inverno movimenta a cidade", 4),
        ];

        let once = dedupe(items);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
