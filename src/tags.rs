//! Selection of the per-artist tag sequences stored on each song.
//!
//! The dataset ships every artist with a long weighted list of Echo Nest
//! terms and a counted list of MusicBrainz tags. Songs only keep the few
//! strongest entries of each, and the strongest one doubles as the genre.

/// Artist terms kept per song.
pub const TOP_K_TERMS: usize = 5;

/// MusicBrainz tags kept per song.
pub const TOP_K_MBTAGS: usize = 5;

/// Pick at most `k` names by descending score.
///
/// Blank names and non-finite scores are skipped. Names are compared
/// case-insensitively, so only the best-scored spelling of each survives.
/// Equal scores keep their input order.
pub fn top_k_by_score<S, I>(items: I, k: usize) -> Vec<String>
where
    S: AsRef<str>,
    I: IntoIterator<Item = (S, f64)>,
{
    let mut scored: Vec<(String, f64)> = items
        .into_iter()
        .filter_map(|(name, score)| {
            let name = name.as_ref().trim();
            (!name.is_empty() && score.is_finite()).then(|| (name.to_string(), score))
        })
        .collect();

    // sort_by is stable, ties stay in input order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut seen = std::collections::HashSet::new();
    scored
        .into_iter()
        .filter(|(name, _)| seen.insert(name.to_lowercase()))
        .map(|(name, _)| name)
        .take(k)
        .collect()
}

/// Genre stand-in: the top artist term, else the top MusicBrainz tag.
pub fn genre_proxy(terms: &[String], mbtags: &[String]) -> Option<String> {
    terms.first().or_else(|| mbtags.first()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_score_and_truncates() {
        let top = top_k_by_score(
            [("rock", 0.5), ("blues", 0.9), ("jazz", 0.7), ("pop", 0.1)],
            3,
        );
        assert_eq!(top, vec!["blues", "jazz", "rock"]);
    }

    #[test]
    fn test_dedupes_case_insensitively_keeping_best() {
        let top = top_k_by_score([("rock", 0.2), ("Rock", 0.8), ("ROCK", 0.5)], 5);
        assert_eq!(top, vec!["Rock"]);
    }

    #[test]
    fn test_skips_blank_names_and_non_finite_scores() {
        let top = top_k_by_score(
            [("  ", 1.0), ("indie", f64::NAN), (" folk ", 0.3), ("punk", f64::INFINITY)],
            5,
        );
        assert_eq!(top, vec!["folk"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let top = top_k_by_score([("b", 1.0), ("a", 1.0), ("c", 1.0)], 2);
        assert_eq!(top, vec!["b", "a"]);
    }

    #[test]
    fn test_genre_proxy() {
        let terms = vec!["hip hop".to_string()];
        let tags = vec!["rap".to_string()];
        assert_eq!(genre_proxy(&terms, &tags), Some("hip hop".to_string()));
        assert_eq!(genre_proxy(&[], &tags), Some("rap".to_string()));
        assert_eq!(genre_proxy(&[], &[]), None);
    }
}
