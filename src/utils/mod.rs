use std::collections::BTreeSet;

pub mod validation;

/// Size of the intersection of two ordered sets, walking the smaller one.
pub fn intersection_size<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|x| large.contains(x)).count()
}

/// `|A ∩ B| / |A ∪ B|` from the set sizes. An empty union scores 0.
pub fn jaccard_index(intersection: usize, left: usize, right: usize) -> f64 {
    let union = left + right - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

pub fn jaccard_similarity<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    jaccard_index(intersection_size(a, b), a.len(), b.len())
}

/// Cuts `label` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let mut cut: String = label.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

/// Evenly spaced positions from 1.0 down to -1.0; a single slot sits at 0.0.
pub fn spread(count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| 1.0 - 2.0 * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jaccard_similarity() {
        let a: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let b: BTreeSet<i64> = [2, 3, 4, 5].into_iter().collect();
        assert!((jaccard_similarity(&a, &b) - 0.4).abs() < 1e-12);
        assert_eq!(jaccard_similarity(&a, &b), jaccard_similarity(&b, &a));

        let empty: BTreeSet<i64> = BTreeSet::new();
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_intersection_size() {
        let a: BTreeSet<i64> = [1, 2].into_iter().collect();
        let b: BTreeSet<i64> = [2, 3, 4].into_iter().collect();
        assert_eq!(intersection_size(&a, &b), 1);
        assert_eq!(intersection_size(&b, &a), 1);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Heat", 25), "Heat");
        assert_eq!(
            truncate_label("Dr. Strangelove or: How I Learned to Stop Worrying", 10),
            "Dr. Strang..."
        );
        assert_eq!(truncate_label("Amélie", 3), "Amé...");
    }

    #[test]
    fn test_spread() {
        assert!(spread(0).is_empty());
        assert_eq!(spread(1), vec![0.0]);
        assert_eq!(spread(3), vec![1.0, 0.0, -1.0]);
    }
}
