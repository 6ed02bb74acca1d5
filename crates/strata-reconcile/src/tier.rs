//! Priority tiers.

/// Items sharing one priority. Tiers run strictly one after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier<T> {
    pub priority: i32,
    pub items: Vec<T>,
}

/// Group items by priority, highest first, keeping input order within a
/// tier.
pub fn partition<T>(
    items: impl IntoIterator<Item = T>,
    priority: impl Fn(&T) -> i32,
) -> Vec<Tier<T>> {
    let mut keyed: Vec<(i32, T)> = items
        .into_iter()
        .map(|item| (priority(&item), item))
        .collect();
    // Stable sort keeps discovery order inside each tier.
    keyed.sort_by(|a, b| b.0.cmp(&a.0));

    let mut tiers: Vec<Tier<T>> = Vec::new();
    for (key, item) in keyed {
        match tiers.last_mut() {
            Some(tier) if tier.priority == key => tier.items.push(item),
            _ => tiers.push(Tier {
                priority: key,
                items: vec![item],
            }),
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_first_stable_within() {
        let items = vec![("a", 0), ("b", 10), ("c", 0), ("d", -5), ("e", 10)];
        let tiers = partition(items, |(_, p)| *p);

        let shape: Vec<(i32, Vec<&str>)> = tiers
            .iter()
            .map(|t| (t.priority, t.items.iter().map(|(n, _)| *n).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (10, vec!["b", "e"]),
                (0, vec!["a", "c"]),
                (-5, vec!["d"]),
            ]
        );
    }

    #[test]
    fn empty_input() {
        let tiers = partition(Vec::<i32>::new(), |p| *p);
        assert!(tiers.is_empty());
    }
}
