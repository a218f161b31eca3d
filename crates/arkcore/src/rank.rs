use crate::catalog::rarity_rank;
use crate::Capture;

/// Order ledger rows for display: rarest tier first, then higher counts,
/// then item name (byte-wise, case-sensitive as stored). Total order, same
/// output on every call with the same input.
pub fn rank(mut captures: Vec<Capture>) -> Vec<Capture> {
    captures.sort_by(|a, b| {
        rarity_rank(&a.rarity)
            .cmp(&rarity_rank(&b.rarity))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    captures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(name: &str, rarity: &str, count: i64) -> Capture {
        Capture {
            item_name: name.to_string(),
            symbol: String::new(),
            rarity: rarity.to_string(),
            count,
        }
    }

    fn names(captures: &[Capture]) -> Vec<&str> {
        captures.iter().map(|c| c.item_name.as_str()).collect()
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(rank(Vec::new()).is_empty());
    }

    #[test]
    fn orders_by_tier_then_count_then_name() {
        let out = rank(vec![
            cap("Mouse", "common", 9),
            cap("Dragon", "legendary", 1),
            cap("Cat", "common", 9),
            cap("Zebra", "rare", 3),
        ]);
        assert_eq!(names(&out), ["Dragon", "Zebra", "Cat", "Mouse"]);
    }

    #[test]
    fn higher_count_wins_within_a_tier() {
        let out = rank(vec![cap("Cat", "common", 2), cap("Mouse", "common", 9)]);
        assert_eq!(names(&out), ["Mouse", "Cat"]);
    }

    #[test]
    fn unknown_rarity_sorts_after_every_known_tier() {
        let out = rank(vec![
            cap("Griffin", "mythic", 50),
            cap("Mouse", "common", 1),
            cap("Dragon", "legendary", 1),
        ]);
        assert_eq!(names(&out), ["Dragon", "Mouse", "Griffin"]);
    }

    #[test]
    fn name_order_is_byte_wise() {
        let out = rank(vec![cap("ant", "common", 1), cap("Zebra", "common", 1)]);
        assert_eq!(names(&out), ["Zebra", "ant"]);
    }

    #[test]
    fn repeated_calls_agree() {
        let rows = vec![
            cap("Fox", "uncommon", 4),
            cap("Owl", "uncommon", 4),
            cap("Unicorn", "legendary", 2),
        ];
        let once = rank(rows.clone());
        let twice = rank(once.clone());
        assert_eq!(once, twice);
        assert_eq!(names(&once), ["Unicorn", "Fox", "Owl"]);
    }
}
