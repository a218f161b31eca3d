use rand::Rng;

use crate::catalog::{all_items, total_weight, ItemDef};

/// Draw one catalog item, each with probability `weight / total_weight()`.
pub fn draw() -> &'static ItemDef {
    draw_with(&mut rand::thread_rng())
}

/// Same draw with a caller-supplied RNG, for deterministic tests.
pub fn draw_with<R: Rng + ?Sized>(rng: &mut R) -> &'static ItemDef {
    let total = total_weight() as f64;
    pick(rng.gen_range(0.0..total))
}

fn pick(mut roll: f64) -> &'static ItemDef {
    let items = all_items();
    for item in items {
        if roll < f64::from(item.weight) {
            return item;
        }
        roll -= f64::from(item.weight);
    }
    // Float rounding can leave a sliver of the range past the final
    // threshold; the last entry absorbs it.
    &items[items.len() - 1]
}
