use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Legendary,
    Epic,
    Rare,
    Uncommon,
    Common,
}

impl Rarity {
    /// Display grouping order, rarest tier first.
    pub const ALL: [Rarity; 5] = [
        Rarity::Legendary,
        Rarity::Epic,
        Rarity::Rare,
        Rarity::Uncommon,
        Rarity::Common,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Legendary => "legendary",
            Rarity::Epic => "epic",
            Rarity::Rare => "rare",
            Rarity::Uncommon => "uncommon",
            Rarity::Common => "common",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Legendary => "Legendary",
            Rarity::Epic => "Epic",
            Rarity::Rare => "Rare",
            Rarity::Uncommon => "Uncommon",
            Rarity::Common => "Common",
        }
    }

    /// Sort rank, rarest first.
    pub fn rank(self) -> u32 {
        match self {
            Rarity::Legendary => 1,
            Rarity::Epic => 2,
            Rarity::Rare => 3,
            Rarity::Uncommon => 4,
            Rarity::Common => 5,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "legendary" => Some(Rarity::Legendary),
            "epic" => Some(Rarity::Epic),
            "rare" => Some(Rarity::Rare),
            "uncommon" => Some(Rarity::Uncommon),
            "common" => Some(Rarity::Common),
            _ => None,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank for rarity values as stored in the ledger. Rows written under a tier
/// this build no longer knows still need a defined place in the ordering:
/// they sort after every known tier.
pub fn rarity_rank(rarity: &str) -> u32 {
    Rarity::parse(rarity).map(Rarity::rank).unwrap_or(99)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemDef {
    pub name: &'static str,
    pub symbol: &'static str,
    pub rarity: Rarity,
    pub weight: u32,
}

static CATALOG: [ItemDef; 38] = [
    // Common (weight 23)
    ItemDef { name: "Mouse", symbol: "🐭", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Cat", symbol: "🐱", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Dog", symbol: "🐶", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Rabbit", symbol: "🐰", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Chicken", symbol: "🐔", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Duck", symbol: "🦆", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Pig", symbol: "🐷", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Cow", symbol: "🐮", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Horse", symbol: "🐴", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Goat", symbol: "🐐", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Sheep", symbol: "🐑", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Donkey", symbol: "🫏", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Turkey", symbol: "🦃", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Rooster", symbol: "🐓", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Hamster", symbol: "🐹", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Hedgehog", symbol: "🦔", rarity: Rarity::Common, weight: 23 },
    ItemDef { name: "Frog", symbol: "🐸", rarity: Rarity::Common, weight: 23 },
    // Uncommon (weight 20)
    ItemDef { name: "Fox", symbol: "🦊", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Raccoon", symbol: "🦝", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Owl", symbol: "🦉", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Parrot", symbol: "🦜", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Deer", symbol: "🦌", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Swan", symbol: "🦢", rarity: Rarity::Uncommon, weight: 20 },
    ItemDef { name: "Crocodile", symbol: "🐊", rarity: Rarity::Uncommon, weight: 20 },
    // Rare (weight 7)
    ItemDef { name: "Zebra", symbol: "🦓", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Leopard", symbol: "🐆", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Elephant", symbol: "🐘", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Gorilla", symbol: "🦍", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Camel", symbol: "🐫", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Giraffe", symbol: "🦒", rarity: Rarity::Rare, weight: 7 },
    ItemDef { name: "Koala", symbol: "🐨", rarity: Rarity::Rare, weight: 7 },
    // Epic (weight 2)
    ItemDef { name: "Tiger", symbol: "🐅", rarity: Rarity::Epic, weight: 2 },
    ItemDef { name: "Rhino", symbol: "🦏", rarity: Rarity::Epic, weight: 2 },
    ItemDef { name: "Eagle", symbol: "🦅", rarity: Rarity::Epic, weight: 2 },
    ItemDef { name: "Wolf", symbol: "🐺", rarity: Rarity::Epic, weight: 2 },
    // Legendary (weight 1)
    ItemDef { name: "Unicorn", symbol: "🦄", rarity: Rarity::Legendary, weight: 1 },
    ItemDef { name: "Dragon", symbol: "🐉", rarity: Rarity::Legendary, weight: 1 },
    ItemDef { name: "Fairy", symbol: "🧚", rarity: Rarity::Legendary, weight: 1 },
];

pub fn find_item(name: &str) -> Option<&'static ItemDef> {
    let t = name.trim();
    if t.is_empty() {
        return None;
    }
    CATALOG.iter().find(|d| d.name.eq_ignore_ascii_case(t))
}

pub fn all_items() -> &'static [ItemDef] {
    &CATALOG
}

pub fn items_of(rarity: Rarity) -> impl Iterator<Item = &'static ItemDef> {
    CATALOG.iter().filter(move |d| d.rarity == rarity)
}

pub fn total_weight() -> u64 {
    CATALOG.iter().map(|d| u64::from(d.weight)).sum()
}
