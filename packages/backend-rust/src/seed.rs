use crate::catalog::ContentType::{Letter, Syllable, Word};
use crate::catalog::{Card, ContentType, Level};

const DEFAULT_MASTERY_THRESHOLD: f64 = 80.0;

struct SeedLevel {
    id: u32,
    name: &'static str,
    description: &'static str,
    cards: &'static [(&'static str, ContentType)],
}

const SEED_LEVELS: &[SeedLevel] = &[
    SeedLevel {
        id: 1,
        name: "Vocales",
        description: "A, E, I, O, U",
        cards: &[("A", Letter), ("E", Letter), ("I", Letter), ("O", Letter), ("U", Letter)],
    },
    SeedLevel {
        id: 2,
        name: "Sílabas Fáciles",
        description: "ma, pa, sa, la...",
        cards: &[
            ("ma", Syllable), ("me", Syllable), ("mi", Syllable), ("mo", Syllable), ("mu", Syllable),
            ("pa", Syllable), ("pe", Syllable), ("pi", Syllable), ("po", Syllable), ("pu", Syllable),
            ("sa", Syllable), ("se", Syllable), ("si", Syllable), ("so", Syllable), ("su", Syllable),
            ("la", Syllable), ("le", Syllable), ("li", Syllable), ("lo", Syllable), ("lu", Syllable),
        ],
    },
    SeedLevel {
        id: 3,
        name: "Todas las Sílabas",
        description: "ta, da, fa, ba...",
        cards: &[
            ("ta", Syllable), ("te", Syllable), ("ti", Syllable), ("to", Syllable), ("tu", Syllable),
            ("da", Syllable), ("de", Syllable), ("di", Syllable), ("do", Syllable), ("du", Syllable),
            ("fa", Syllable), ("fe", Syllable), ("fi", Syllable), ("fo", Syllable), ("fu", Syllable),
            ("ba", Syllable), ("be", Syllable), ("bi", Syllable), ("bo", Syllable), ("bu", Syllable),
            ("na", Syllable), ("ne", Syllable), ("ni", Syllable), ("no", Syllable), ("nu", Syllable),
        ],
    },
    SeedLevel {
        id: 4,
        name: "Palabras de 2 Sílabas",
        description: "casa, mesa, gato...",
        cards: &[
            ("casa", Word), ("mesa", Word), ("gato", Word), ("pato", Word), ("mamá", Word),
            ("papá", Word), ("luna", Word), ("sapo", Word), ("foca", Word), ("dedo", Word),
        ],
    },
    SeedLevel {
        id: 5,
        name: "Sílabas Cerradas",
        description: "sol, pan, mar...",
        cards: &[
            ("sol", Syllable), ("pan", Syllable), ("mar", Syllable), ("sal", Syllable),
            ("luz", Syllable), ("pez", Syllable), ("mil", Syllable), ("tos", Syllable),
        ],
    },
    SeedLevel {
        id: 6,
        name: "Nombres Propios",
        description: "Ana, México, Pedro...",
        cards: &[
            ("Ana", Word), ("México", Word), ("Pedro", Word), ("Lola", Word),
            ("Sofía", Word), ("Tomás", Word), ("Perú", Word), ("Luis", Word),
        ],
    },
    SeedLevel {
        id: 7,
        name: "Dígrafos",
        description: "ch, ll, rr",
        cards: &[
            ("ch", Letter), ("ll", Letter), ("rr", Letter),
            ("coche", Word), ("llave", Word), ("perro", Word), ("lluvia", Word), ("carro", Word),
        ],
    },
    SeedLevel {
        id: 8,
        name: "Grupos Consonánticos",
        description: "pla, bra, tra, gro...",
        cards: &[
            ("pla", Syllable), ("ple", Syllable), ("bra", Syllable), ("bre", Syllable),
            ("tra", Syllable), ("tre", Syllable), ("gro", Syllable), ("gra", Syllable),
            ("cla", Syllable), ("fre", Syllable),
        ],
    },
    SeedLevel {
        id: 9,
        name: "Palabras de 3+ Sílabas",
        description: "elefante, mariposa...",
        cards: &[
            ("elefante", Word), ("mariposa", Word), ("zapato", Word), ("pelota", Word),
            ("manzana", Word), ("tortuga", Word), ("conejo", Word), ("paloma", Word),
        ],
    },
    SeedLevel {
        id: 10,
        name: "Diptongos Avanzados",
        description: "ciudad, ratón, rey...",
        cards: &[
            ("ciudad", Word), ("ratón", Word), ("rey", Word), ("jaula", Word),
            ("huevo", Word), ("piano", Word), ("nieve", Word), ("auto", Word),
        ],
    },
];

pub fn builtin_catalog() -> (Vec<Level>, Vec<Card>) {
    let levels = SEED_LEVELS
        .iter()
        .map(|seed| Level {
            id: seed.id,
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
        })
        .collect();

    let cards = SEED_LEVELS
        .iter()
        .flat_map(|seed| {
            seed.cards.iter().map(move |(content, content_type)| Card {
                id: card_id(seed.id, content),
                content: content.to_string(),
                content_type: *content_type,
                level_id: seed.id,
                image_url: None,
                audio_url: None,
            })
        })
        .collect();

    (levels, cards)
}

/// URL-safe id such as `l4-mama` for "mamá" in level 4
fn card_id(level_id: u32, content: &str) -> String {
    let slug: String = content
        .chars()
        .map(|ch| match ch.to_lowercase().next().unwrap_or(ch) {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect();
    format!("l{level_id}-{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_ids_are_ascii() {
        assert_eq!(card_id(4, "mamá"), "l4-mama");
        assert_eq!(card_id(6, "México"), "l6-mexico");
        let (_, cards) = builtin_catalog();
        assert!(cards.iter().all(|card| card.id.is_ascii()));
    }

    #[test]
    fn test_cards_follow_level_order() {
        let (_, cards) = builtin_catalog();
        assert_eq!(cards[0].id, "l1-a");
        let levels: Vec<u32> = cards.iter().map(|card| card.level_id).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }
}
