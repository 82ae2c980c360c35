//! Keyword-based cost category guessing for statement rows.

/// Category assigned when no keyword matches.
pub const DEFAULT_CATEGORY: &str = "KOSZTY OGÓLNE - INNE USŁUGI ZWIĄZANE Z ZARZĄDZANIEM";

/// Keyword table tuned for Polish merchants and bank fee wording.
const CATEGORY_MAP: &[(&[&str], &str)] = &[
    (
        &[
            "biedronka",
            "lidl",
            "kaufland",
            "auchan",
            "dino",
            "netto",
            "carrefour",
            "żabka",
            "zabka",
            "lewiatan",
            "stokrotka",
            "delikatesy",
        ],
        "GASTRONOMIA KOSZTY - TOWARY",
    ),
    (
        &[
            "orlen", "bp", "shell", "circle k", "moya", "lotos", "paliwo", "stacja", "mol", "amic",
        ],
        "KOSZTY OGÓLNE - ZWROT GOTÓWKI ZA PALIWO",
    ),
    (
        &[
            "netflix",
            "spotify",
            "adobe",
            "google",
            "microsoft",
            "apple",
            "suno",
            "midjourney",
            "chatgpt",
            "openai",
            "canva",
            "zoom",
            "slack",
        ],
        "KOSZTY OGÓLNE - OPROGRAMOWANIE",
    ),
    (
        &[
            "koleo",
            "uber",
            "bolt",
            "freenow",
            "jakdojade",
            "bilet",
            "pkp",
            "intercity",
            "mpk",
            "ztm",
        ],
        "KOSZTY OGÓLNE - USŁUGI TRANSPORTOWE",
    ),
    (
        &[
            "glovo",
            "pyszne",
            "wolt",
            "ubereats",
            "restauracja",
            "bar",
            "kawiarnia",
            "cukiernia",
            "mcdonald",
            "kfc",
            "burger king",
            "starbucks",
            "costa",
        ],
        "GASTRONOMIA KOSZTY - KOSZTY INNYCH USŁUG ZEWNĘTRZNYCH",
    ),
    (
        &[
            "castorama",
            "leroy",
            "obi",
            "mrowka",
            "psb",
            "budowlany",
            "bricomarche",
            "jula",
        ],
        "HOTEL KOSZTY - REMONTY NAPRAWY",
    ),
    (
        &["apteka", "doz", "gemini", "super-pharm", "rossmann", "hebe"],
        "KOSZTY OGÓLNE - KOSZTY ADMINISTRACYJNE",
    ),
    (
        &[
            "action", "pepco", "tedi", "kik", "sinsay", "hm", "zara", "reserved",
        ],
        "HOTEL KOSZTY - UZUPEŁNIENIE WYPOSAŻENIA",
    ),
    (
        &[
            "prowizja",
            "opłata",
            "odsetki",
            "bank",
            "ing",
            "mbank",
            "pko",
            "santander",
        ],
        "KOSZTY OGÓLNE - USŁUGI FINANSOWE / BANKOWE",
    ),
    (
        &[
            "orange", "t-mobile", "plus", "play", "upc", "vectra", "netia",
        ],
        "KOSZTY OGÓLNE - TELEFONY / KARTY SIM",
    ),
    (
        &[
            "tauron", "pgnig", "enea", "energa", "innogy", "woda", "ścieki", "gaz",
        ],
        "KOSZTY OGÓLNE - MEDIA",
    ),
];

/// Guesses a cost category from the contractor name and row description.
///
/// Returns `None` for empty input; otherwise always returns a category,
/// falling back to [`DEFAULT_CATEGORY`].
#[must_use]
pub fn guess_category(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    for (keywords, category) in CATEGORY_MAP {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some((*category).to_string());
        }
    }
    Some(DEFAULT_CATEGORY.to_string())
}
