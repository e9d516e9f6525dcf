//! Domain keyword tables, tokenization and query expansion.

#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use itertools::Itertools;
use std::sync::LazyLock;

/// Upper bound on terms fed into the substring fallback.
pub const MAX_SEARCH_TERMS: usize = 12;

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?").expect("regex is valid"));

const STOPWORDS: &[&str] = &[
    "about", "does", "from", "have", "should", "that", "the", "there", "this", "what", "when",
    "where", "which", "with", "would", "your", "much", "many", "how", "can", "and", "for", "are",
    "you",
];

#[derive(Debug)]
pub struct KeywordCategory {
    pub name: &'static str,
    /// Single words match as token prefixes, phrases as substrings.
    pub triggers: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub expansions: &'static [&'static str],
}

pub static CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "protein",
        triggers: &["protein", "whey", "casein", "amino", "bcaa", "leucine"],
        keywords: &["protein", "intake", "grams", "whey", "amino"],
        expansions: &[
            "daily protein intake",
            "protein requirements per kg bodyweight",
            "best protein sources",
        ],
    },
    KeywordCategory {
        name: "meal_planning",
        triggers: &[
            "meal", "diet", "macro", "calorie", "recipe", "eat", "food", "nutrition",
        ],
        keywords: &["meal", "plan", "macros", "calories", "nutrition"],
        expansions: &["meal plan", "macro breakdown", "calorie targets"],
    },
    KeywordCategory {
        name: "supplements",
        triggers: &[
            "supplement", "creatine", "vitamin", "steroid", "sarm", "peds", "peptide",
            "preworkout", "pre-workout", "caffeine", "testosterone", "trt",
        ],
        keywords: &["supplement", "creatine", "dosage", "safety", "steroids"],
        expansions: &[
            "supplement recommendations",
            "supplement dosage and safety",
            "performance enhancing drugs",
        ],
    },
    KeywordCategory {
        name: "training",
        triggers: &[
            "train", "workout", "exercise", "lift", "squat", "bench", "deadlift",
            "hypertrophy", "strength", "cardio", "program", "split", "reps",
        ],
        keywords: &["training", "workout", "program", "volume", "sets"],
        expansions: &[
            "training program",
            "workout split",
            "training volume and frequency",
        ],
    },
    KeywordCategory {
        name: "fat_loss",
        triggers: &[
            "fat", "cutting", "weight loss", "lose weight", "deficit", "lean", "shred",
        ],
        keywords: &["fat loss", "deficit", "calories", "cutting", "weight"],
        expansions: &["fat loss plan", "calorie deficit", "cutting diet"],
    },
    KeywordCategory {
        name: "fasting",
        triggers: &["fasting", "intermittent", "16:8", "omad"],
        keywords: &["fasting", "intermittent", "eating window"],
        expansions: &["intermittent fasting schedule", "fasting benefits"],
    },
    KeywordCategory {
        name: "contest_prep",
        triggers: &[
            "contest", "competition", "stage", "peak week", "bodybuilding", "physique",
            "bikini", "posing",
        ],
        keywords: &["contest prep", "peak week", "posing", "bodybuilding"],
        expansions: &["contest prep timeline", "peak week protocol"],
    },
    KeywordCategory {
        name: "recovery",
        triggers: &[
            "recover", "sleep", "rest day", "sore", "doms", "injury", "deload", "stretch",
        ],
        keywords: &["recovery", "sleep", "rest day", "soreness", "deload"],
        expansions: &["recovery strategies", "sleep and recovery", "deload week"],
    },
];

/// Lowercase word tokens of `text`.
#[inline]
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_REGEX
        .find_iter(&lower)
        .filter_map(|m| m.ok())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Tokens strictly longer than `min_len` characters.
#[inline]
pub fn words_longer_than(text: &str, min_len: usize) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|word| word.chars().count() > min_len)
        .unique()
        .collect()
}

/// Whether `trigger` occurs in a lowercased text and its tokens.
///
/// Single words match as a token prefix, phrases as a substring.
#[inline]
pub fn trigger_matches(trigger: &str, lower: &str, tokens: &[String]) -> bool {
    if trigger.contains(' ') || trigger.contains(':') || trigger.contains('-') {
        lower.contains(trigger)
    } else {
        tokens.iter().any(|token| token.starts_with(trigger))
    }
}

fn category_matches(category: &KeywordCategory, lower: &str, tokens: &[String]) -> bool {
    category
        .triggers
        .iter()
        .any(|trigger| trigger_matches(trigger, lower, tokens))
}

/// Categories triggered by `query`, in table order.
#[inline]
pub fn matched_categories(query: &str) -> Vec<&'static KeywordCategory> {
    let lower = query.to_lowercase();
    let tokens = tokenize(&lower);
    CATEGORIES
        .iter()
        .filter(|category| category_matches(category, &lower, &tokens))
        .collect()
}

/// Domain keywords of every category triggered by `query`.
#[inline]
pub fn extract_keywords(query: &str) -> Vec<&'static str> {
    matched_categories(query)
        .into_iter()
        .flat_map(|category| category.keywords.iter().copied())
        .unique()
        .collect()
}

/// Terms for the substring fallback: query tokens longer than two characters,
/// then domain keywords, deduplicated and capped at [`MAX_SEARCH_TERMS`].
#[inline]
pub fn search_terms(query: &str) -> Vec<String> {
    words_longer_than(query, 2)
        .into_iter()
        .chain(extract_keywords(query).into_iter().map(str::to_string))
        .unique()
        .take(MAX_SEARCH_TERMS)
        .collect()
}

/// Alternative phrasings used on the expansion path.
///
/// The trimmed query always comes first, followed by at most `max_expansions`
/// category phrases. A query matching no category gets its content words as
/// the single alternative.
#[inline]
pub fn expand_query(query: &str, max_expansions: usize) -> Vec<String> {
    let original = query.trim().to_string();
    if original.is_empty() {
        return Vec::new();
    }

    let categories = matched_categories(&original);
    let alternatives: Vec<String> = if categories.is_empty() {
        let content_words = content_words(&original);
        if content_words.is_empty() {
            Vec::new()
        } else {
            vec![content_words.join(" ")]
        }
    } else {
        // Interleave so every matched category contributes its best phrase first
        let per_category: Vec<&[&str]> = categories.iter().map(|c| c.expansions).collect();
        let depth = per_category.iter().map(|e| e.len()).max().unwrap_or(0);
        (0..depth)
            .flat_map(|i| per_category.iter().filter_map(move |e| e.get(i)))
            .map(|phrase| (*phrase).to_string())
            .collect()
    };

    std::iter::once(original.clone())
        .chain(alternatives)
        .unique_by(|phrase| phrase.to_lowercase())
        .take(max_expansions + 1)
        .collect()
}

fn content_words(query: &str) -> Vec<String> {
    words_longer_than(query, 3)
        .into_iter()
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}
